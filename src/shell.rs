//! The map presentation shell.
//!
//! Composes the station markers, the legend, the user-position marker,
//! and the locate control over a [`MapDisplay`] backend. The shell owns
//! the position feed; dropping the shell severs the subscription and no
//! late callback is applied afterwards.

use embedded_graphics::prelude::*;

use crate::aqi::Scale;
use crate::basemap::Basemap;
use crate::geo::{Coordinate, Viewport};
use crate::location::{LocationSource, PositionFeed};
use crate::render;
use crate::station::Station;
use crate::MapDisplay;

/// Immutable presentation configuration, injected at construction.
#[derive(Clone, Debug)]
pub struct MapConfig {
    pub center: Coordinate,
    pub zoom: u8,
    /// Zoom applied when recentering on the user's position.
    pub locate_zoom: u8,
    pub scale: Scale,
}

impl Default for MapConfig {
    fn default() -> Self {
        // The bundled dataset's home view.
        MapConfig {
            center: Coordinate::new(-6.9, 107.6),
            zoom: 9,
            locate_zoom: 12,
            scale: Scale::pm25(),
        }
    }
}

pub struct MapShell {
    stations: Vec<Station>,
    scale: Scale,
    viewport: Viewport,
    locate_zoom: u8,
    feed: PositionFeed,
    selected: Option<usize>,
    notice: Option<String>,
    recentered: bool,
}

impl MapShell {
    /// Build the shell over a station list. The list is loaded exactly
    /// once; an empty list simply renders no markers.
    pub fn new(config: MapConfig, stations: Vec<Station>) -> Self {
        tracing::info!(stations = stations.len(), "map shell ready");
        MapShell {
            stations,
            viewport: Viewport::new(config.center, config.zoom),
            locate_zoom: config.locate_zoom,
            scale: config.scale,
            feed: PositionFeed::new(),
            selected: None,
            notice: None,
            recentered: false,
        }
    }

    /// Attach a geolocation source: the one-shot fix first, then the
    /// continuous watch. Capability or request errors become blocking
    /// notices; the shell stays usable without a position.
    pub fn attach(&mut self, source: &mut impl LocationSource) {
        let feed = self.feed.clone();
        if let Err(error) = source.request_once(&feed) {
            tracing::warn!(%error, "one-shot position request failed");
            feed.push_notice(error);
        }
        if let Err(error) = source.watch(&feed) {
            tracing::warn!(%error, "could not start position tracking");
            feed.push_notice(error);
        }
    }

    /// The most recent user position, if a fix has arrived.
    pub fn user_position(&self) -> Option<Coordinate> {
        self.feed.latest().map(|fix| fix.coordinate)
    }

    /// Manual locate: recenter on the last known position. With no fix
    /// yet, surface a notice and re-issue the one-shot request so a
    /// later success can land.
    pub fn locate(&mut self, source: &mut impl LocationSource) {
        match self.user_position() {
            Some(position) => {
                tracing::info!(
                    latitude = position.latitude,
                    longitude = position.longitude,
                    "recentering on user position"
                );
                self.viewport.recenter(position);
                self.viewport.set_zoom(self.locate_zoom);
            }
            None => {
                let feed = self.feed.clone();
                self.notice = Some(match source.request_once(&feed) {
                    Ok(()) => "No position available yet".into(),
                    Err(error) => error.to_string(),
                });
            }
        }
    }

    /// Route a pointer event: dismiss a showing notice, hit the locate
    /// control, or toggle marker selection.
    pub fn click(&mut self, at: Point, canvas: Size, source: &mut impl LocationSource) {
        if self.notice.take().is_some() {
            return;
        }
        if render::locate_button_rect(canvas).contains(at) {
            self.locate(source);
            return;
        }
        self.selected = self.hit_test(at, canvas);
    }

    fn hit_test(&self, at: Point, canvas: Size) -> Option<usize> {
        // The topmost (last-drawn) marker wins.
        self.stations
            .iter()
            .enumerate()
            .rev()
            .find(|(_, station)| {
                render::marker_hit(self.viewport.project(station.coordinate(), canvas), at)
            })
            .map(|(index, _)| index)
    }

    /// Pan the view by a pixel delta.
    pub fn pan_by(&mut self, delta: Point, canvas: Size) {
        self.viewport.pan(delta, canvas);
    }

    /// Step the zoom level, keeping the center.
    pub fn zoom_by(&mut self, steps: i8) {
        let zoom = self.viewport.zoom() as i16 + steps as i16;
        self.viewport.set_zoom(zoom.clamp(1, 19) as u8);
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selected_station(&self) -> Option<&Station> {
        self.selected.map(|index| &self.stations[index])
    }

    /// Render one frame: basemap, station markers, user marker, popup,
    /// legend, locate control, and any blocking notice.
    pub fn render<B, D>(&mut self, basemap: &mut B, display: &mut D) -> Result<(), String>
    where
        B: Basemap,
        D: MapDisplay,
    {
        // Surface a pending asynchronous notice.
        if self.notice.is_none() {
            if let Some(error) = self.feed.take_notice() {
                self.notice = Some(error.to_string());
            }
        }
        // The first fix recenters the view, once per shell lifetime.
        if !self.recentered {
            if let Some(position) = self.user_position() {
                self.viewport.recenter(position);
                self.viewport.set_zoom(self.locate_zoom);
                self.recentered = true;
                tracing::info!("first fix arrived; view recentered");
            }
        }

        {
            let mut canvas = display.canvas();
            let size = canvas.bounding_box().size;

            if let Err(error) = basemap.draw(&self.viewport, &mut canvas) {
                // Background only; markers still render.
                tracing::warn!(%error, "basemap unavailable");
            }

            for station in &self.stations {
                let severity = self.scale.classify_reading(station.pm25.value());
                let anchor = self.viewport.project(station.coordinate(), size);
                render::draw_marker(&mut canvas, anchor, severity.color());
            }

            if let Some(position) = self.user_position() {
                render::draw_user_marker(&mut canvas, self.viewport.project(position, size));
            }

            if let Some(station) = self.selected.map(|index| &self.stations[index]) {
                let anchor = self.viewport.project(station.coordinate(), size);
                render::draw_popup(&mut canvas, anchor, &render::popup_lines(station, &self.scale));
            }

            render::draw_legend(&mut canvas, &self.scale);
            render::draw_locate_button(&mut canvas);
            if let Some(message) = &self.notice {
                render::draw_notice(&mut canvas, message);
            }
        }
        display.flush()
    }

    /// Sever the position subscription; the stored position is
    /// discarded and late platform callbacks are ignored.
    pub fn release(&mut self) {
        self.feed.release();
    }
}

impl Drop for MapShell {
    fn drop(&mut self) {
        self.feed.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::Severity;
    use crate::basemap::SolidBasemap;
    use crate::location::{FakeLocationSource, LocationError, LocationSource, NullLocationSource};
    use crate::render::Framebuffer;
    use crate::station::{load, Station};
    use embedded_graphics::pixelcolor::{Rgb888, WebColors};

    const CANVAS: Size = Size::new(480, 320);

    fn one_station(pm25: &str) -> Vec<Station> {
        load(&format!(
            r#"[{{"id": 1, "name": "Gedung Sate", "region": "Kota Bandung",
                 "latitude": -6.9, "longitude": 107.6,
                 "pm25": {pm25}, "pm10": 29.8, "o3": 41.2}}]"#
        ))
        .unwrap()
    }

    fn render_to_frame(shell: &mut MapShell) -> Framebuffer {
        let mut frame = Framebuffer::new(CANVAS);
        // A background no marker color uses, so counts are unambiguous.
        let mut basemap = SolidBasemap { color: Rgb888::new(9, 9, 9) };
        shell.render(&mut basemap, &mut frame).unwrap();
        frame
    }

    // The single station sits at the default view center, so its pin
    // head is centered 9 pixels above the canvas middle.
    const PIN_HEAD: Point = Point::new(240, 151);

    #[test]
    fn good_station_renders_a_green_marker() {
        let stations = one_station("10");
        let mut shell = MapShell::new(MapConfig::default(), stations.clone());
        let frame = render_to_frame(&mut shell);
        assert_eq!(frame.pixel(PIN_HEAD), Some(Severity::Good.color()));
        let popup = render::popup_lines(&stations[0], &Scale::pm25());
        assert!(popup.iter().any(|l| l == "Category: Good"));
    }

    #[test]
    fn hazardous_station_renders_a_black_marker() {
        let stations = one_station("300");
        let mut shell = MapShell::new(MapConfig::default(), stations.clone());
        let frame = render_to_frame(&mut shell);
        assert_eq!(frame.pixel(PIN_HEAD), Some(Severity::Hazardous.color()));
        let popup = render::popup_lines(&stations[0], &Scale::pm25());
        assert!(popup.iter().any(|l| l == "Category: Hazardous"));
    }

    #[test]
    fn empty_dataset_renders_no_markers() {
        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        let frame = render_to_frame(&mut shell);
        assert_eq!(frame.pixel(PIN_HEAD), Some(Rgb888::new(9, 9, 9)));
    }

    #[test]
    fn first_fix_transitions_position_and_feeds_the_locate_action() {
        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        let mut source = FakeLocationSource::at(&[(-6.9, 107.6)]);
        assert_eq!(shell.user_position(), None);

        shell.attach(&mut source);
        let position = shell.user_position().expect("fix should be known");
        assert_eq!(position, Coordinate::new(-6.9, 107.6));

        shell.locate(&mut source);
        assert_eq!(shell.viewport().center(), position);
        assert_eq!(shell.viewport().zoom(), 12);
    }

    #[test]
    fn watch_updates_replace_the_position() {
        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        let mut source = FakeLocationSource::at(&[(-6.9, 107.6), (-6.8, 107.7)]);
        shell.attach(&mut source);
        assert!(source.deliver_next());
        assert_eq!(shell.user_position(), Some(Coordinate::new(-6.8, 107.7)));
    }

    #[test]
    fn release_stops_late_updates() {
        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        let mut source = FakeLocationSource::at(&[(-6.9, 107.6), (-6.8, 107.7)]);
        shell.attach(&mut source);
        shell.release();

        // A late platform delivery after teardown.
        source.deliver_next();
        assert_eq!(shell.user_position(), None);
    }

    #[test]
    fn missing_capability_surfaces_a_blocking_notice() {
        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        shell.attach(&mut NullLocationSource);
        let frame = render_to_frame(&mut shell);
        // The banner occupies the full top rows.
        assert!(frame.count(Rgb888::CSS_FIRE_BRICK) > CANVAS.width as usize);
    }

    #[test]
    fn click_dismisses_a_notice_before_anything_else() {
        let mut shell = MapShell::new(MapConfig::default(), one_station("10"));
        shell.attach(&mut NullLocationSource);
        render_to_frame(&mut shell);
        // First click only dismisses; the station under it stays
        // unselected.
        let marker = shell.viewport().project(Coordinate::new(-6.9, 107.6), CANVAS);
        shell.click(marker + Point::new(0, -9), CANVAS, &mut NullLocationSource);
        assert!(shell.selected_station().is_none());
        let frame = render_to_frame(&mut shell);
        assert_eq!(frame.count(Rgb888::CSS_FIRE_BRICK), 0);
    }

    #[test]
    fn clicking_a_marker_selects_it_and_renders_the_popup() {
        let mut shell = MapShell::new(MapConfig::default(), one_station("10"));
        let marker = shell.viewport().project(Coordinate::new(-6.9, 107.6), CANVAS);
        shell.click(marker + Point::new(0, -9), CANVAS, &mut NullLocationSource);
        assert_eq!(shell.selected_station().unwrap().id, 1);
        // Clicking empty water deselects.
        shell.click(Point::new(10, 10), CANVAS, &mut NullLocationSource);
        assert!(shell.selected_station().is_none());
    }

    #[test]
    fn locate_without_a_fix_notices_and_retries() {
        struct CountingSource {
            requests: usize,
        }
        impl LocationSource for CountingSource {
            fn request_once(&mut self, _: &PositionFeed) -> Result<(), LocationError> {
                self.requests += 1;
                Err(LocationError::Unavailable("denied".into()))
            }
            fn watch(&mut self, _: &PositionFeed) -> Result<(), LocationError> {
                Ok(())
            }
        }

        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        let mut source = CountingSource { requests: 0 };
        shell.locate(&mut source);
        assert_eq!(source.requests, 1);
        let frame = render_to_frame(&mut shell);
        assert!(frame.count(Rgb888::CSS_FIRE_BRICK) > 0);
    }

    #[test]
    fn render_survives_a_failing_basemap() {
        struct BrokenBasemap;
        impl Basemap for BrokenBasemap {
            fn draw<D>(&mut self, _: &Viewport, _: &mut D) -> Result<(), String>
            where
                D: embedded_graphics::draw_target::DrawTarget<
                    Color = Rgb888,
                    Error = std::convert::Infallible,
                >,
            {
                Err("tiles unreachable".into())
            }
        }

        let mut shell = MapShell::new(MapConfig::default(), one_station("10"));
        let mut frame = Framebuffer::new(CANVAS);
        shell.render(&mut BrokenBasemap, &mut frame).unwrap();
        assert!(frame.count(Severity::Good.color()) > 0);
    }

    #[test]
    fn user_marker_appears_after_a_fix() {
        let mut shell = MapShell::new(MapConfig::default(), Vec::new());
        let mut source = FakeLocationSource::at(&[(-6.9, 107.6)]);
        shell.attach(&mut source);
        // The first fix recenters the view, so the user dot sits in the
        // canvas middle.
        let frame = render_to_frame(&mut shell);
        assert_eq!(frame.pixel(Point::new(240, 160)), Some(Rgb888::new(0x00, 0x7b, 0xff)));
    }
}
