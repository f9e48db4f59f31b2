//! The background layer behind the markers.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};
use embedded_graphics_core::pixelcolor::Rgb888;

use crate::geo::Viewport;

/// An external background provider.
///
/// A failure here degrades the backdrop only: the shell logs it and
/// keeps rendering markers over whatever was drawn.
pub trait Basemap {
    fn draw<D>(&mut self, viewport: &Viewport, target: &mut D) -> Result<(), String>
    where
        D: DrawTarget<Color = Rgb888, Error = Infallible>;

    /// Attribution to surface alongside the map, if the imagery
    /// requires it.
    fn attribution(&self) -> Option<&str> {
        None
    }
}

/// A uniform background color. Never fails.
pub struct SolidBasemap {
    pub color: Rgb888,
}

impl Basemap for SolidBasemap {
    fn draw<D>(&mut self, _viewport: &Viewport, target: &mut D) -> Result<(), String>
    where
        D: DrawTarget<Color = Rgb888, Error = Infallible>,
    {
        target.clear(self.color).expect("infallible");
        Ok(())
    }
}

/// A solid fill plus faint one-degree graticule lines, so panning and
/// zooming stay visible without network imagery.
pub struct GraticuleBasemap {
    pub fill: Rgb888,
    pub line: Rgb888,
}

impl Default for GraticuleBasemap {
    fn default() -> Self {
        GraticuleBasemap {
            fill: Rgb888::new(24, 33, 42),
            line: Rgb888::new(44, 58, 71),
        }
    }
}

impl Basemap for GraticuleBasemap {
    fn draw<D>(&mut self, viewport: &Viewport, target: &mut D) -> Result<(), String>
    where
        D: DrawTarget<Color = Rgb888, Error = Infallible>,
    {
        target.clear(self.fill).expect("infallible");

        let size = target.bounding_box().size;
        let style = PrimitiveStyle::with_stroke(self.line, 1);
        let top_left = viewport.unproject(Point::zero(), size);
        let bottom_right =
            viewport.unproject(Point::new(size.width as i32, size.height as i32), size);

        let mut longitude = top_left.longitude.floor();
        while longitude <= bottom_right.longitude.ceil() {
            let x = viewport
                .project(crate::geo::Coordinate::new(viewport.center().latitude, longitude), size)
                .x;
            Line::new(Point::new(x, 0), Point::new(x, size.height as i32 - 1))
                .into_styled(style)
                .draw(target)
                .expect("infallible");
            longitude += 1.0;
        }

        // Latitude decreases from the top of the canvas to the bottom.
        let mut latitude = bottom_right.latitude.floor();
        while latitude <= top_left.latitude.ceil() {
            let y = viewport
                .project(crate::geo::Coordinate::new(latitude, viewport.center().longitude), size)
                .y;
            Line::new(Point::new(0, y), Point::new(size.width as i32 - 1, y))
                .into_styled(style)
                .draw(target)
                .expect("infallible");
            latitude += 1.0;
        }
        Ok(())
    }
}
