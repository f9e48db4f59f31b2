//! Drawing routines for the map: markers, legend, popup, controls, and
//! the plain framebuffer they can render into.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::{DrawTarget, DrawTargetExt},
    geometry::{OriginDimensions, Point, Size},
    mono_font::{ascii::FONT_4X6, MonoTextStyle},
    pixelcolor::{Rgb888, RgbColor, WebColors},
    prelude::*,
    primitives::{Circle, PrimitiveStyleBuilder, Rectangle, Triangle},
    text::Text,
    Pixel,
};

use crate::aqi::{Scale, Severity};
use crate::station::Station;
use crate::MapDisplay;

/// The user-marker and control accent color.
const ACCENT: Rgb888 = Rgb888::new(0x00, 0x7b, 0xff);

/// Vertical extent of a station pin above its anchor point.
const MARKER_HEIGHT: i32 = 14;

/// Draw a station pin anchored at its geographic point: a colored head
/// with a white outline and a short tail down to the anchor.
pub fn draw_marker<D>(target: &mut D, anchor: Point, color: Rgb888)
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let style = PrimitiveStyleBuilder::new()
        .fill_color(color)
        .stroke_color(Rgb888::CSS_WHITE)
        .stroke_width(1)
        .build();
    Triangle::new(anchor + Point::new(-3, -6), anchor + Point::new(3, -6), anchor)
        .into_styled(style)
        .draw(target)
        .expect("infallible");
    Circle::with_center(anchor + Point::new(0, -9), 9)
        .into_styled(style)
        .draw(target)
        .expect("infallible");
}

/// True if a pointer position lands on the head of a pin anchored at
/// `anchor`.
pub fn marker_hit(anchor: Point, at: Point) -> bool {
    let dx = at.x - anchor.x;
    let dy = at.y - (anchor.y - 9);
    dx * dx + dy * dy <= 36
}

/// The user's position: a blue dot with a white ring.
pub fn draw_user_marker<D>(target: &mut D, at: Point)
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let style = PrimitiveStyleBuilder::new()
        .fill_color(ACCENT)
        .stroke_color(Rgb888::CSS_WHITE)
        .stroke_width(2)
        .build();
    Circle::with_center(at, 11)
        .into_styled(style)
        .draw(target)
        .expect("infallible");
}

/// Fixed legend in the bottom-left corner: every classifier band with a
/// color swatch, plus the no-data row.
pub fn draw_legend<D>(target: &mut D, scale: &Scale)
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    const ROW: i32 = 8;
    const PAD: i32 = 4;
    let canvas = target.bounding_box().size;

    let mut rows: Vec<(Rgb888, String)> = Vec::new();
    let mut lower = 0.0f64;
    for band in scale.bands() {
        rows.push((
            band.severity.color(),
            format!("{} {}-{}", band.severity.label(), lower, band.ceiling),
        ));
        lower = band.ceiling;
    }
    rows.push((scale.overflow().color(), format!("{} >{}", scale.overflow().label(), lower)));
    rows.push((Severity::Unknown.color(), format!("{} no data", Severity::Unknown.label())));

    let longest = rows.iter().map(|(_, text)| text.len()).max().unwrap_or(0) as i32;
    let width = longest * 4 + 12 + 2 * PAD;
    let height = (rows.len() as i32 + 1) * ROW + 2 * PAD;
    let origin = Point::new(PAD, canvas.height as i32 - height - PAD);

    Rectangle::new(origin, Size::new(width as u32, height as u32))
        .into_styled(
            PrimitiveStyleBuilder::new()
                .fill_color(Rgb888::CSS_WHITE)
                .stroke_color(Rgb888::CSS_DIM_GRAY)
                .stroke_width(1)
                .build(),
        )
        .draw(target)
        .expect("infallible");

    let text_style = MonoTextStyle::new(&FONT_4X6, Rgb888::CSS_BLACK);
    Text::new("PM2.5 (ug/m3)", origin + Point::new(PAD, PAD + 5), text_style)
        .draw(target)
        .expect("infallible");
    for (i, (color, label)) in rows.iter().enumerate() {
        let y = PAD + (i as i32 + 1) * ROW;
        Rectangle::new(origin + Point::new(PAD, y), Size::new(6, 6))
            .into_styled(
                PrimitiveStyleBuilder::new()
                    .fill_color(*color)
                    .stroke_color(Rgb888::CSS_DIM_GRAY)
                    .stroke_width(1)
                    .build(),
            )
            .draw(target)
            .expect("infallible");
        Text::new(label, origin + Point::new(PAD + 10, y + 5), text_style)
            .draw(target)
            .expect("infallible");
    }
}

/// Popup body for a station, as displayed lines.
pub fn popup_lines(station: &Station, scale: &Scale) -> Vec<String> {
    vec![
        station.name.clone(),
        format!("Region: {}", station.region),
        format!("PM2.5: {} ug/m3", station.pm25.raw()),
        format!("PM10: {} ug/m3", station.pm10.raw()),
        format!("O3: {} ug/m3", station.o3.raw()),
        format!("Category: {}", scale.classify_reading(station.pm25.value()).label()),
    ]
}

/// Draw a popup box above a marker anchor, clamped into the canvas.
pub fn draw_popup<D>(target: &mut D, anchor: Point, lines: &[String])
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    const ROW: i32 = 7;
    const PAD: i32 = 3;
    let canvas = target.bounding_box().size;

    let longest = lines.iter().map(|line| line.len()).max().unwrap_or(0) as i32;
    let width = longest * 4 + 2 * PAD;
    let height = lines.len() as i32 * ROW + 2 * PAD;
    let x = (anchor.x - width / 2).clamp(2, (canvas.width as i32 - width - 2).max(2));
    let y = (anchor.y - MARKER_HEIGHT - height).max(2);

    Rectangle::new(Point::new(x, y), Size::new(width as u32, height as u32))
        .into_styled(
            PrimitiveStyleBuilder::new()
                .fill_color(Rgb888::CSS_WHITE)
                .stroke_color(Rgb888::CSS_DIM_GRAY)
                .stroke_width(1)
                .build(),
        )
        .draw(target)
        .expect("infallible");

    let text_style = MonoTextStyle::new(&FONT_4X6, Rgb888::CSS_BLACK);
    for (i, line) in lines.iter().enumerate() {
        Text::new(line, Point::new(x + PAD, y + PAD + 5 + i as i32 * ROW), text_style)
            .draw(target)
            .expect("infallible");
    }
}

/// The locate control's screen area, for drawing and hit-testing.
pub fn locate_button_rect(canvas: Size) -> Rectangle {
    const SIZE: Size = Size::new(30, 13);
    Rectangle::new(
        Point::new(
            canvas.width as i32 - SIZE.width as i32 - 4,
            canvas.height as i32 - SIZE.height as i32 - 4,
        ),
        SIZE,
    )
}

pub fn draw_locate_button<D>(target: &mut D)
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let rect = locate_button_rect(target.bounding_box().size);
    rect.into_styled(
        PrimitiveStyleBuilder::new()
            .fill_color(ACCENT)
            .stroke_color(Rgb888::CSS_WHITE)
            .stroke_width(1)
            .build(),
    )
    .draw(target)
    .expect("infallible");
    Text::new(
        "FIND",
        rect.top_left + Point::new(7, 9),
        MonoTextStyle::new(&FONT_4X6, Rgb888::CSS_WHITE),
    )
    .draw(target)
    .expect("infallible");
}

/// A blocking notice banner across the top of the canvas.
pub fn draw_notice<D>(target: &mut D, message: &str)
where
    D: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let canvas = target.bounding_box().size;
    Rectangle::new(Point::zero(), Size::new(canvas.width, 12))
        .into_styled(
            PrimitiveStyleBuilder::new()
                .fill_color(Rgb888::CSS_FIRE_BRICK)
                .build(),
        )
        .draw(target)
        .expect("infallible");
    Text::new(
        message,
        Point::new(4, 8),
        MonoTextStyle::new(&FONT_4X6, Rgb888::CSS_WHITE),
    )
    .draw(target)
    .expect("infallible");
}

/// A plain RGB framebuffer.
///
/// Backs the browser canvas and any offscreen rendering; out-of-bounds
/// writes are dropped.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl Framebuffer {
    pub fn new(size: Size) -> Self {
        Framebuffer {
            size,
            pixels: vec![Rgb888::BLACK; (size.width * size.height) as usize],
        }
    }

    pub fn pixel(&self, p: Point) -> Option<Rgb888> {
        if p.x < 0 || p.y < 0 || p.x as u32 >= self.size.width || p.y as u32 >= self.size.height {
            return None;
        }
        Some(self.pixels[(p.y as u32 * self.size.width + p.x as u32) as usize])
    }

    /// Number of pixels currently holding exactly this color.
    pub fn count(&self, color: Rgb888) -> usize {
        self.pixels.iter().filter(|&&px| px == color).count()
    }

    /// Serialize as RGBA8888 rows, for canvas `ImageData`.
    pub fn write_rgba(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.pixels.len() * 4);
        for px in &self.pixels {
            out.extend_from_slice(&[px.r(), px.g(), px.b(), 0xff]);
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < self.size.width && (p.y as u32) < self.size.height
            {
                self.pixels[(p.y as u32 * self.size.width + p.x as u32) as usize] = color;
            }
        }
        Ok(())
    }
}

/// Offscreen rendering: the framebuffer is itself a [`MapDisplay`] whose
/// flush is a no-op.
impl MapDisplay for Framebuffer {
    fn canvas(&mut self) -> impl DrawTarget<Color = Rgb888, Error = Infallible> {
        let area = self.bounding_box();
        self.cropped(&area)
    }

    fn flush(&mut self) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::Reading;

    fn station(pm25: Reading) -> Station {
        Station {
            id: 1,
            name: "Gedung Sate".into(),
            region: "Kota Bandung".into(),
            latitude: -6.9,
            longitude: 107.6,
            pm25,
            pm10: Reading::from(29.8),
            o3: Reading::parse("41.2"),
        }
    }

    #[test]
    fn popup_contains_raw_values_and_category() {
        let lines = popup_lines(&station(Reading::from(10.0)), &Scale::pm25());
        let body = lines.join("\n");
        assert!(body.contains("Gedung Sate"));
        assert!(body.contains("Kota Bandung"));
        assert!(body.contains("PM2.5: 10"));
        assert!(body.contains("PM10: 29.8"));
        assert!(body.contains("O3: 41.2"));
        assert!(body.contains("Category: Good"));
    }

    #[test]
    fn popup_reports_unknown_for_bad_reading() {
        let lines = popup_lines(&station(Reading::parse("n/a")), &Scale::pm25());
        assert!(lines.iter().any(|l| l == "Category: Unknown"));
        assert!(lines.iter().any(|l| l == "PM2.5: n/a ug/m3"));
    }

    #[test]
    fn marker_draws_its_fill_color() {
        let mut frame = Framebuffer::new(Size::new(64, 64));
        draw_marker(&mut frame, Point::new(32, 32), Rgb888::CSS_GREEN);
        assert!(frame.count(Rgb888::CSS_GREEN) > 0);
        assert!(frame.count(Rgb888::CSS_WHITE) > 0);
    }

    #[test]
    fn marker_near_the_edge_is_clipped_not_panicking() {
        let mut frame = Framebuffer::new(Size::new(16, 16));
        draw_marker(&mut frame, Point::new(0, 0), Rgb888::CSS_RED);
        draw_marker(&mut frame, Point::new(200, 200), Rgb888::CSS_RED);
    }

    #[test]
    fn marker_hit_test_matches_the_pin_head() {
        let anchor = Point::new(50, 50);
        assert!(marker_hit(anchor, Point::new(50, 41)));
        assert!(marker_hit(anchor, Point::new(53, 44)));
        assert!(!marker_hit(anchor, Point::new(50, 70)));
        assert!(!marker_hit(anchor, Point::new(80, 41)));
    }

    #[test]
    fn legend_lists_every_band() {
        // Rendered at FONT_4X6 scale; the text itself is exercised via
        // the row construction in draw_legend, so just check it draws
        // panel pixels and every band color.
        let mut frame = Framebuffer::new(Size::new(160, 120));
        let scale = Scale::pm25();
        draw_legend(&mut frame, &scale);
        for band in scale.bands() {
            assert!(frame.count(band.severity.color()) > 0, "{}", band.severity.label());
        }
        assert!(frame.count(Severity::Unknown.color()) > 0);
        assert!(frame.count(Rgb888::CSS_WHITE) > 0);
    }

    #[test]
    fn locate_button_sits_inside_the_canvas() {
        let canvas = Size::new(480, 320);
        let rect = locate_button_rect(canvas);
        assert!(rect.top_left.x > 0 && rect.top_left.y > 0);
        let corner = rect.top_left + Point::new(rect.size.width as i32, rect.size.height as i32);
        assert!(corner.x <= 480 && corner.y <= 320);
    }

    #[test]
    fn framebuffer_drops_out_of_bounds_writes() {
        let mut frame = Framebuffer::new(Size::new(8, 8));
        frame
            .draw_iter([Pixel(Point::new(-1, 0), Rgb888::CSS_RED), Pixel(Point::new(8, 8), Rgb888::CSS_RED)])
            .unwrap();
        assert_eq!(frame.count(Rgb888::CSS_RED), 0);
    }
}
