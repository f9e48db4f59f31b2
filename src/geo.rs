//! Geographic coordinates and the map viewport.
//!
//! Pixel projection follows the Web-Mercator scheme used by slippy-map
//! tiles: at zoom `z` the world is a square of `256 * 2^z` pixels.
//! Equations per <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>.

use std::f64::consts::PI;

use embedded_graphics::prelude::{Point, Size};

/// A geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate { latitude, longitude }
    }
}

const TILE_SIZE: f64 = 256.0;

/// The visible window onto the world: a center and a zoom level.
#[derive(Clone, Debug)]
pub struct Viewport {
    center: Coordinate,
    zoom: u8,
}

impl Viewport {
    pub fn new(center: Coordinate, zoom: u8) -> Self {
        Viewport { center, zoom }
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn recenter(&mut self, center: Coordinate) {
        self.center = center;
    }

    /// Zoom levels above 19 exceed what tile pyramids provide.
    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.min(19);
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * f64::from(1u32 << self.zoom)
    }

    /// World-pixel position of a coordinate at the current zoom.
    fn world(&self, c: Coordinate) -> (f64, f64) {
        let scale = self.world_size();
        let x = (c.longitude + 180.0) / 360.0 * scale;
        let lat = c.latitude.to_radians();
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
        (x, y)
    }

    /// Canvas-pixel position of a coordinate, with the viewport center in
    /// the middle of a canvas of the given size. The result may lie
    /// outside the canvas; drawing clips.
    pub fn project(&self, c: Coordinate, canvas: Size) -> Point {
        let (cx, cy) = self.world(self.center);
        let (x, y) = self.world(c);
        Point::new(
            ((x - cx) + f64::from(canvas.width) / 2.0).round() as i32,
            ((y - cy) + f64::from(canvas.height) / 2.0).round() as i32,
        )
    }

    /// Inverse of [`Viewport::project`].
    pub fn unproject(&self, p: Point, canvas: Size) -> Coordinate {
        let (cx, cy) = self.world(self.center);
        let scale = self.world_size();
        let x = cx + f64::from(p.x) - f64::from(canvas.width) / 2.0;
        let y = cy + f64::from(p.y) - f64::from(canvas.height) / 2.0;
        let longitude = x / scale * 360.0 - 180.0;
        let latitude = (PI * (1.0 - 2.0 * y / scale)).sinh().atan().to_degrees();
        Coordinate::new(latitude, longitude)
    }

    /// Shift the center by a pixel delta, e.g. for keyboard panning.
    pub fn pan(&mut self, delta: Point, canvas: Size) {
        let middle = Point::new(canvas.width as i32 / 2, canvas.height as i32 / 2);
        self.center = self.unproject(middle + delta, canvas);
    }
}
