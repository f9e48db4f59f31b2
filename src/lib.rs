//! An interactive air-quality map.
//!
//! Plots fixed monitoring stations from a bundled dataset, colors each
//! marker by the severity band of its PM2.5 reading, and tracks the
//! visiting user's position through a cancellable geolocation
//! subscription. A legend and a locate control round out the page.
//!
//! All drawing goes through [`MapDisplay`], so the same shell renders to
//! the desktop simulator window (feature `simulator`) or to an HTML
//! canvas in the browser (feature `web`).

use std::convert::Infallible;

use embedded_graphics_core::pixelcolor::Rgb888;

pub mod aqi;
pub mod basemap;
pub mod context;
pub mod geo;
pub mod location;
pub mod render;
pub mod shell;
pub mod station;

#[cfg(feature = "simulator")]
pub mod simulator;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

/// A rendering surface for the map.
pub trait MapDisplay {
    /// Access the canvas for drawing the current frame.
    fn canvas(
        &mut self,
    ) -> impl embedded_graphics_core::draw_target::DrawTarget<Color = Rgb888, Error = Infallible>;

    /// Present the finished frame (v-sync / blit).
    fn flush(&mut self) -> Result<(), String>;
}
