//! Desktop window backend over `embedded-graphics-simulator`.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::{DrawTarget, DrawTargetExt},
    geometry::{OriginDimensions, Size},
    pixelcolor::Rgb888,
    prelude::Dimensions,
};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};

use crate::MapDisplay;

/// Map canvas size for the simulator window.
pub const CANVAS_SIZE: Size = Size::new(480, 320);

/// Simulator-backed map window.
pub struct SimMapDisplay {
    display: SimulatorDisplay<Rgb888>,
    window: Option<Window>,
}

impl SimMapDisplay {
    pub fn new() -> Self {
        let settings = OutputSettingsBuilder::new().scale(2).build();
        let window = Window::new("Air quality map", &settings);
        SimMapDisplay {
            window: Some(window),
            ..Self::new_hidden()
        }
    }

    /// Headless variant, for rendering without a window.
    pub fn new_hidden() -> Self {
        SimMapDisplay {
            display: SimulatorDisplay::new(CANVAS_SIZE),
            window: None,
        }
    }

    pub fn size(&self) -> Size {
        self.display.size()
    }

    /// Drain pending window events. Empty when hidden. Call after the
    /// first flush; the simulator only reports events for a shown
    /// window.
    pub fn events(&mut self) -> Vec<SimulatorEvent> {
        match &mut self.window {
            Some(window) => window.events().collect(),
            None => Vec::new(),
        }
    }
}

impl Default for SimMapDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDisplay for SimMapDisplay {
    fn canvas(&mut self) -> impl DrawTarget<Color = Rgb888, Error = Infallible> {
        let area = self.display.bounding_box();
        self.display.cropped(&area)
    }

    fn flush(&mut self) -> Result<(), String> {
        if let Some(window) = &mut self.window {
            window.update(&self.display);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basemap::GraticuleBasemap;
    use crate::shell::{MapConfig, MapShell};
    use crate::station;

    #[test]
    fn renders_the_bundled_dataset_to_a_hidden_display() {
        let stations = station::load(station::BUNDLED_JSON).unwrap();
        let mut shell = MapShell::new(MapConfig::default(), stations);
        let mut display = SimMapDisplay::new_hidden();
        shell
            .render(&mut GraticuleBasemap::default(), &mut display)
            .unwrap();
        assert_eq!(display.size(), CANVAS_SIZE);
    }
}
