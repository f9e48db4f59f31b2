//! Interactive simulator for the air-quality map.
//!
//! Arrow keys pan, `-`/`=` zoom, `L` or the on-map button locates, a
//! click opens a station popup.

use std::time::Duration;

use aqmap::basemap::GraticuleBasemap;
use aqmap::context::Context;
use aqmap::location::FakeLocationSource;
use aqmap::shell::{MapConfig, MapShell};
use aqmap::simulator::SimMapDisplay;
use aqmap::station;
use embedded_graphics::prelude::Point;
use embedded_graphics_simulator::{sdl2::Keycode, SimulatorEvent};

fn main() {
    tracing_subscriber::fmt::init();

    let ctx = Context::new();
    {
        let ctx = ctx.clone();
        ctrlc::set_handler(move || {
            tracing::info!("got SIGINT, closing context");
            ctx.cancel();
        })
        .expect("could not set SIGINT handler");
    }

    let stations = match station::load(station::BUNDLED_JSON) {
        Ok(stations) => stations,
        Err(error) => {
            tracing::error!(%error, "bundled dataset failed to parse; rendering no markers");
            Vec::new()
        }
    };

    let mut display = SimMapDisplay::new();
    let mut basemap = GraticuleBasemap::default();
    let mut shell = MapShell::new(MapConfig::default(), stations);

    // A scripted stroll near the home view stands in for the platform
    // geolocation stream.
    let mut source = FakeLocationSource::at(&[
        (-6.9000, 107.6000),
        (-6.8991, 107.6014),
        (-6.8979, 107.6031),
        (-6.8964, 107.6047),
        (-6.8951, 107.6066),
        (-6.8942, 107.6084),
        (-6.8929, 107.6101),
    ]);
    shell.attach(&mut source);

    let size = display.size();
    let mut frame = 0u32;
    while !ctx.is_cancelled() {
        if let Err(error) = shell.render(&mut basemap, &mut display) {
            tracing::error!(%error, "could not present frame");
            break;
        }

        for event in display.events() {
            match event {
                SimulatorEvent::Quit => ctx.cancel(),
                SimulatorEvent::MouseButtonDown { point, .. } => {
                    shell.click(point, size, &mut source);
                }
                SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                    Keycode::L => shell.locate(&mut source),
                    Keycode::Up => shell.pan_by(Point::new(0, -32), size),
                    Keycode::Down => shell.pan_by(Point::new(0, 32), size),
                    Keycode::Left => shell.pan_by(Point::new(-32, 0), size),
                    Keycode::Right => shell.pan_by(Point::new(32, 0), size),
                    Keycode::Equals => shell.zoom_by(1),
                    Keycode::Minus => shell.zoom_by(-1),
                    _ => {}
                },
                _ => {}
            }
        }

        // Platform cadence: one watch update every couple of seconds.
        frame += 1;
        if frame % 20 == 0 {
            source.deliver_next();
        }

        ctx.wait_timeout(Duration::from_millis(100));
    }
    shell.release();

    tracing::info!("shut down");
}
