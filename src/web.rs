//! Browser backend: canvas rendering, console logging, and the real
//! geolocation API.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use chrono::Utc;
use embedded_graphics::{
    draw_target::{DrawTarget, DrawTargetExt},
    geometry::{Point, Size},
    pixelcolor::Rgb888,
    prelude::Dimensions,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::basemap::GraticuleBasemap;
use crate::geo::Coordinate;
use crate::location::{
    Fix, LocationError, LocationSource, NullLocationSource, PositionFeed, WatchOptions,
};
use crate::render::Framebuffer;
use crate::shell::{MapConfig, MapShell};
use crate::station;
use crate::MapDisplay;

/// Set up logging to the browser console when the module loads.
#[wasm_bindgen(start)]
fn run() {
    tracing_subscriber::fmt::fmt()
        .with_writer(log::MakeConsoleWriter)
        .init();

    tracing::info!("aqmap module loaded");
}

mod log {
    use tracing_subscriber::fmt::MakeWriter;
    use wasm_bindgen::JsValue;

    /// Makes a writer to the web_sys console.
    pub struct MakeConsoleWriter;

    impl MakeWriter<'_> for MakeConsoleWriter {
        type Writer = MakeConsoleWriter;

        fn make_writer(&'_ self) -> Self::Writer {
            MakeConsoleWriter
        }
    }

    impl std::io::Write for MakeConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match core::str::from_utf8(buf) {
                Ok(s) => web_sys::console::log_1(&JsValue::from_str(s)),
                Err(_) => {
                    web_sys::console::log_1(&JsValue::from_str(&format!(
                        "non-string log message: {buf:?}"
                    )));
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}

/// Map display over an HTML canvas 2D context.
pub struct CanvasDisplay {
    frame: Framebuffer,
    context: CanvasRenderingContext2d,
    rgba: Vec<u8>,
}

impl CanvasDisplay {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let size = Size::new(canvas.width(), canvas.height());
        Ok(CanvasDisplay {
            frame: Framebuffer::new(size),
            context,
            rgba: Vec::new(),
        })
    }

    pub fn size(&self) -> Size {
        self.frame.bounding_box().size
    }
}

impl MapDisplay for CanvasDisplay {
    fn canvas(&mut self) -> impl DrawTarget<Color = Rgb888, Error = Infallible> {
        let area = self.frame.bounding_box();
        self.frame.cropped(&area)
    }

    fn flush(&mut self) -> Result<(), String> {
        let size = self.size();
        self.frame.write_rgba(&mut self.rgba);
        let image =
            ImageData::new_with_u8_clamped_array_and_sh(Clamped(&self.rgba), size.width, size.height)
                .map_err(|e| format!("{e:?}"))?;
        self.context
            .put_image_data(&image, 0.0, 0.0)
            .map_err(|e| format!("{e:?}"))
    }
}

fn fix_from_position(pos: &web_sys::Position) -> Fix {
    let coords = pos.coords();
    Fix {
        coordinate: Coordinate::new(coords.latitude(), coords.longitude()),
        timestamp: chrono::DateTime::from_timestamp_millis(pos.timestamp() as i64)
            .unwrap_or_else(Utc::now),
    }
}

/// Geolocation over `navigator.geolocation`.
///
/// Callbacks hold a clone of the feed. Once the feed is released the
/// watch callback clears its own platform registration, so no update is
/// applied after teardown.
pub struct WebLocationSource {
    geolocation: web_sys::Geolocation,
    options: WatchOptions,
    watch_id: Rc<Cell<Option<i32>>>,
    // Kept alive for as long as the platform may call them.
    on_position: Vec<Closure<dyn FnMut(web_sys::Position)>>,
    on_error: Vec<Closure<dyn FnMut(web_sys::PositionError)>>,
}

impl WebLocationSource {
    pub fn new(options: WatchOptions) -> Result<Self, LocationError> {
        let window = web_sys::window().ok_or(LocationError::Unsupported)?;
        let geolocation = window
            .navigator()
            .geolocation()
            .map_err(|_| LocationError::Unsupported)?;
        Ok(WebLocationSource {
            geolocation,
            options,
            watch_id: Rc::new(Cell::new(None)),
            on_position: Vec::new(),
            on_error: Vec::new(),
        })
    }

    fn position_options(&self) -> web_sys::PositionOptions {
        let options = web_sys::PositionOptions::new();
        options.set_enable_high_accuracy(self.options.high_accuracy);
        options.set_maximum_age(self.options.max_age_ms);
        options
    }
}

impl LocationSource for WebLocationSource {
    fn request_once(&mut self, feed: &PositionFeed) -> Result<(), LocationError> {
        let on_fix = feed.clone();
        let success = Closure::wrap(Box::new(move |pos: web_sys::Position| {
            on_fix.push(fix_from_position(&pos));
        }) as Box<dyn FnMut(web_sys::Position)>);

        let on_failure = feed.clone();
        let failure = Closure::wrap(Box::new(move |err: web_sys::PositionError| {
            on_failure.push_notice(LocationError::Unavailable(err.message()));
        }) as Box<dyn FnMut(web_sys::PositionError)>);

        self.geolocation
            .get_current_position_with_error_callback_and_options(
                success.as_ref().unchecked_ref(),
                Some(failure.as_ref().unchecked_ref()),
                &self.position_options(),
            )
            .map_err(|e| LocationError::Unavailable(format!("{e:?}")))?;

        self.on_position.push(success);
        self.on_error.push(failure);
        Ok(())
    }

    fn watch(&mut self, feed: &PositionFeed) -> Result<(), LocationError> {
        let watch_id = Rc::clone(&self.watch_id);
        let geolocation = self.geolocation.clone();
        let on_fix = feed.clone();
        let success = Closure::wrap(Box::new(move |pos: web_sys::Position| {
            if on_fix.is_released() {
                if let Some(id) = watch_id.take() {
                    geolocation.clear_watch(id);
                }
                return;
            }
            on_fix.push(fix_from_position(&pos));
        }) as Box<dyn FnMut(web_sys::Position)>);

        // Tracking failures are logged; the watch stays registered.
        let failure = Closure::wrap(Box::new(move |err: web_sys::PositionError| {
            tracing::warn!(code = err.code(), message = %err.message(), "position update failed");
        }) as Box<dyn FnMut(web_sys::PositionError)>);

        let id = self
            .geolocation
            .watch_position_with_error_callback_and_options(
                success.as_ref().unchecked_ref(),
                Some(failure.as_ref().unchecked_ref()),
                &self.position_options(),
            )
            .map_err(|e| LocationError::Unavailable(format!("{e:?}")))?;
        self.watch_id.set(Some(id));

        self.on_position.push(success);
        self.on_error.push(failure);
        Ok(())
    }
}

impl Drop for WebLocationSource {
    fn drop(&mut self) {
        if let Some(id) = self.watch_id.take() {
            self.geolocation.clear_watch(id);
        }
    }
}

/// The page-facing application object. JS constructs it with a canvas
/// id, then drives frames and forwards pointer events.
#[wasm_bindgen]
pub struct WebApp {
    shell: MapShell,
    display: CanvasDisplay,
    basemap: GraticuleBasemap,
    source: Option<WebLocationSource>,
}

#[wasm_bindgen]
impl WebApp {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebApp, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()?;
        let display = CanvasDisplay::new(&canvas)?;

        let stations = match station::load(station::BUNDLED_JSON) {
            Ok(stations) => stations,
            Err(error) => {
                tracing::error!(%error, "bundled dataset failed to parse; rendering no markers");
                Vec::new()
            }
        };
        let mut shell = MapShell::new(MapConfig::default(), stations);

        let source = match WebLocationSource::new(WatchOptions::default()) {
            Ok(mut source) => {
                shell.attach(&mut source);
                Some(source)
            }
            Err(error) => {
                tracing::warn!(%error, "geolocation unavailable");
                shell.attach(&mut NullLocationSource);
                None
            }
        };

        Ok(WebApp {
            shell,
            display,
            basemap: GraticuleBasemap::default(),
            source,
        })
    }

    /// Render one frame.
    pub fn tick(&mut self) -> Result<(), JsValue> {
        self.shell
            .render(&mut self.basemap, &mut self.display)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Forward a canvas-space pointer click.
    pub fn click(&mut self, x: i32, y: i32) {
        let size = self.display.size();
        match &mut self.source {
            Some(source) => self.shell.click(Point::new(x, y), size, source),
            None => self.shell.click(Point::new(x, y), size, &mut NullLocationSource),
        }
    }

    /// The page's own locate button.
    pub fn locate(&mut self) {
        match &mut self.source {
            Some(source) => self.shell.locate(source),
            None => self.shell.locate(&mut NullLocationSource),
        }
    }

    /// Tear the page down: the position subscription is severed and
    /// late platform callbacks are discarded.
    pub fn release(&mut self) {
        self.shell.release();
    }
}
