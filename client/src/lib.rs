mod app;
pub mod config;
mod detail_panel;
pub mod renderer;
pub mod state;
pub mod store;
pub mod time_slices;
pub mod viewer;

pub use app::{App, FetchError};

// WASM entry point
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&JsValue::from_str(&format!("Logger unavailable: {}", e)));
    }

    log::info!("Starting MitoSpace client...");

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;

    let canvas = document
        .create_element("canvas")?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;
    canvas.set_id("the_canvas_id");

    // Set canvas to fill the window
    let width = window.inner_width()?.as_f64().unwrap_or(1280.0) as u32;
    let height = window.inner_height()?.as_f64().unwrap_or(720.0) as u32;
    canvas.set_width(width);
    canvas.set_height(height);

    let style = canvas.style();
    style.set_property("width", "100%")?;
    style.set_property("height", "100%")?;
    style.set_property("position", "absolute")?;
    style.set_property("top", "0")?;
    style.set_property("left", "0")?;

    document
        .body()
        .ok_or_else(|| JsValue::from_str("No body"))?
        .append_child(&canvas)?;

    // Point clouds need a depth buffer
    let web_options = eframe::WebOptions {
        depth_buffer: 24,
        ..Default::default()
    };

    wasm_bindgen_futures::spawn_local(async move {
        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| {
                    log::info!("Creating app, glow available: {}", cc.gl.is_some());
                    Ok(Box::new(App::new(cc)))
                }),
            )
            .await;

        // Hide loading message after start
        if let Some(loading) = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("loading"))
        {
            let _ = loading.set_attribute("style", "display: none");
        }

        match &start_result {
            Ok(_) => log::info!("eframe started successfully"),
            Err(e) => log::error!("Failed to start eframe: {:?}", e),
        }
    });

    Ok(())
}
