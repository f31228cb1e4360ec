//! Browser entry: turns a `<canvas>` into a `glow` context.

use std::future::Future;

use wasm_bindgen::JsCast;

use crate::errors::{Result, UmbraError};

/// Looks up a canvas element by DOM id.
pub fn canvas_by_id(id: &str) -> Result<web_sys::HtmlCanvasElement> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| UmbraError::Wasm("no document".to_string()))?;
    document
        .get_element_by_id(id)
        .ok_or_else(|| UmbraError::Wasm(format!("canvas element '{id}' not found")))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| UmbraError::Wasm(format!("element '{id}' is not a canvas")))
}

/// Creates a WebGL2 context on `canvas`, sized to its current pixel size.
///
/// Returns the context together with the drawing-buffer size.
pub fn webgl2_context(canvas: &web_sys::HtmlCanvasElement) -> Result<(glow::Context, u32, u32)> {
    let webgl2 = canvas
        .get_context("webgl2")
        .map_err(|e| UmbraError::Wasm(format!("{e:?}")))?
        .ok_or_else(|| UmbraError::MissingCapability("webgl2".to_string()))?
        .dyn_into::<web_sys::WebGl2RenderingContext>()
        .map_err(|_| UmbraError::Wasm("context is not WebGL2".to_string()))?;
    let (width, height) = (canvas.width(), canvas.height());
    Ok((glow::Context::from_webgl2_context(webgl2), width, height))
}

/// Drives `future` on the browser's task queue; a failure is logged.
///
/// Loaders and stage constructors are `async`, and the page has no executor
/// of its own.
pub fn spawn<F>(future: F)
where
    F: Future<Output = Result<()>> + 'static,
{
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = future.await {
            log::error!("{e}");
        }
    });
}
