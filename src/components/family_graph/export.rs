use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlAnchorElement, HtmlCanvasElement};

/// Rasterize the canvas and trigger a client-side PNG download. No server
/// involvement; failures bubble up as the browser's own capture errors.
pub fn export_png(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
	let data_url = canvas.to_data_url_with_type("image/png")?;
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
	anchor.set_href(&data_url);
	anchor.set_download(&format!("family-tree-{}.png", js_sys::Date::now() as u64));
	anchor.click();
	Ok(())
}
