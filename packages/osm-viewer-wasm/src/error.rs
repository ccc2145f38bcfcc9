use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failure of one load branch (fetch or decode). Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request to {url} failed with status {status}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid WKB body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("dom error: {0}")]
    Dom(String),
    #[error("render error: {0}")]
    Render(String),
}

impl From<ViewerError> for JsValue {
    fn from(err: ViewerError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Best-effort message extraction from a thrown JS value.
pub fn js_error_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}
