/// Endpoint configuration, supplied by the embedding page at startup

use serde::Deserialize;

const DEFAULT_API_BASE: &str = "http://localhost:8001";

/// Backend and auth provider endpoints. The extension pages pass this in as
/// a plain JS object; missing fields fall back to defaults. An empty auth
/// endpoint simply makes every refresh attempt fail, which degrades to the
/// signed-out state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub auth_url: String,
    #[serde(default)]
    pub anon_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: default_api_base(),
            auth_url: String::new(),
            anon_key: String::new(),
        }
    }
}

impl Config {
    /// Parses a config object handed over from JS; `null`/`undefined` or a
    /// malformed object yields the defaults.
    pub fn from_js(value: wasm_bindgen::JsValue) -> Self {
        if value.is_null() || value.is_undefined() {
            return Config::default();
        }
        serde_wasm_bindgen::from_value(value).unwrap_or_else(|e| {
            log::warn!("malformed config object, using defaults: {e}");
            Config::default()
        })
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
