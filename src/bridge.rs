/// JS bridge to the extension APIs (storage, tabs, messaging, notifications)

use wasm_bindgen::prelude::*;

use crate::error::StoreError;
use crate::relay::{BrowserBridge, TabMeta};
use crate::session::{Session, SessionStore};

// Import JS bridge functions
#[wasm_bindgen(module = "/extension.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    pub async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn removeStorage(keys: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn getActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn captureVisibleTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;

    pub fn onMessage(callback: &js_sys::Function);

    pub fn createNotification(title: &str, message: &str);

    #[wasm_bindgen(catch)]
    pub async fn openDashboard() -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub async fn getSelectionFromPage() -> Result<JsValue, JsValue>;
}

/// Sends an action message to the background worker and decodes its
/// envelope. Transport failures come back as error envelopes.
pub async fn relay_message(message: &serde_json::Value) -> crate::relay::Envelope {
    let js = match serde_wasm_bindgen::to_value(message) {
        Ok(js) => js,
        Err(err) => return crate::relay::Envelope::err(err.to_string()),
    };
    match sendMessage(js).await {
        Ok(reply) => serde_wasm_bindgen::from_value(reply)
            .unwrap_or_else(|err| crate::relay::Envelope::err(err.to_string())),
        Err(err) => crate::relay::Envelope::err(format!("{err:?}")),
    }
}

const SESSION_KEY: &str = "session";
const CREDENTIAL_KEY: &str = "geminiKey";

fn backend_err(err: JsValue) -> StoreError {
    StoreError::Backend(format!("{err:?}"))
}

/// Session storage over `chrome.storage.local`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionStore;

impl ExtensionStore {
    pub fn new() -> Self {
        ExtensionStore
    }
}

impl SessionStore for ExtensionStore {
    async fn load_session(&self) -> Result<Option<Session>, StoreError> {
        let value = getStorage(SESSION_KEY).await.map_err(backend_err)?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|err| StoreError::Decode(err.to_string()))
    }

    async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let value = serde_wasm_bindgen::to_value(session)
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        setStorage(SESSION_KEY, value).await.map_err(backend_err)
    }

    async fn clear_session(&self) -> Result<(), StoreError> {
        let keys = serde_wasm_bindgen::to_value(&[SESSION_KEY, CREDENTIAL_KEY])
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        removeStorage(keys).await.map_err(backend_err)
    }

    async fn load_credential(&self) -> Result<Option<String>, StoreError> {
        let value = getStorage(CREDENTIAL_KEY).await.map_err(backend_err)?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        Ok(value.as_string())
    }

    async fn save_credential(&self, key: &str) -> Result<(), StoreError> {
        setStorage(CREDENTIAL_KEY, JsValue::from_str(key))
            .await
            .map_err(backend_err)
    }
}

/// Browser facilities backed by the extension APIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeBrowser;

impl BrowserBridge for BridgeBrowser {
    async fn active_tab(&self) -> Result<TabMeta, String> {
        let value = getActiveTab()
            .await
            .map_err(|err| format!("no active tab: {err:?}"))?;
        serde_wasm_bindgen::from_value(value).map_err(|err| err.to_string())
    }

    async fn capture_visible_tab(&self) -> Result<String, String> {
        let value = captureVisibleTab()
            .await
            .map_err(|err| format!("capture failed: {err:?}"))?;
        value
            .as_string()
            .ok_or_else(|| "capture returned no data url".to_string())
    }

    fn notify(&self, title: &str, message: &str) {
        createNotification(title, message);
    }
}
