/// Background worker: receives action messages and relays them to the backend

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api::ApiClient;
use crate::bridge::{BridgeBrowser, ExtensionStore, onMessage};
use crate::config::Config;
use crate::relay::{Envelope, Relay, Request};
use crate::session::SystemClock;

/// Registers the message listener. Each message gets its own relay, so no
/// state is shared between dispatches; the session lives in extension
/// storage.
pub fn start(config: JsValue) {
    let config = Config::from_js(config);
    log::info!("background worker ready, backend at {}", config.api_base);

    let callback = Closure::<dyn FnMut(JsValue, js_sys::Function)>::new(
        move |message: JsValue, respond: js_sys::Function| {
            let config = config.clone();
            spawn_local(async move {
                let envelope = handle_message(&config, message).await;
                let reply = serde_wasm_bindgen::to_value(&envelope)
                    .unwrap_or_else(|_| JsValue::NULL);
                if let Err(err) = respond.call1(&JsValue::NULL, &reply) {
                    log::warn!("reply channel closed: {err:?}");
                }
            });
        },
    );
    onMessage(callback.as_ref().unchecked_ref());
    // Listener lives for the worker's lifetime.
    callback.forget();
}

async fn handle_message(config: &Config, message: JsValue) -> Envelope {
    let request: Request = match serde_wasm_bindgen::from_value(message) {
        Ok(request) => request,
        Err(err) => {
            log::warn!("unparseable message: {err}");
            return Envelope::err(format!("Unknown message: {err}"));
        }
    };

    let api = ApiClient::new(config, ExtensionStore::new(), SystemClock);
    Relay::new(api, BridgeBrowser).dispatch(request).await
}
