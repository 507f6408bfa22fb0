/// Context Clipper - Chrome Extension for collecting page context
/// Built with Rust + WASM + Yew

pub mod api;
pub mod auth;
mod background;
mod bridge;
pub mod clip;
pub mod config;
mod content;
pub mod domain;
pub mod error;
pub mod filters;
mod injector;
pub mod relay;
pub mod scraper;
pub mod session;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup(config: JsValue) {
    let config = config::Config::from_js(config);
    yew::Renderer::<ui::popup::App>::with_props(ui::popup::AppProps { config }).render();
}

// Start the Yew app for the dashboard page
#[wasm_bindgen]
pub fn start_dashboard(config: JsValue) {
    let config = config::Config::from_js(config);
    yew::Renderer::<ui::dashboard::Dashboard>::with_props(ui::dashboard::DashboardProps {
        config,
    })
    .render();
}

// Start the background worker's message loop
#[wasm_bindgen]
pub fn start_background(config: JsValue) {
    background::start(config);
}

// Attach selection capture and floating actions to the current page
#[wasm_bindgen]
pub fn start_content() {
    content::start();
}

// Attach the context panel on supported chat sites
#[wasm_bindgen]
pub fn start_injector() {
    injector::start();
}
