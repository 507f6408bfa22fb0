/// Content script: selection capture, floating actions, transcript scraping

use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, Event, EventInit, HtmlElement, HtmlImageElement, HtmlTextAreaElement,
    MouseEvent,
};

use crate::bridge::{onMessage, relay_message};
use crate::relay::Envelope;
use crate::scraper::{Role, SiteStrategy, Turn, flatten_turns};

/// Selections shorter than this never get floating buttons.
const MIN_SELECTION_LEN: usize = 10;

const ACTIONS_ID: &str = "context-clipper-actions";
const TOAST_ID: &str = "context-clipper-toast";

thread_local! {
    // Popups steal focus and clear the live selection, so the last good one
    // is kept around for them.
    static CACHED_SELECTION: RefCell<String> = const { RefCell::new(String::new()) };
}

pub fn start() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    log::debug!("content script attached");

    {
        let doc = document.clone();
        let on_mouseup = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            handle_selection(&doc, &event);
        });
        let _ = document.add_event_listener_with_callback(
            "mouseup",
            on_mouseup.as_ref().unchecked_ref(),
        );
        on_mouseup.forget();
    }

    {
        // Keyboard selections (shift+arrows, ctrl+a) update the cache too.
        let on_keyup = Closure::<dyn FnMut()>::new(move || {
            let text = live_selection();
            if text.trim().len() >= MIN_SELECTION_LEN {
                CACHED_SELECTION.with(|cached| *cached.borrow_mut() = text);
            }
        });
        let _ = document
            .add_event_listener_with_callback("keyup", on_keyup.as_ref().unchecked_ref());
        on_keyup.forget();
    }

    {
        let doc = document.clone();
        let on_mousedown = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            if !targets_actions(&event) {
                remove_by_id(&doc, ACTIONS_ID);
            }
        });
        let _ = document.add_event_listener_with_callback(
            "mousedown",
            on_mousedown.as_ref().unchecked_ref(),
        );
        on_mousedown.forget();
    }

    {
        let doc = document.clone();
        let on_scroll = Closure::<dyn FnMut()>::new(move || {
            remove_by_id(&doc, ACTIONS_ID);
        });
        let _ = document
            .add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref());
        on_scroll.forget();
    }

    // Answers selection queries from the popup and injector.
    let on_message = Closure::<dyn FnMut(JsValue, js_sys::Function)>::new(
        |message: JsValue, respond: js_sys::Function| {
            let action = js_sys::Reflect::get(&message, &JsValue::from_str("action"))
                .ok()
                .and_then(|value| value.as_string());
            let reply = match action.as_deref() {
                Some("getSelection") => {
                    serde_wasm_bindgen::to_value(&serde_json::json!({
                        "text": selection_text()
                    }))
                    .unwrap_or(JsValue::NULL)
                }
                Some("getTranscript") => {
                    let transcript = web_sys::window()
                        .and_then(|window| window.document())
                        .map(|document| scrape_transcript(&document, page_strategy()))
                        .unwrap_or_default();
                    serde_wasm_bindgen::to_value(&serde_json::json!({
                        "text": transcript
                    }))
                    .unwrap_or(JsValue::NULL)
                }
                _ => return,
            };
            let _ = respond.call1(&JsValue::NULL, &reply);
        },
    );
    onMessage(on_message.as_ref().unchecked_ref());
    on_message.forget();
}

/// The live selection when present, otherwise the last cached one.
pub fn selection_text() -> String {
    let live = live_selection();
    if !live.trim().is_empty() {
        return live;
    }
    CACHED_SELECTION.with(|cached| cached.borrow().clone())
}

fn live_selection() -> String {
    web_sys::window()
        .and_then(|window| window.get_selection().ok().flatten())
        .map(|selection| String::from(selection.to_string()))
        .unwrap_or_default()
}

fn page_strategy() -> SiteStrategy {
    let hostname = web_sys::window()
        .map(|window| window.location().hostname().unwrap_or_default())
        .unwrap_or_default();
    SiteStrategy::for_hostname(&hostname)
}

fn handle_selection(document: &Document, event: &MouseEvent) {
    if targets_actions(event) {
        return;
    }
    remove_by_id(document, ACTIONS_ID);

    let text = live_selection();
    if text.trim().len() >= MIN_SELECTION_LEN {
        CACHED_SELECTION.with(|cached| *cached.borrow_mut() = text.clone());
        if let Err(err) = show_actions(document, &text, event.page_x(), event.page_y()) {
            log::warn!("could not render selection actions: {err:?}");
        }
        return;
    }

    // Clicking an image with nothing selected offers to clip the image.
    let image = event
        .target()
        .and_then(|target| target.dyn_into::<HtmlImageElement>().ok());
    if let Some(image) = image {
        if let Err(err) = show_image_action(document, &image, event.page_x(), event.page_y()) {
            log::warn!("could not render image action: {err:?}");
        }
    }
}

fn show_image_action(
    document: &Document,
    image: &HtmlImageElement,
    x: i32,
    y: i32,
) -> Result<(), JsValue> {
    let src = image.current_src();
    if src.is_empty() {
        return Ok(());
    }
    let alt = image.alt();

    let container = document.create_element("div")?;
    container.set_id(ACTIONS_ID);
    container.set_attribute(
        "style",
        &format!(
            "position:absolute;left:{}px;top:{}px;z-index:2147483647;\
             background:#1f2430;border-radius:6px;padding:4px;\
             box-shadow:0 2px 8px rgba(0,0,0,0.4);",
            x + 8,
            y + 8
        ),
    )?;
    container.append_child(&action_button(document, "Save Image", move || {
        let src = src.clone();
        let alt = alt.clone();
        spawn_local(async move {
            let envelope = relay_message(&serde_json::json!({
                "action": "saveImage",
                "imageUrl": src,
                "altText": alt,
                "url": page_url(),
                "title": page_title(),
            }))
            .await;
            match envelope {
                Envelope { success: true, .. } => toast("Image saved"),
                Envelope { error, .. } => {
                    toast(&error.unwrap_or_else(|| "Save failed".to_string()))
                }
            }
        });
    })?.into())?;

    document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?
        .append_child(&container)?;
    Ok(())
}

fn targets_actions(event: &MouseEvent) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .and_then(|element| element.closest(&format!("#{ACTIONS_ID}")).ok().flatten())
        .is_some()
}

fn show_actions(document: &Document, text: &str, x: i32, y: i32) -> Result<(), JsValue> {
    let container = document.create_element("div")?;
    container.set_id(ACTIONS_ID);
    container.set_attribute(
        "style",
        &format!(
            "position:absolute;left:{}px;top:{}px;z-index:2147483647;\
             display:flex;gap:4px;background:#1f2430;border-radius:6px;\
             padding:4px;box-shadow:0 2px 8px rgba(0,0,0,0.4);",
            x + 8,
            y + 8
        ),
    )?;

    let clip_text = text.to_string();
    container.append_child(&action_button(document, "Clip", move || {
        let text = clip_text.clone();
        spawn_local(async move {
            let envelope = relay_message(&serde_json::json!({
                "action": "saveClip",
                "text": text,
                "url": page_url(),
                "title": page_title(),
            }))
            .await;
            match envelope {
                Envelope { success: true, .. } => toast("Clip saved"),
                Envelope { error, .. } => {
                    toast(&error.unwrap_or_else(|| "Save failed".to_string()))
                }
            }
        });
    })?.into())?;

    let ask_text = text.to_string();
    container.append_child(&action_button(document, "Ask", move || {
        let question = ask_text.clone();
        spawn_local(async move {
            let envelope = relay_message(&serde_json::json!({
                "action": "askQuestion",
                "question": question,
            }))
            .await;
            match envelope {
                Envelope {
                    success: true,
                    data: Some(data),
                    ..
                } => {
                    let answer = data
                        .get("answer")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("No answer");
                    toast(&truncate(answer, 200));
                }
                Envelope { error, .. } => {
                    toast(&error.unwrap_or_else(|| "Ask failed".to_string()))
                }
            }
        });
    })?.into())?;

    document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?
        .append_child(&container)?;
    Ok(())
}

fn action_button(
    document: &Document,
    label: &str,
    on_click: impl Fn() + 'static,
) -> Result<Element, JsValue> {
    let button = document.create_element("button")?;
    button.set_text_content(Some(label));
    button.set_attribute(
        "style",
        "border:none;background:#3d7bfd;color:#fff;border-radius:4px;\
         padding:4px 10px;font:12px sans-serif;cursor:pointer;",
    )?;

    let document = document.clone();
    let closure = Closure::<dyn FnMut()>::new(move || {
        on_click();
        remove_by_id(&document, ACTIONS_ID);
    });
    button
        .dyn_ref::<HtmlElement>()
        .ok_or_else(|| JsValue::from_str("not an html element"))?
        .set_onclick(Some(closure.as_ref().unchecked_ref()));
    closure.forget();
    Ok(button)
}

/// Transient confirmation bubble in the page corner.
pub fn toast(message: &str) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    remove_by_id(&document, TOAST_ID);

    let Ok(element) = document.create_element("div") else {
        return;
    };
    element.set_id(TOAST_ID);
    element.set_text_content(Some(message));
    let _ = element.set_attribute(
        "style",
        "position:fixed;bottom:16px;right:16px;z-index:2147483647;\
         background:#1f2430;color:#fff;border-radius:6px;padding:8px 14px;\
         font:13px sans-serif;max-width:320px;",
    );
    if let Some(body) = document.body() {
        let _ = body.append_child(&element);
    }

    if let Some(window) = web_sys::window() {
        let document = document.clone();
        let hide = Closure::<dyn FnMut()>::new(move || {
            remove_by_id(&document, TOAST_ID);
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            hide.as_ref().unchecked_ref(),
            3000,
        );
        hide.forget();
    }
}

fn remove_by_id(document: &Document, id: &str) {
    if let Some(element) = document.get_element_by_id(id) {
        element.remove();
    }
}

fn page_url() -> String {
    web_sys::window()
        .map(|window| window.location().href().unwrap_or_default())
        .unwrap_or_default()
}

fn page_title() -> String {
    web_sys::window()
        .and_then(|window| window.document())
        .map(|document| document.title())
        .unwrap_or_default()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}…")
    }
}

/// Pulls the conversation out of a chat page as plain text. Sites without
/// turn selectors (and selector misses) fall back to the whole page text.
pub fn scrape_transcript(document: &Document, strategy: SiteStrategy) -> String {
    if let Some(selectors) = strategy.turn_selectors() {
        let mut turns = Vec::new();
        if let Ok(nodes) = document.query_selector_all(&selectors.combined()) {
            for index in 0..nodes.length() {
                let Some(node) = nodes.get(index) else {
                    continue;
                };
                let Some(element) = node.dyn_ref::<Element>() else {
                    continue;
                };
                let text = element.text_content().unwrap_or_default();
                if text.trim().is_empty() {
                    continue;
                }
                let role = if element.matches(selectors.user).unwrap_or(false) {
                    Role::User
                } else {
                    Role::Assistant
                };
                turns.push(Turn {
                    role,
                    text: text.trim().to_string(),
                });
            }
        }
        if !turns.is_empty() {
            return flatten_turns(&turns);
        }
    }

    document
        .body()
        .and_then(|body| body.text_content())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Types text into a chat input and fires a bubbling `input` event so the
/// page's framework notices the change.
pub fn insert_text(element: &Element, text: &str) -> Result<(), JsValue> {
    if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
        textarea.set_value(text);
    } else {
        element.set_text_content(Some(text));
    }

    let init = EventInit::new();
    init.set_bubbles(true);
    let event = Event::new_with_event_init_dict("input", &init)?;
    element.dispatch_event(&event)?;
    Ok(())
}
