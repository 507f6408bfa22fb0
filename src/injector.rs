/// Chat-site panel: pick a project and inject its context into the input

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, HtmlElement, HtmlSelectElement};

use crate::bridge::relay_message;
use crate::clip::Project;
use crate::content::{insert_text, toast};
use crate::filters::token_estimate;
use crate::relay::Envelope;
use crate::scraper::SiteStrategy;

const PANEL_ID: &str = "context-clipper-panel";
const SELECT_ID: &str = "context-clipper-project";
const PREVIEW_ID: &str = "context-clipper-preview";
const STATS_ID: &str = "context-clipper-stats";

const PREVIEW_CHARS: usize = 200;

pub fn start() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let hostname = window
        .location()
        .hostname()
        .unwrap_or_default();
    let strategy = SiteStrategy::for_hostname(&hostname);
    if strategy == SiteStrategy::Generic {
        return;
    }
    log::debug!("injector panel attaching on {hostname}");

    if let Err(err) = build_panel(&document, strategy) {
        log::warn!("could not build injector panel: {err:?}");
        return;
    }

    spawn_local(async {
        load_projects().await;
    });
}

fn build_panel(document: &Document, strategy: SiteStrategy) -> Result<(), JsValue> {
    if document.get_element_by_id(PANEL_ID).is_some() {
        return Ok(());
    }

    let panel = document.create_element("div")?;
    panel.set_id(PANEL_ID);
    panel.set_attribute(
        "style",
        "position:fixed;top:80px;right:0;z-index:2147483646;width:240px;\
         background:#1f2430;color:#e6e9f0;border-radius:8px 0 0 8px;\
         padding:10px;font:12px sans-serif;display:flex;\
         flex-direction:column;gap:8px;",
    )?;

    let heading = document.create_element("div")?;
    heading.set_text_content(Some("Context Clipper"));
    heading.set_attribute("style", "font-weight:bold;font-size:13px;")?;
    panel.append_child(&heading)?;

    let select = document.create_element("select")?;
    select.set_id(SELECT_ID);
    select.set_attribute("style", "width:100%;padding:4px;")?;
    {
        let change = project_change_handler();
        select
            .dyn_ref::<HtmlElement>()
            .ok_or_else(|| JsValue::from_str("not an html element"))?
            .set_onchange(Some(change.as_ref().unchecked_ref()));
        change.forget();
    }
    panel.append_child(&select)?;

    let stats = document.create_element("div")?;
    stats.set_id(STATS_ID);
    stats.set_attribute("style", "color:#9aa3b5;")?;
    panel.append_child(&stats)?;

    let preview = document.create_element("div")?;
    preview.set_id(PREVIEW_ID);
    preview.set_attribute(
        "style",
        "max-height:120px;overflow:hidden;color:#c3c9d6;\
         white-space:pre-wrap;word-break:break-word;",
    )?;
    panel.append_child(&preview)?;

    let inject = document.create_element("button")?;
    inject.set_text_content(Some("Inject into Chat"));
    inject.set_attribute(
        "style",
        "border:none;background:#3d7bfd;color:#fff;border-radius:4px;\
         padding:6px;cursor:pointer;",
    )?;
    {
        let on_click = Closure::<dyn FnMut()>::new(move || {
            spawn_local(async move {
                inject_selected(strategy).await;
            });
        });
        inject
            .dyn_ref::<HtmlElement>()
            .ok_or_else(|| JsValue::from_str("not an html element"))?
            .set_onclick(Some(on_click.as_ref().unchecked_ref()));
        on_click.forget();
    }
    panel.append_child(&inject)?;

    document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?
        .append_child(&panel)?;
    Ok(())
}

fn project_change_handler() -> Closure<dyn FnMut()> {
    Closure::<dyn FnMut()>::new(move || {
        spawn_local(async {
            refresh_preview().await;
        });
    })
}

async fn load_projects() {
    let envelope = relay_message(&serde_json::json!({ "action": "getProjects" })).await;
    let projects: Vec<Project> = match envelope {
        Envelope {
            success: true,
            data: Some(data),
            ..
        } => serde_json::from_value(data).unwrap_or_default(),
        Envelope { error, .. } => {
            log::warn!("could not load projects: {error:?}");
            Vec::new()
        }
    };

    let Some(select) = select_element() else {
        return;
    };
    select.set_inner_html("");
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    for project in &projects {
        if let Ok(option) = document.create_element("option") {
            let _ = option.set_attribute("value", &project.id);
            option.set_text_content(Some(&format!(
                "{} ({} clips)",
                project.name, project.clip_count
            )));
            let _ = select.append_child(&option);
        }
    }

    if !projects.is_empty() {
        refresh_preview().await;
    } else if let Some(stats) = stats_element() {
        stats.set_text_content(Some("No projects yet"));
    }
}

async fn refresh_preview() {
    let Some(project_id) = selected_project() else {
        return;
    };
    let envelope = relay_message(&serde_json::json!({
        "action": "exportProject",
        "projectId": project_id,
    }))
    .await;

    let Envelope {
        success: true,
        data: Some(data),
        ..
    } = envelope
    else {
        if let Some(stats) = stats_element() {
            stats.set_text_content(Some("Export failed"));
        }
        return;
    };

    let context = data
        .get("context")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    let clip_count = data
        .get("clip_count")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    let words = crate::clip::word_count(context);

    if let Some(stats) = stats_element() {
        stats.set_text_content(Some(&format!(
            "{clip_count} clips · ~{} tokens",
            token_estimate(words)
        )));
    }
    if let Some(preview) = preview_element() {
        let snippet: String = context.chars().take(PREVIEW_CHARS).collect();
        preview.set_text_content(Some(&snippet));
    }
}

async fn inject_selected(strategy: SiteStrategy) {
    let Some(project_id) = selected_project() else {
        toast("Pick a project first");
        return;
    };
    let envelope = relay_message(&serde_json::json!({
        "action": "exportProject",
        "projectId": project_id,
    }))
    .await;

    let Envelope {
        success: true,
        data: Some(data),
        ..
    } = envelope
    else {
        toast("Export failed");
        return;
    };
    let context = data
        .get("context")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    if context.is_empty() {
        toast("Project has no clips");
        return;
    }

    let Some(input) = find_chat_input(strategy) else {
        toast("No chat input found on this page");
        return;
    };
    match insert_text(&input, context) {
        Ok(()) => toast("Context injected"),
        Err(err) => {
            log::warn!("inject failed: {err:?}");
            toast("Could not inject context");
        }
    }
}

/// First visible match among the site's input selectors.
fn find_chat_input(strategy: SiteStrategy) -> Option<Element> {
    let document = web_sys::window()?.document()?;
    for selector in strategy.input_selectors() {
        if let Ok(Some(element)) = document.query_selector(selector) {
            return Some(element);
        }
    }
    None
}

fn selected_project() -> Option<String> {
    let value = select_element()?.value();
    (!value.is_empty()).then_some(value)
}

fn select_element() -> Option<HtmlSelectElement> {
    web_sys::window()?
        .document()?
        .get_element_by_id(SELECT_ID)?
        .dyn_into()
        .ok()
}

fn stats_element() -> Option<Element> {
    web_sys::window()?.document()?.get_element_by_id(STATS_ID)
}

fn preview_element() -> Option<Element> {
    web_sys::window()?.document()?.get_element_by_id(PREVIEW_ID)
}

