/// Popup UI: sign in, save the current selection, ask questions

use patternfly_yew::prelude::*;
use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::api::ApiClient;
use crate::bridge::{ExtensionStore, getSelectionFromPage, openDashboard};
use crate::clip::{ClipPayload, Project};
use crate::config::Config;
use crate::domain::is_restricted_page;
use crate::session::{Session, SessionStore, SystemClock};

/// What the page reports when the popup asks for the current selection.
#[derive(Debug, Clone, Default, Deserialize)]
struct PageSelection {
    #[serde(default)]
    text: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
}

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Busy(String),
    Notice(AlertType, String),
}

#[derive(Properties, PartialEq)]
pub struct AppProps {
    pub config: Config,
}

fn api(config: &Config) -> ApiClient<ExtensionStore, SystemClock> {
    ApiClient::new(config, ExtensionStore::new(), SystemClock)
}

#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
    let state = use_state(|| AppState::Busy("Loading...".to_string()));
    let session = use_state(|| None::<Session>);
    let projects = use_state(Vec::<Project>::new);
    let backend_ok = use_state(|| true);
    let selected_project = use_state(|| None::<String>);
    let question = use_state(String::new);
    let gemini_key = use_state(String::new);

    // Restore the session and probe the backend on mount.
    {
        let config = props.config.clone();
        let state = state.clone();
        let session = session.clone();
        let projects = projects.clone();
        let backend_ok = backend_ok.clone();
        let gemini_key = gemini_key.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                let api = api(&config);
                if let Ok(Some(stored)) = api.store().load_credential().await {
                    gemini_key.set(stored);
                }
                match api.ensure_valid_session().await {
                    Ok(restored) => session.set(restored),
                    Err(e) => {
                        log::warn!("session restore failed: {e}");
                        session.set(None);
                    }
                }
                match api.projects().await {
                    Ok(list) => {
                        projects.set(list);
                        backend_ok.set(true);
                    }
                    Err(e) => {
                        log::warn!("backend unreachable: {e}");
                        backend_ok.set(false);
                    }
                }
                state.set(AppState::Idle);
            });
            || ()
        });
    }

    let on_project_change = {
        let selected_project = selected_project.clone();
        Callback::from(move |e: Event| {
            let value = e.target_unchecked_into::<HtmlSelectElement>().value();
            selected_project.set((!value.is_empty()).then_some(value));
        })
    };

    // Save the page's current selection as a clip
    let on_save_selection = {
        let config = props.config.clone();
        let state = state.clone();
        let selected_project = selected_project.clone();

        Callback::from(move |_| {
            let config = config.clone();
            let state = state.clone();
            let project_id = (*selected_project).clone();

            state.set(AppState::Busy("Saving selection...".to_string()));

            spawn_local(async move {
                let selection: PageSelection = match getSelectionFromPage().await {
                    Ok(value) => serde_wasm_bindgen::from_value(value).unwrap_or_default(),
                    Err(e) => {
                        log::warn!("selection query failed: {e:?}");
                        PageSelection::default()
                    }
                };

                if is_restricted_page(&selection.url) {
                    state.set(AppState::Notice(
                        AlertType::Warning,
                        "Cannot clip from browser pages".to_string(),
                    ));
                    return;
                }
                if selection.text.trim().is_empty() {
                    state.set(AppState::Notice(
                        AlertType::Warning,
                        "Select some text on the page first".to_string(),
                    ));
                    return;
                }

                let payload = match ClipPayload::text_clip(
                    &selection.text,
                    &selection.url,
                    &selection.title,
                    project_id,
                ) {
                    Ok(payload) => payload,
                    Err(e) => {
                        state.set(AppState::Notice(AlertType::Danger, e.to_string()));
                        return;
                    }
                };

                match api(&config).save_clip(&payload).await {
                    Ok(_) => state.set(AppState::Notice(
                        AlertType::Success,
                        "Clip saved".to_string(),
                    )),
                    Err(e) => state.set(AppState::Notice(AlertType::Danger, e.to_string())),
                }
            });
        })
    };

    // Screenshot goes through the background worker, which owns tab capture.
    let on_capture = {
        let state = state.clone();
        let selected_project = selected_project.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let project_id = (*selected_project).clone();

            state.set(AppState::Busy("Capturing...".to_string()));

            spawn_local(async move {
                let envelope = crate::bridge::relay_message(&serde_json::json!({
                    "action": "captureScreenshot",
                    "projectId": project_id,
                }))
                .await;
                if envelope.success {
                    state.set(AppState::Notice(
                        AlertType::Success,
                        "Screenshot saved".to_string(),
                    ));
                } else {
                    state.set(AppState::Notice(
                        AlertType::Danger,
                        envelope.error.unwrap_or_else(|| "Capture failed".to_string()),
                    ));
                }
            });
        })
    };

    let on_question_input = {
        let question = question.clone();
        Callback::from(move |e: InputEvent| {
            question.set(e.target_unchecked_into::<HtmlInputElement>().value());
        })
    };

    let on_ask = {
        let config = props.config.clone();
        let state = state.clone();
        let question = question.clone();

        Callback::from(move |_| {
            let config = config.clone();
            let state = state.clone();
            let text = (*question).clone();

            if text.trim().is_empty() {
                state.set(AppState::Notice(
                    AlertType::Warning,
                    "Type a question first".to_string(),
                ));
                return;
            }

            state.set(AppState::Busy("Asking...".to_string()));

            spawn_local(async move {
                match api(&config).ask_question(text.trim()).await {
                    Ok(data) => {
                        let answer = data
                            .get("answer")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or("No answer")
                            .to_string();
                        state.set(AppState::Notice(AlertType::Info, answer));
                    }
                    Err(e) => state.set(AppState::Notice(AlertType::Danger, e.to_string())),
                }
            });
        })
    };

    let on_key_input = {
        let gemini_key = gemini_key.clone();
        Callback::from(move |e: InputEvent| {
            gemini_key.set(e.target_unchecked_into::<HtmlInputElement>().value());
        })
    };

    // The key rides along as X-Gemini-Key on backend calls.
    let on_save_key = {
        let state = state.clone();
        let gemini_key = gemini_key.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let key = (*gemini_key).clone();
            spawn_local(async move {
                match ExtensionStore::new().save_credential(key.trim()).await {
                    Ok(()) => state.set(AppState::Notice(
                        AlertType::Success,
                        "Gemini key saved".to_string(),
                    )),
                    Err(e) => state.set(AppState::Notice(AlertType::Danger, e.to_string())),
                }
            });
        })
    };

    let on_open_dashboard = Callback::from(move |_| {
        spawn_local(async move {
            let _ = openDashboard().await;
        });
    });

    let on_sign_out = {
        let state = state.clone();
        let session = session.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let session = session.clone();
            spawn_local(async move {
                if let Err(e) = ExtensionStore::new().clear_session().await {
                    log::warn!("sign out failed: {e}");
                }
                session.set(None);
                state.set(AppState::Idle);
            });
        })
    };

    let on_signed_in = {
        let session = session.clone();
        Callback::from(move |restored: Session| session.set(Some(restored)))
    };

    let is_busy = matches!(*state, AppState::Busy(_));

    html! {
        <div style="width: 320px; padding: 16px; font-family: sans-serif;">
            <h1 style="font-size: 16px; margin: 0 0 12px 0;">{"Context Clipper"}</h1>

            if !*backend_ok {
                <Alert r#type={AlertType::Danger} title="Backend offline" inline=true>
                    {"Start the backend and reopen this popup."}
                </Alert>
            }

            if let AppState::Busy(message) = &*state {
                <>
                    <Spinner/>
                    <p style="font-size: 13px; color: #9aa3b5;">{message}</p>
                </>
            }

            if let AppState::Notice(kind, message) = &*state {
                <Alert r#type={kind.clone()} title={message.clone()} inline=true />
            }

            if let Some(current) = &*session {
                <>
                <div style="display: flex; justify-content: space-between; align-items: center; margin: 8px 0;">
                    <span style="font-size: 12px; color: #4a4f5e;">
                        {current.user.as_ref().map(|u| u.email.clone()).unwrap_or_else(|| "Signed in".to_string())}
                    </span>
                    <button onclick={on_sign_out} style="border: none; background: none; color: #5b4fe8; cursor: pointer; font-size: 12px;">
                        {"Sign out"}
                    </button>
                </div>

                <select onchange={on_project_change} style="width: 100%; padding: 6px; margin-bottom: 10px;">
                    <option value="" selected={selected_project.is_none()}>{"No project (unsorted)"}</option>
                    { for projects.iter().map(|project| html! {
                        <option
                            value={project.id.clone()}
                            selected={selected_project.as_deref() == Some(project.id.as_str())}
                        >
                            {format!("{} ({})", project.name, project.clip_count)}
                        </option>
                    })}
                </select>

                <div style="display: flex; flex-direction: column; gap: 8px;">
                    <button onclick={on_save_selection} disabled={is_busy}
                        style="padding: 10px; border: none; border-radius: 4px; background: #5b4fe8; color: white; cursor: pointer;">
                        {"Save Selection"}
                    </button>
                    <button onclick={on_capture} disabled={is_busy}
                        style="padding: 10px; border: none; border-radius: 4px; background: #3d7bfd; color: white; cursor: pointer;">
                        {"Capture Screenshot"}
                    </button>
                    <div style="display: flex; gap: 6px;">
                        <input
                            type="text"
                            placeholder="Ask about your clips..."
                            value={(*question).clone()}
                            oninput={on_question_input}
                            style="flex: 1; padding: 8px; border: 1px solid #e0e3ec; border-radius: 4px;"
                        />
                        <button onclick={on_ask} disabled={is_busy}
                            style="padding: 8px 12px; border: none; border-radius: 4px; background: #2d3142; color: white; cursor: pointer;">
                            {"Ask"}
                        </button>
                    </div>
                    <div style="display: flex; gap: 6px;">
                        <input
                            type="password"
                            placeholder="Gemini API key"
                            value={(*gemini_key).clone()}
                            oninput={on_key_input}
                            style="flex: 1; padding: 8px; border: 1px solid #e0e3ec; border-radius: 4px;"
                        />
                        <button onclick={on_save_key} disabled={is_busy}
                            style="padding: 8px 12px; border: 1px solid #e0e3ec; border-radius: 4px; background: white; color: #4a4f5e; cursor: pointer;">
                            {"Save"}
                        </button>
                    </div>
                    <button onclick={on_open_dashboard}
                        style="padding: 8px; border: 1px solid #5b4fe8; border-radius: 4px; background: white; color: #5b4fe8; cursor: pointer;">
                        {"Open Dashboard"}
                    </button>
                </div>
                </>
            } else if !is_busy {
                <SignInForm config={props.config.clone()} on_signed_in={on_signed_in} />
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct SignInFormProps {
    config: Config,
    on_signed_in: Callback<Session>,
}

#[function_component(SignInForm)]
fn sign_in_form(props: &SignInFormProps) -> Html {
    let email = use_state(String::new);
    let password = use_state(String::new);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let on_email = {
        let email = email.clone();
        Callback::from(move |e: InputEvent| {
            email.set(e.target_unchecked_into::<HtmlInputElement>().value());
        })
    };
    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            password.set(e.target_unchecked_into::<HtmlInputElement>().value());
        })
    };

    let submit = |sign_up: bool| {
        let config = props.config.clone();
        let on_signed_in = props.on_signed_in.clone();
        let email = email.clone();
        let password = password.clone();
        let error = error.clone();
        let busy = busy.clone();

        Callback::from(move |_| {
            let config = config.clone();
            let on_signed_in = on_signed_in.clone();
            let email = (*email).clone();
            let password = (*password).clone();
            let error = error.clone();
            let busy = busy.clone();

            if email.trim().is_empty() || password.is_empty() {
                error.set(Some("Email and password are required".to_string()));
                return;
            }

            busy.set(true);
            error.set(None);

            spawn_local(async move {
                let api = api(&config);
                let result = if sign_up {
                    api.auth().sign_up(email.trim(), &password).await
                } else {
                    api.auth().sign_in(email.trim(), &password).await
                };
                match result {
                    Ok(tokens) => match api.adopt_tokens(&tokens).await {
                        Ok(session) => on_signed_in.emit(session),
                        Err(e) => error.set(Some(e.to_string())),
                    },
                    Err(e) => error.set(Some(e.to_string())),
                }
                busy.set(false);
            });
        })
    };

    html! {
        <div style="display: flex; flex-direction: column; gap: 8px;">
            if let Some(message) = &*error {
                <Alert r#type={AlertType::Danger} title={message.clone()} inline=true />
            }
            <input
                type="email"
                placeholder="Email"
                value={(*email).clone()}
                oninput={on_email}
                style="padding: 8px; border: 1px solid #e0e3ec; border-radius: 4px;"
            />
            <input
                type="password"
                placeholder="Password"
                value={(*password).clone()}
                oninput={on_password}
                style="padding: 8px; border: 1px solid #e0e3ec; border-radius: 4px;"
            />
            <button onclick={submit(false)} disabled={*busy}
                style="padding: 10px; border: none; border-radius: 4px; background: #5b4fe8; color: white; cursor: pointer;">
                {"Sign In"}
            </button>
            <button onclick={submit(true)} disabled={*busy}
                style="padding: 10px; border: 1px solid #5b4fe8; border-radius: 4px; background: white; color: #5b4fe8; cursor: pointer;">
                {"Sign Up"}
            </button>
        </div>
    }
}
