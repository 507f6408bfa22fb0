/// Dashboard UI: browse, filter, search, and manage saved clips

use chrono::Utc;
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::api::ApiClient;
use crate::bridge::ExtensionStore;
use crate::clip::{Clip, Project};
use crate::config::Config;
use crate::filters::{
    ClipFilter, MediaFilter, TimeFilter, apply_filters, dashboard_stats, page_count, page_slice,
};
use crate::session::SystemClock;
use crate::ui::components::{ClipCard, EmptyState, StatBox};

/// Fetch generously and filter locally; the backend list is capped anyway.
const FETCH_LIMIT: usize = 1000;

#[derive(Clone, PartialEq)]
enum LoadState {
    Loading,
    Ready,
    AuthRequired,
    Offline(String),
}

#[derive(Properties, PartialEq)]
pub struct DashboardProps {
    pub config: Config,
}

fn api(config: &Config) -> ApiClient<ExtensionStore, SystemClock> {
    ApiClient::new(config, ExtensionStore::new(), SystemClock)
}

#[function_component(Dashboard)]
pub fn dashboard(props: &DashboardProps) -> Html {
    let load_state = use_state(|| LoadState::Loading);
    let clips = use_state(Vec::<Clip>::new);
    let projects = use_state(Vec::<Project>::new);
    let project_filter = use_state(|| None::<String>);
    let filter = use_state(ClipFilter::default);
    let page = use_state(|| 0usize);

    // Load everything on mount and whenever the project filter changes.
    {
        let config = props.config.clone();
        let load_state = load_state.clone();
        let clips = clips.clone();
        let projects = projects.clone();
        let page = page.clone();

        use_effect_with((*project_filter).clone(), move |selected| {
            let selected = selected.clone();
            spawn_local(async move {
                let api = api(&config);
                match api.ensure_valid_session().await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        load_state.set(LoadState::AuthRequired);
                        return;
                    }
                    Err(e) => {
                        load_state.set(LoadState::Offline(e.to_string()));
                        return;
                    }
                }

                match api.clips(selected.as_deref(), FETCH_LIMIT).await {
                    Ok(loaded) => clips.set(loaded.clips),
                    Err(e) => {
                        load_state.set(LoadState::Offline(e.to_string()));
                        return;
                    }
                }
                if let Ok(loaded) = api.projects().await {
                    projects.set(loaded);
                }
                page.set(0);
                load_state.set(LoadState::Ready);
            });
            || ()
        });
    }

    let on_search = {
        let filter = filter.clone();
        let page = page.clone();
        Callback::from(move |e: InputEvent| {
            let query = e.target_unchecked_into::<HtmlInputElement>().value();
            filter.set(ClipFilter {
                query,
                ..(*filter).clone()
            });
            page.set(0);
        })
    };

    let set_time = {
        let filter = filter.clone();
        let page = page.clone();
        move |time: TimeFilter| {
            let filter = filter.clone();
            let page = page.clone();
            Callback::from(move |_| {
                filter.set(ClipFilter {
                    time,
                    ..(*filter).clone()
                });
                page.set(0);
            })
        }
    };

    let set_media = {
        let filter = filter.clone();
        let page = page.clone();
        move |media: MediaFilter| {
            let filter = filter.clone();
            let page = page.clone();
            Callback::from(move |_| {
                filter.set(ClipFilter {
                    media,
                    ..(*filter).clone()
                });
                page.set(0);
            })
        }
    };

    let on_project_filter = {
        let project_filter = project_filter.clone();
        Callback::from(move |e: Event| {
            let value = e.target_unchecked_into::<HtmlSelectElement>().value();
            project_filter.set((!value.is_empty()).then_some(value));
        })
    };

    let on_delete = {
        let config = props.config.clone();
        let clips = clips.clone();

        Callback::from(move |id: String| {
            let config = config.clone();
            let clips = clips.clone();
            spawn_local(async move {
                match api(&config).delete_clip(&id).await {
                    Ok(()) => {
                        let remaining: Vec<Clip> = clips
                            .iter()
                            .filter(|clip| clip.id != id)
                            .cloned()
                            .collect();
                        clips.set(remaining);
                    }
                    Err(e) => log::error!("delete failed: {e}"),
                }
            });
        })
    };

    match &*load_state {
        LoadState::Loading => {
            return html! {
                <div style="padding: 40px; text-align: center;"><Spinner/></div>
            };
        }
        LoadState::AuthRequired => {
            return html! {
                <div style="max-width: 480px; margin: 60px auto; font-family: sans-serif;">
                    <Alert r#type={AlertType::Warning} title="Sign in required">
                        {"Open the extension popup and sign in to see your clips."}
                    </Alert>
                </div>
            };
        }
        LoadState::Offline(message) => {
            return html! {
                <div style="max-width: 480px; margin: 60px auto; font-family: sans-serif;">
                    <Alert r#type={AlertType::Danger} title="Backend unreachable">
                        {message.clone()}
                    </Alert>
                </div>
            };
        }
        LoadState::Ready => {}
    }

    let matched = apply_filters(&clips, &filter, Utc::now());
    let pages = page_count(matched.len());
    let current_page = (*page).min(pages - 1);
    let visible = page_slice(&matched, current_page);
    let stats = dashboard_stats(&clips);

    let on_prev = {
        let page = page.clone();
        Callback::from(move |_| {
            page.set(current_page.saturating_sub(1));
        })
    };
    let on_next = {
        let page = page.clone();
        Callback::from(move |_| {
            if current_page + 1 < pages {
                page.set(current_page + 1);
            }
        })
    };

    let time_button = |label: &str, value: TimeFilter| {
        let active = filter.time == value;
        html! {
            <button
                onclick={set_time(value)}
                style={filter_button_style(active)}
            >
                {label.to_string()}
            </button>
        }
    };
    let media_button = |label: &str, value: MediaFilter| {
        let active = filter.media == value;
        html! {
            <button
                onclick={set_media(value)}
                style={filter_button_style(active)}
            >
                {label.to_string()}
            </button>
        }
    };

    html! {
        <div style="max-width: 760px; margin: 0 auto; padding: 24px; font-family: sans-serif;">
            <h1 style="font-size: 20px; color: #2d3142;">{"Context Clipper"}</h1>

            <div style="display: flex; gap: 10px; margin-bottom: 16px;">
                <StatBox label="Clips" value={stats.clips.to_string()} />
                <StatBox label="Words" value={stats.words.to_string()} />
                <StatBox label="Domains" value={stats.domains.to_string()} />
            </div>

            <div style="display: flex; gap: 8px; margin-bottom: 12px;">
                <input
                    type="search"
                    placeholder="Search clips..."
                    value={filter.query.clone()}
                    oninput={on_search}
                    style="flex: 1; padding: 8px; border: 1px solid #e0e3ec; border-radius: 4px;"
                />
                <select onchange={on_project_filter} style="padding: 8px;">
                    <option value="" selected={project_filter.is_none()}>{"All projects"}</option>
                    { for projects.iter().map(|project| html! {
                        <option
                            value={project.id.clone()}
                            selected={project_filter.as_deref() == Some(project.id.as_str())}
                        >
                            {project.name.clone()}
                        </option>
                    })}
                </select>
            </div>

            <div style="display: flex; gap: 6px; margin-bottom: 6px;">
                {time_button("All time", TimeFilter::All)}
                {time_button("Today", TimeFilter::Today)}
                {time_button("This week", TimeFilter::Week)}
            </div>
            <div style="display: flex; gap: 6px; margin-bottom: 16px;">
                {media_button("All types", MediaFilter::All)}
                {media_button("Text", MediaFilter::Text)}
                {media_button("Images", MediaFilter::Image)}
                {media_button("Screenshots", MediaFilter::Screenshot)}
                {media_button("Files", MediaFilter::File)}
            </div>

            if visible.is_empty() {
                <EmptyState message={empty_message(&clips, &filter)} />
            } else {
                { for visible.iter().map(|clip| html! {
                    <ClipCard clip={(*clip).clone()} on_delete={on_delete.clone()} />
                })}
            }

            if pages > 1 {
                <div style="display: flex; justify-content: center; gap: 12px; align-items: center; margin-top: 16px;">
                    <button onclick={on_prev} disabled={current_page == 0} style={filter_button_style(false)}>
                        {"Previous"}
                    </button>
                    <span style="font-size: 13px; color: #4a4f5e;">
                        {format!("Page {} of {}", current_page + 1, pages)}
                    </span>
                    <button onclick={on_next} disabled={current_page + 1 >= pages} style={filter_button_style(false)}>
                        {"Next"}
                    </button>
                </div>
            }
        </div>
    }
}

fn filter_button_style(active: bool) -> String {
    let base = "padding: 6px 12px; border-radius: 4px; font-size: 12px; cursor: pointer;";
    if active {
        format!("{base} border: none; background: #5b4fe8; color: white;")
    } else {
        format!("{base} border: 1px solid #e0e3ec; background: white; color: #4a4f5e;")
    }
}

fn empty_message(clips: &[Clip], filter: &ClipFilter) -> String {
    if clips.is_empty() {
        "No clips yet. Select text on any page and hit Save Selection.".to_string()
    } else if !filter.query.trim().is_empty() {
        format!("No clips match \"{}\"", filter.query.trim())
    } else {
        "No clips match the current filters.".to_string()
    }
}
