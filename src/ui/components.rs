/// Reusable UI components

use yew::prelude::*;

use crate::clip::{Clip, MediaType};

#[derive(Properties, PartialEq)]
pub struct StatBoxProps {
    pub label: String,
    pub value: String,
}

#[function_component(StatBox)]
pub fn stat_box(props: &StatBoxProps) -> Html {
    html! {
        <div style="flex: 1; background: #f5f6fa; border-radius: 6px; padding: 12px; text-align: center;">
            <div style="font-size: 20px; font-weight: bold; color: #2d3142;">{&props.value}</div>
            <div style="font-size: 12px; color: #9aa3b5;">{&props.label}</div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ClipCardProps {
    pub clip: Clip,
    pub on_delete: Callback<String>,
}

#[function_component(ClipCard)]
pub fn clip_card(props: &ClipCardProps) -> Html {
    let clip = &props.clip;

    let on_delete = {
        let on_delete = props.on_delete.clone();
        let id = clip.id.clone();
        Callback::from(move |_| on_delete.emit(id.clone()))
    };

    let badge = match clip.media_type {
        Some(MediaType::Image) => Some("image"),
        Some(MediaType::Screenshot) => Some("screenshot"),
        Some(MediaType::File) => Some("file"),
        Some(MediaType::Text) | None => None,
    };

    // Keep cards scannable; the full text lives in the backend.
    let preview: String = if clip.text.chars().count() > 280 {
        format!("{}…", clip.text.chars().take(280).collect::<String>())
    } else {
        clip.text.clone()
    };

    html! {
        <div style="background: white; border: 1px solid #e0e3ec; border-radius: 6px; padding: 12px; margin-bottom: 10px;">
            <div style="display: flex; justify-content: space-between; align-items: center; margin-bottom: 6px;">
                <span style="font-weight: 600; font-size: 13px; color: #2d3142;">
                    {if clip.title.is_empty() { clip.domain.clone() } else { clip.title.clone() }}
                </span>
                <button
                    onclick={on_delete}
                    style="border: none; background: none; color: #f44336; cursor: pointer; font-size: 12px;"
                >
                    {"Delete"}
                </button>
            </div>
            if let Some(badge) = badge {
                <span style="font-size: 11px; background: #e3f2fd; color: #2196f3; border-radius: 3px; padding: 1px 6px;">
                    {badge}
                </span>
            }
            <p style="font-size: 13px; color: #4a4f5e; white-space: pre-wrap; margin: 6px 0;">{preview}</p>
            <div style="font-size: 11px; color: #9aa3b5;">
                <a href={clip.url.clone()} target="_blank" style="color: #5b4fe8;">{&clip.domain}</a>
                {format!(" · {} words · {}", clip.word_count, clip.timestamp)}
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct EmptyStateProps {
    pub message: String,
}

#[function_component(EmptyState)]
pub fn empty_state(props: &EmptyStateProps) -> Html {
    html! {
        <div style="text-align: center; padding: 40px 20px; color: #9aa3b5;">
            <p style="font-size: 14px;">{&props.message}</p>
        </div>
    }
}
