/// Clip payloads and the backend entities they become

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::page_domain;

/// What kind of content a clip holds. Plain text clips omit the field on the
/// wire, so absence means text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Image,
    Screenshot,
    File,
}

#[derive(Debug, Error)]
#[error("invalid page url: {0}")]
pub struct InvalidPageUrl(pub String);

/// Metadata sent alongside every clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub title: String,
    /// ISO-8601, set at build time.
    pub timestamp: String,
    pub domain: String,
    #[serde(rename = "wordCount")]
    pub word_count: usize,
}

impl ClipMetadata {
    fn for_page(text: &str, url: &str, title: &str) -> Result<Self, InvalidPageUrl> {
        let domain = page_domain(url).ok_or_else(|| InvalidPageUrl(url.to_string()))?;
        Ok(ClipMetadata {
            title: title.to_string(),
            timestamp: now_iso8601(),
            domain,
            word_count: word_count(text),
        })
    }
}

/// The body of `POST /save`. The backend assigns the clip id; the extension
/// only shapes and transmits these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipPayload {
    pub text: Option<String>,
    pub url: String,
    pub metadata: ClipMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_data: Option<String>,
    /// Omitted entirely when the clip is unsorted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ClipPayload {
    fn base(
        text: &str,
        url: &str,
        title: &str,
        project_id: Option<String>,
    ) -> Result<Self, InvalidPageUrl> {
        let cleaned = text.trim();
        Ok(ClipPayload {
            text: (!cleaned.is_empty()).then(|| cleaned.to_string()),
            url: url.to_string(),
            metadata: ClipMetadata::for_page(cleaned, url, title)?,
            media_type: None,
            image_url: None,
            file_name: None,
            screenshot_data: None,
            project_id,
        })
    }

    /// A plain selected-text clip.
    pub fn text_clip(
        text: &str,
        url: &str,
        title: &str,
        project_id: Option<String>,
    ) -> Result<Self, InvalidPageUrl> {
        Self::base(text, url, title, project_id)
    }

    /// An image clip; alt text stands in for the body when present.
    pub fn image_clip(
        image_url: &str,
        alt_text: &str,
        page_url: &str,
        title: &str,
        project_id: Option<String>,
    ) -> Result<Self, InvalidPageUrl> {
        let text = if alt_text.trim().is_empty() {
            format!("Image from {}", page_label(title, page_url))
        } else {
            alt_text.to_string()
        };
        let mut payload = Self::base(&text, page_url, title, project_id)?;
        payload.media_type = Some(MediaType::Image);
        payload.image_url = Some(image_url.to_string());
        Ok(payload)
    }

    /// A screenshot of the visible tab, carried as a data URL. Word count is
    /// zero: the text is only a descriptive label.
    pub fn screenshot_clip(
        data_url: &str,
        page_url: &str,
        title: &str,
        project_id: Option<String>,
    ) -> Result<Self, InvalidPageUrl> {
        let text = format!("Screenshot of {}", page_label(title, page_url));
        let mut payload = Self::base(&text, page_url, title, project_id)?;
        payload.metadata.word_count = 0;
        payload.media_type = Some(MediaType::Screenshot);
        payload.screenshot_data = Some(data_url.to_string());
        Ok(payload)
    }

    /// A file clip with its extracted text content.
    pub fn file_clip(
        text: &str,
        file_name: &str,
        page_url: &str,
        title: &str,
        project_id: Option<String>,
    ) -> Result<Self, InvalidPageUrl> {
        let mut payload = Self::base(text, page_url, title, project_id)?;
        payload.media_type = Some(MediaType::File);
        payload.file_name = Some(file_name.to_string());
        Ok(payload)
    }
}

fn page_label(title: &str, url: &str) -> String {
    if title.trim().is_empty() {
        url.to_string()
    } else {
        title.to_string()
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A saved clip as the backend returns it. The backend is authoritative;
/// deserialization is tolerant of missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// A user-defined grouping of clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub clip_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn counts_words_on_whitespace() {
        assert_eq!(word_count("hello world"), 2);
        assert_eq!(word_count("  spaced\tout\nwords  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn text_clip_payload_shape() {
        let payload =
            ClipPayload::text_clip("hello world", "https://x.com/a", "Title", None).unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["text"], "hello world");
        assert_eq!(json["url"], "https://x.com/a");
        assert_eq!(json["metadata"]["title"], "Title");
        assert_eq!(json["metadata"]["wordCount"], 2);
        assert_eq!(json["metadata"]["domain"], "x.com");
        // No project chosen: the key must be absent, not null.
        assert!(json.get("project_id").is_none());
        assert!(json.get("media_type").is_none());

        let timestamp = json["metadata"]["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn text_clip_trims_and_keeps_project() {
        let payload = ClipPayload::text_clip(
            "  note  ",
            "https://example.com",
            "",
            Some("p-1".to_string()),
        )
        .unwrap();
        assert_eq!(payload.text.as_deref(), Some("note"));
        assert_eq!(payload.project_id.as_deref(), Some("p-1"));
        assert_eq!(payload.metadata.word_count, 1);
    }

    #[test]
    fn image_clip_falls_back_to_page_label() {
        let payload = ClipPayload::image_clip(
            "https://cdn.example.com/cat.png",
            "",
            "https://example.com/post",
            "A Post",
            None,
        )
        .unwrap();
        assert_eq!(payload.text.as_deref(), Some("Image from A Post"));
        assert_eq!(payload.media_type, Some(MediaType::Image));
        assert_eq!(
            payload.image_url.as_deref(),
            Some("https://cdn.example.com/cat.png")
        );
    }

    #[test]
    fn screenshot_clip_has_zero_word_count() {
        let payload = ClipPayload::screenshot_clip(
            "data:image/png;base64,AAAA",
            "https://example.com",
            "Example",
            Some("p-2".to_string()),
        )
        .unwrap();
        assert_eq!(payload.text.as_deref(), Some("Screenshot of Example"));
        assert_eq!(payload.metadata.word_count, 0);
        assert_eq!(payload.media_type, Some(MediaType::Screenshot));
        assert!(payload.screenshot_data.is_some());
    }

    #[test]
    fn file_clip_carries_file_name() {
        let payload = ClipPayload::file_clip(
            "file body",
            "notes.txt",
            "https://example.com",
            "Example",
            None,
        )
        .unwrap();
        assert_eq!(payload.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(payload.media_type, Some(MediaType::File));
        assert_eq!(payload.metadata.word_count, 2);
    }

    #[test]
    fn unparseable_page_url_is_rejected() {
        assert!(ClipPayload::text_clip("hi there you", "not a url", "T", None).is_err());
    }

    #[test]
    fn backend_clip_tolerates_missing_fields() {
        let clip: Clip = serde_json::from_str(r#"{"id":"c-1","text":"body"}"#).unwrap();
        assert_eq!(clip.id, "c-1");
        assert_eq!(clip.word_count, 0);
        assert!(clip.media_type.is_none());
        assert!(clip.project_id.is_none());
    }
}
