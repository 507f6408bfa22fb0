/// Background message dispatch: action requests in, result envelopes out

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::{ApiClient, BridgeFormat};
use crate::clip::ClipPayload;
use crate::session::{Clock, SessionStore};

/// A message posted to the background worker. The `action` tag selects the
/// variant; field names stay camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "saveClip", rename_all = "camelCase")]
    SaveClip {
        text: String,
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        project_id: Option<String>,
    },
    #[serde(rename = "askQuestion")]
    AskQuestion { question: String },
    #[serde(rename = "getProjects")]
    GetProjects,
    #[serde(rename = "exportProject", rename_all = "camelCase")]
    ExportProject { project_id: String },
    #[serde(rename = "exportBridge", rename_all = "camelCase")]
    ExportBridge {
        project_id: String,
        #[serde(default)]
        format: Option<BridgeFormat>,
        #[serde(default)]
        compact: bool,
    },
    #[serde(rename = "captureScreenshot", rename_all = "camelCase")]
    CaptureScreenshot {
        #[serde(default)]
        project_id: Option<String>,
    },
    #[serde(rename = "saveScreenshot", rename_all = "camelCase")]
    SaveScreenshot {
        screenshot_data: String,
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        project_id: Option<String>,
    },
    #[serde(rename = "saveImage", rename_all = "camelCase")]
    SaveImage {
        image_url: String,
        #[serde(default)]
        alt_text: String,
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        project_id: Option<String>,
    },
    #[serde(rename = "saveFile", rename_all = "camelCase")]
    SaveFile {
        text: String,
        file_name: String,
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        project_id: Option<String>,
    },
    #[serde(rename = "proxyFetch")]
    ProxyFetch { url: String },
}

/// Uniform reply for every action. Exactly one of `data`/`error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Envelope {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Envelope {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// The tab a capture request applies to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TabMeta {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Browser facilities the relay needs. Implemented over the extension API in
/// production and stubbed in tests.
#[allow(async_fn_in_trait)]
pub trait BrowserBridge {
    async fn active_tab(&self) -> Result<TabMeta, String>;
    async fn capture_visible_tab(&self) -> Result<String, String>;
    fn notify(&self, title: &str, message: &str);
}

/// Routes one action request to the backend client. Holds no per-message
/// state, so each message can be dispatched on a fresh instance.
pub struct Relay<S, C, B> {
    api: ApiClient<S, C>,
    browser: B,
}

impl<S: SessionStore, C: Clock, B: BrowserBridge> Relay<S, C, B> {
    pub fn new(api: ApiClient<S, C>, browser: B) -> Self {
        Relay { api, browser }
    }

    pub async fn dispatch(&self, request: Request) -> Envelope {
        match request {
            Request::SaveClip {
                text,
                url,
                title,
                project_id,
            } => {
                if text.trim().is_empty() {
                    return Envelope::err("No text selected");
                }
                let payload = match ClipPayload::text_clip(&text, &url, &title, project_id) {
                    Ok(payload) => payload,
                    Err(err) => return Envelope::err(err.to_string()),
                };
                self.save(payload, "Clip saved").await
            }
            Request::AskQuestion { question } => {
                if question.trim().is_empty() {
                    return Envelope::err("Question is empty");
                }
                self.wrap(self.api.ask_question(question.trim()).await)
            }
            Request::GetProjects => {
                let result = self.api.projects().await.and_then(|projects| {
                    serde_json::to_value(projects).map_err(Into::into)
                });
                self.wrap(result)
            }
            Request::ExportProject { project_id } => {
                let result = self.api.export_project(&project_id).await.map(|export| {
                    json!({ "context": export.context, "clip_count": export.clip_count })
                });
                self.wrap(result)
            }
            Request::ExportBridge {
                project_id,
                format,
                compact,
            } => {
                self.wrap(
                    self.api
                        .export_bridge(&project_id, format.unwrap_or_default(), compact)
                        .await,
                )
            }
            Request::CaptureScreenshot { project_id } => {
                let tab = match self.browser.active_tab().await {
                    Ok(tab) => tab,
                    Err(err) => return Envelope::err(err),
                };
                let data_url = match self.browser.capture_visible_tab().await {
                    Ok(data_url) => data_url,
                    Err(err) => return Envelope::err(err),
                };
                let payload = match ClipPayload::screenshot_clip(
                    &data_url, &tab.url, &tab.title, project_id,
                ) {
                    Ok(payload) => payload,
                    Err(err) => return Envelope::err(err.to_string()),
                };
                self.save(payload, "Screenshot saved").await
            }
            Request::SaveScreenshot {
                screenshot_data,
                url,
                title,
                project_id,
            } => {
                let payload = match ClipPayload::screenshot_clip(
                    &screenshot_data,
                    &url,
                    &title,
                    project_id,
                ) {
                    Ok(payload) => payload,
                    Err(err) => return Envelope::err(err.to_string()),
                };
                self.save(payload, "Screenshot saved").await
            }
            Request::SaveImage {
                image_url,
                alt_text,
                url,
                title,
                project_id,
            } => {
                let payload = match ClipPayload::image_clip(
                    &image_url, &alt_text, &url, &title, project_id,
                ) {
                    Ok(payload) => payload,
                    Err(err) => return Envelope::err(err.to_string()),
                };
                self.save(payload, "Image saved").await
            }
            Request::SaveFile {
                text,
                file_name,
                url,
                title,
                project_id,
            } => {
                if text.trim().is_empty() {
                    return Envelope::err("File has no extractable text");
                }
                let payload = match ClipPayload::file_clip(
                    &text, &file_name, &url, &title, project_id,
                ) {
                    Ok(payload) => payload,
                    Err(err) => return Envelope::err(err.to_string()),
                };
                self.save(payload, "File saved").await
            }
            Request::ProxyFetch { url } => self.wrap(self.api.proxy_fetch(&url).await),
        }
    }

    async fn save(&self, payload: ClipPayload, notice: &str) -> Envelope {
        match self.api.save_clip(&payload).await {
            Ok(data) => {
                self.browser.notify("Context Clipper", notice);
                Envelope::ok(data)
            }
            Err(err) => {
                log::error!("save failed: {err}");
                Envelope::err(err.to_string())
            }
        }
    }

    fn wrap(&self, result: Result<Value, crate::error::ApiError>) -> Envelope {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(err) => {
                log::error!("action failed: {err}");
                Envelope::err(err.to_string())
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::{MemoryStore, Session, SystemClock};
    use std::cell::RefCell;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct StubBrowser {
        notifications: RefCell<Vec<String>>,
    }

    impl BrowserBridge for StubBrowser {
        async fn active_tab(&self) -> Result<TabMeta, String> {
            Ok(TabMeta {
                url: "https://example.com/page".to_string(),
                title: "Example".to_string(),
            })
        }

        async fn capture_visible_tab(&self) -> Result<String, String> {
            Ok("data:image/png;base64,AAAA".to_string())
        }

        fn notify(&self, _title: &str, message: &str) {
            self.notifications.borrow_mut().push(message.to_string());
        }
    }

    fn relay(server: &MockServer) -> Relay<MemoryStore, SystemClock, StubBrowser> {
        let config = Config {
            api_base: server.uri(),
            auth_url: server.uri(),
            anon_key: "anon".to_string(),
        };
        let store = MemoryStore::with_session(Session {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            expires_at: None,
            user: None,
        });
        Relay::new(
            ApiClient::new(&config, store, SystemClock),
            StubBrowser::default(),
        )
    }

    fn parse(json: serde_json::Value) -> Request {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn actions_parse_from_camel_case_messages() {
        assert_eq!(
            parse(serde_json::json!({
                "action": "saveClip",
                "text": "hi",
                "url": "https://x.com",
                "title": "T",
                "projectId": "p-1"
            })),
            Request::SaveClip {
                text: "hi".to_string(),
                url: "https://x.com".to_string(),
                title: "T".to_string(),
                project_id: Some("p-1".to_string()),
            }
        );
        assert_eq!(
            parse(serde_json::json!({
                "action": "saveImage",
                "imageUrl": "https://cdn.example.com/a.png",
                "altText": "alt",
                "url": "https://x.com",
                "title": "T"
            })),
            Request::SaveImage {
                image_url: "https://cdn.example.com/a.png".to_string(),
                alt_text: "alt".to_string(),
                url: "https://x.com".to_string(),
                title: "T".to_string(),
                project_id: None,
            }
        );
        assert_eq!(parse(serde_json::json!({"action": "getProjects"})), Request::GetProjects);
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let result: Result<Request, _> =
            serde_json::from_value(serde_json::json!({"action": "doSomethingElse"}));
        assert!(result.is_err());
    }

    #[test]
    fn envelope_serializes_without_null_fields() {
        let ok = serde_json::to_value(Envelope::ok(serde_json::json!({"id": "c-1"}))).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"]["id"], "c-1");
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(Envelope::err("boom")).unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"], "boom");
        assert!(err.get("data").is_none());
    }

    #[tokio::test]
    async fn save_clip_posts_the_full_payload_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/save"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "c-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let relay = relay(&server);
        let envelope = relay
            .dispatch(Request::SaveClip {
                text: "hello world".to_string(),
                url: "https://x.com/a".to_string(),
                title: "Title".to_string(),
                project_id: None,
            })
            .await;
        assert!(envelope.success);
        assert_eq!(relay.browser.notifications.borrow().as_slice(), ["Clip saved"]);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["text"], "hello world");
        assert_eq!(body["url"], "https://x.com/a");
        assert_eq!(body["metadata"]["title"], "Title");
        assert_eq!(body["metadata"]["wordCount"], 2);
        assert_eq!(body["metadata"]["domain"], "x.com");
        assert!(body.get("project_id").is_none());
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/save"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let envelope = relay(&server)
            .dispatch(Request::SaveClip {
                text: "   ".to_string(),
                url: "https://x.com".to_string(),
                title: String::new(),
                project_id: None,
            })
            .await;
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("No text selected"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let server = MockServer::start().await;
        let envelope = relay(&server)
            .dispatch(Request::AskQuestion {
                question: "  ".to_string(),
            })
            .await;
        assert!(!envelope.success);
    }

    #[tokio::test]
    async fn capture_screenshot_saves_with_zero_word_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/save"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "c-2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let envelope = relay(&server)
            .dispatch(Request::CaptureScreenshot { project_id: None })
            .await;
        assert!(envelope.success);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["media_type"], "screenshot");
        assert_eq!(body["metadata"]["wordCount"], 0);
        assert_eq!(body["text"], "Screenshot of Example");
        assert_eq!(body["screenshot_data"], "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn bridge_export_defaults_to_yaml() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p-1/bridge"))
            .and(wiremock::matchers::query_param("format", "yaml"))
            .and(wiremock::matchers::query_param("compact", "false"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": "ctx:"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let envelope = relay(&server)
            .dispatch(Request::ExportBridge {
                project_id: "p-1".to_string(),
                format: None,
                compact: false,
            })
            .await;
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn backend_failure_becomes_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"detail": "db down"})),
            )
            .mount(&server)
            .await;

        let envelope = relay(&server).dispatch(Request::GetProjects).await;
        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("db down"));
    }
}
