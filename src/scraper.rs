/// Per-site selectors for scraping chat transcripts and locating inputs

/// Who authored a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message in a scraped conversation, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Selectors for pulling user and assistant turns out of a chat page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSelectors {
    pub user: &'static str,
    pub assistant: &'static str,
}

impl TurnSelectors {
    /// Combined selector for a single document-order query.
    pub fn combined(&self) -> String {
        format!("{}, {}", self.user, self.assistant)
    }
}

/// Which chat site a page belongs to, decided by hostname. Drives both
/// transcript scraping and where injected context is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStrategy {
    ChatGpt,
    Claude,
    Gemini,
    Generic,
}

impl SiteStrategy {
    pub fn for_hostname(hostname: &str) -> Self {
        let hostname = hostname.to_lowercase();
        if hostname.contains("chatgpt.com") || hostname.contains("chat.openai.com") {
            SiteStrategy::ChatGpt
        } else if hostname.contains("claude.ai") {
            SiteStrategy::Claude
        } else if hostname.contains("gemini.google.com") {
            SiteStrategy::Gemini
        } else {
            SiteStrategy::Generic
        }
    }

    /// `None` for generic pages, which fall back to whole-page text.
    pub fn turn_selectors(self) -> Option<TurnSelectors> {
        match self {
            SiteStrategy::ChatGpt => Some(TurnSelectors {
                user: r#"[data-message-author-role="user"]"#,
                assistant: r#"[data-message-author-role="assistant"]"#,
            }),
            SiteStrategy::Claude => Some(TurnSelectors {
                user: ".font-user-message",
                assistant: ".font-claude-message",
            }),
            SiteStrategy::Gemini => Some(TurnSelectors {
                user: "user-query",
                assistant: "model-response",
            }),
            SiteStrategy::Generic => None,
        }
    }

    /// Candidate input selectors, most specific first.
    pub fn input_selectors(self) -> &'static [&'static str] {
        match self {
            SiteStrategy::ChatGpt => &["#prompt-textarea", r#"[contenteditable="true"]"#],
            SiteStrategy::Claude => &[
                r#"div.ProseMirror[contenteditable="true"]"#,
                r#"[contenteditable="true"]"#,
            ],
            SiteStrategy::Gemini => &[
                r#".ql-editor[contenteditable="true"]"#,
                r#"[contenteditable="true"]"#,
            ],
            SiteStrategy::Generic => &[r#"[contenteditable="true"]"#, "textarea"],
        }
    }
}

/// Renders scraped turns as a plain-text transcript.
pub fn flatten_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{speaker}: {}", turn.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostnames_map_to_strategies() {
        assert_eq!(SiteStrategy::for_hostname("chatgpt.com"), SiteStrategy::ChatGpt);
        assert_eq!(
            SiteStrategy::for_hostname("chat.openai.com"),
            SiteStrategy::ChatGpt
        );
        assert_eq!(SiteStrategy::for_hostname("claude.ai"), SiteStrategy::Claude);
        assert_eq!(
            SiteStrategy::for_hostname("gemini.google.com"),
            SiteStrategy::Gemini
        );
        assert_eq!(
            SiteStrategy::for_hostname("news.ycombinator.com"),
            SiteStrategy::Generic
        );
    }

    #[test]
    fn hostname_match_is_case_insensitive() {
        assert_eq!(SiteStrategy::for_hostname("ChatGPT.com"), SiteStrategy::ChatGpt);
    }

    #[test]
    fn generic_pages_have_no_turn_selectors() {
        assert!(SiteStrategy::Generic.turn_selectors().is_none());
        assert!(SiteStrategy::ChatGpt.turn_selectors().is_some());
    }

    #[test]
    fn combined_selector_joins_both_roles() {
        let selectors = SiteStrategy::Gemini.turn_selectors().unwrap();
        assert_eq!(selectors.combined(), "user-query, model-response");
    }

    #[test]
    fn every_strategy_ends_with_a_broad_input_fallback() {
        for strategy in [
            SiteStrategy::ChatGpt,
            SiteStrategy::Claude,
            SiteStrategy::Gemini,
            SiteStrategy::Generic,
        ] {
            let selectors = strategy.input_selectors();
            assert!(!selectors.is_empty());
        }
        assert_eq!(SiteStrategy::ChatGpt.input_selectors()[0], "#prompt-textarea");
        assert_eq!(SiteStrategy::Generic.input_selectors().last(), Some(&"textarea"));
    }

    #[test]
    fn transcript_flattens_in_order() {
        let turns = [
            Turn {
                role: Role::User,
                text: "  What is Rust?  ".to_string(),
            },
            Turn {
                role: Role::Assistant,
                text: "A systems language.".to_string(),
            },
        ];
        assert_eq!(
            flatten_turns(&turns),
            "User: What is Rust?\n\nAssistant: A systems language."
        );
    }

    #[test]
    fn empty_transcript_is_empty_string() {
        assert_eq!(flatten_turns(&[]), "");
    }
}
