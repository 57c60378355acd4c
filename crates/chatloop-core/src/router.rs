//! Intent Routing
//!
//! Classifies a user line before the tool loop runs. The model is asked
//! first; when its reply is missing or unusable a fixed keyword match takes
//! over. Which of the two decided is kept in [`RoutingDecision`].

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::provider::{GenerationOptions, LlmProvider};

const ROUTER_PROMPT: &str = r#"You are an intent router. Classify the user input and reply with one JSON object only.

Intents:
- time: the user only asks for the current local time ("what time is it")
- chat: anything the assistant has to think about (other time zones, explanations, arithmetic, general questions)
- summary: the user asks to summarize the conversation
- end: the user wants to finish the conversation (bye, quit, exit)

Format: {"action": "time|chat|summary|end", "reason": "short reason"}"#;

/// What the user wants from this line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Time,
    Chat,
    Summary,
    End,
}

impl Intent {
    fn parse(action: &str) -> Option<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "time" => Some(Self::Time),
            "chat" => Some(Self::Chat),
            "summary" => Some(Self::Summary),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Chat => write!(f, "chat"),
            Self::Summary => write!(f, "summary"),
            Self::End => write!(f, "end"),
        }
    }
}

/// An intent and why it was chosen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub intent: Intent,
    pub reason: String,
}

/// Routing outcome, tagged with the policy that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingDecision {
    /// The model classified the input
    ByModel(Route),
    /// The model reply was unusable; keywords decided
    ByFallback(Route),
}

impl RoutingDecision {
    pub const fn route(&self) -> &Route {
        match self {
            Self::ByModel(route) | Self::ByFallback(route) => route,
        }
    }

    pub const fn intent(&self) -> Intent {
        self.route().intent
    }

    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::ByFallback(_))
    }
}

#[derive(Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Pick a route from the model's reply, falling back to keywords
///
/// `model_reply` is `None` when the model call itself failed.
pub fn decide_route(model_reply: Option<&str>, user_text: &str) -> RoutingDecision {
    if let Some(route) = model_reply.and_then(parse_model_route) {
        return RoutingDecision::ByModel(route);
    }

    RoutingDecision::ByFallback(keyword_route(user_text))
}

/// Extract the first `{...}` object from a reply and read it as a route
fn parse_model_route(reply: &str) -> Option<Route> {
    let start = reply.find('{')?;
    let end = start + reply[start..].find('}')?;
    let raw: RawDecision = serde_json::from_str(&reply[start..=end]).ok()?;
    let intent = Intent::parse(&raw.action)?;

    Some(Route {
        intent,
        reason: raw.reason.unwrap_or_default(),
    })
}

/// Whether `keyword` occurs in the text
///
/// ASCII keywords must match whole words so "quite" never reads as "quit";
/// CJK keywords have no word boundaries and match as substrings.
fn mentions(lower: &str, words: &[&str], keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return lower.contains(keyword);
    }

    let phrase: Vec<&str> = keyword.split_whitespace().collect();
    words.windows(phrase.len()).any(|w| w == phrase.as_slice())
}

fn keyword_route(user_text: &str) -> Route {
    const TIME_EXACT: &[&str] = &["现在几点", "几点了", "现在时间", "what time is it", "what's the time"];
    const SUMMARY: &[&str] = &["总结对话", "概括一下", "summarize our conversation", "summarize the conversation"];
    const END: &[&str] = &["结束聊天", "退出", "再见", "bye", "goodbye"];

    let lower = user_text.trim().to_lowercase();
    let trimmed = lower.trim_end_matches(['?', '？', '.', '!']);
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let (intent, keyword) = if let Some(k) = TIME_EXACT.iter().find(|k| trimmed == **k) {
        (Intent::Time, *k)
    } else if let Some(k) = SUMMARY.iter().find(|k| mentions(&lower, &words, k)) {
        (Intent::Summary, *k)
    } else if let Some(k) = END.iter().find(|k| mentions(&lower, &words, k)) {
        (Intent::End, *k)
    } else {
        return Route {
            intent: Intent::Chat,
            reason: "no keyword matched".into(),
        };
    };

    Route {
        intent,
        reason: format!("keyword '{keyword}'"),
    }
}

/// Model-backed router
pub struct Router {
    options: GenerationOptions,
}

impl Router {
    /// Router using `generation` with a deterministic temperature and a
    /// short reply budget
    pub fn new(generation: &GenerationOptions) -> Self {
        let options = GenerationOptions {
            temperature: 0.0,
            max_tokens: 256,
            ..generation.clone()
        }
        .with_system_prompt(ROUTER_PROMPT);

        Self { options }
    }

    /// Classify `user_text`; never fails, the fallback covers model errors
    pub async fn route(&self, provider: &dyn LlmProvider, user_text: &str) -> RoutingDecision {
        let request = [Message::user(format!("User input: {user_text}\n\nReply with JSON:"))];

        let reply = match provider.complete(&request, &[], &self.options).await {
            Ok(completion) => completion.content,
            Err(e) => {
                tracing::warn!(error = %e, "Router model call failed");
                None
            }
        };

        let decision = decide_route(reply.as_deref(), user_text);
        if decision.is_fallback() {
            tracing::warn!(intent = %decision.intent(), "Routing fell back to keywords");
        } else {
            tracing::debug!(intent = %decision.intent(), reason = %decision.route().reason, "Routed by model");
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_reply_wins() {
        let decision = decide_route(
            Some(r#"Sure: {"action": "summary", "reason": "asked for recap"}"#),
            "bye",
        );
        assert_eq!(
            decision,
            RoutingDecision::ByModel(Route {
                intent: Intent::Summary,
                reason: "asked for recap".into(),
            })
        );
    }

    #[test]
    fn test_unknown_action_falls_back() {
        let decision = decide_route(Some(r#"{"action": "dance"}"#), "goodbye then");
        assert!(decision.is_fallback());
        assert_eq!(decision.intent(), Intent::End);
    }

    #[test]
    fn test_missing_reply_falls_back() {
        let decision = decide_route(None, "现在几点");
        assert!(decision.is_fallback());
        assert_eq!(decision.intent(), Intent::Time);
    }

    #[test]
    fn test_time_keyword_needs_exact_match() {
        assert_eq!(decide_route(None, "What time is it?").intent(), Intent::Time);
        assert_eq!(
            decide_route(None, "what time is it in Tokyo").intent(),
            Intent::Chat
        );
    }

    #[test]
    fn test_keywords_match_whole_words() {
        for text in [
            "I'm not quite sure what 3 * 7 is",
            "how does an exit interview work",
            "explain the summary statistics of a dataset",
            "what is a byte",
        ] {
            assert_eq!(decide_route(None, text).intent(), Intent::Chat, "{text}");
        }

        assert_eq!(decide_route(None, "ok, bye!").intent(), Intent::End);
        assert_eq!(decide_route(None, "Goodbye").intent(), Intent::End);
        assert_eq!(decide_route(None, "我要退出了").intent(), Intent::End);
        assert_eq!(
            decide_route(None, "please summarize our conversation").intent(),
            Intent::Summary
        );
        assert_eq!(decide_route(None, "帮我总结对话").intent(), Intent::Summary);
    }

    #[test]
    fn test_fallback_defaults_to_chat() {
        let decision = decide_route(Some("no json here"), "tell me a joke");
        assert_eq!(decision.intent(), Intent::Chat);
        assert!(decision.is_fallback());
    }

    #[test]
    fn test_router_options_are_deterministic() {
        let router = Router::new(&GenerationOptions::default());
        assert!(router.options.temperature.abs() < f32::EPSILON);
        assert!(router.options.system_prompt.is_some());
    }
}
