use std::sync::OnceLock;

use regex::Regex;

/// Out-of-band marker the generator embeds to request a human-support ping.
pub const PING_SUPPORT_MARKER: &str = "[[PING_SUPPORT]]";
/// Out-of-band marker the generator embeds to suppress the reply entirely.
pub const NO_RESPONSE_MARKER: &str = "[[NO_RESPONSE]]";

#[derive(Debug, Clone)]
/// Content-based escalation inputs.
pub struct EscalationConfig {
    pub urgent_keywords: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            urgent_keywords: [
                "urgent",
                "emergency",
                "asap",
                "immediately",
                "refund",
                "charged twice",
                "data loss",
                "lost my data",
                "server down",
                "can't access my server",
                "hacked",
            ]
            .iter()
            .map(|keyword| keyword.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Typed result of scanning generated text for directive markers.
pub struct ReplyDirectives {
    pub ping_support: bool,
    pub suppress_response: bool,
    pub cleaned_text: String,
}

/// True when the user's message contains an urgent keyword
/// (case-insensitive substring match).
pub fn is_urgent_content(content: &str, config: &EscalationConfig) -> bool {
    let folded = content.to_lowercase();
    config
        .urgent_keywords
        .iter()
        .any(|keyword| folded.contains(keyword.as_str()))
}

/// Scans generated text for directive markers, position-independent, and
/// strips every occurrence. The cleaned text is what may be delivered;
/// the markers never are.
pub fn extract_directives(text: &str) -> ReplyDirectives {
    let ping_support = text.contains(PING_SUPPORT_MARKER);
    let suppress_response = text.contains(NO_RESPONSE_MARKER);

    // Stripping runs to a fixpoint: removing one occurrence can splice the
    // surrounding text into a new marker.
    let mut cleaned = text.to_string();
    loop {
        let next = cleaned
            .replace(PING_SUPPORT_MARKER, "")
            .replace(NO_RESPONSE_MARKER, "");
        if next == cleaned {
            break;
        }
        cleaned = next;
    }
    let cleaned_text = cleaned.trim().to_string();

    ReplyDirectives {
        ping_support,
        suppress_response,
        cleaned_text,
    }
}

fn everyone_mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)@everyone").expect("hard-coded pattern compiles"))
}

fn here_mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)@here").expect("hard-coded pattern compiles"))
}

/// Neutralizes broadcast mentions and keeps a trailing closing code fence on
/// its own line. Runs after directive extraction, before delivery.
pub fn sanitize_reply(text: &str) -> String {
    let without_everyone = everyone_mention_pattern().replace_all(text, "everyone");
    let mut sanitized = here_mention_pattern()
        .replace_all(&without_everyone, "here")
        .into_owned();
    if sanitized.ends_with("```") {
        sanitized.push('\n');
    }
    sanitized
}

/// Prepends the fixed support-role mention when escalating; otherwise the
/// cleaned text passes through unchanged.
pub fn compose_final_reply(cleaned_text: &str, escalate: bool, support_role_id: &str) -> String {
    if escalate {
        format!("<@&{support_role_id}> (escalated to human support)\n\n{cleaned_text}")
    } else {
        cleaned_text.to_string()
    }
}
