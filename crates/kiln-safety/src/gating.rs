#[derive(Debug, Clone)]
/// Textual classifier inputs for the respond-or-stay-silent decision.
pub struct GatingConfig {
    /// The bot's own mention token, e.g. `<@1234567890>`. A message that
    /// addresses the bot directly always warrants a reply.
    pub mention_token: Option<String>,
    pub question_starters: Vec<String>,
    pub help_phrases: Vec<String>,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            mention_token: None,
            question_starters: [
                "what", "how", "why", "when", "where", "who", "which", "can", "could", "would",
                "should", "is", "are", "am", "do", "does", "did", "help", "what's",
            ]
            .iter()
            .map(|starter| starter.to_string())
            .collect(),
            help_phrases: [
                "i need help",
                "help me",
                "having trouble",
                "not working",
                "can't figure out",
                "having an issue",
                "having a problem",
                "error",
                "broken",
                "stuck",
                "assistance",
                "support",
                "how do i",
                "how to",
            ]
            .iter()
            .map(|phrase| phrase.to_string())
            .collect(),
        }
    }
}

/// Whether an inbound message warrants a generated reply.
///
/// Pure text matching over the trimmed, case-folded content: a trailing
/// question mark, a direct mention of the bot, a leading interrogative word,
/// or a help-seeking phrase anywhere.
pub fn requires_response(content: &str, config: &GatingConfig) -> bool {
    let trimmed = content.trim().to_lowercase();

    if trimmed.ends_with('?') {
        return true;
    }

    if let Some(token) = config
        .mention_token
        .as_deref()
        .map(str::to_lowercase)
        .filter(|token| !token.is_empty())
    {
        if trimmed.contains(&token) {
            return true;
        }
    }

    for starter in &config.question_starters {
        if let Some(rest) = trimmed.strip_prefix(starter.as_str()) {
            if rest.starts_with(' ') {
                return true;
            }
        }
    }

    config
        .help_phrases
        .iter()
        .any(|phrase| trimmed.contains(phrase.as_str()))
}
