use kiln_memory::ConversationMessage;

const EMPTY_HISTORY_NOTICE: &str = "No conversation history found.";

/// Renders the history command output: one block per turn with a timestamp,
/// a bold role label, and content truncated to the character budget.
pub fn render_history_dump(messages: &[ConversationMessage], char_budget: usize) -> String {
    if messages.is_empty() {
        return EMPTY_HISTORY_NOTICE.to_string();
    }

    messages
        .iter()
        .map(|message| {
            format!(
                "[{}] **{}**: {}",
                message.timestamp.format("%H:%M:%S"),
                message.role.label(),
                truncate_chars(&message.content, char_budget)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_chars(content: &str, budget: usize) -> String {
    let mut truncated: String = content.chars().take(budget).collect();
    if truncated.chars().count() < content.chars().count() {
        truncated.push_str("...");
    }
    truncated
}
