#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Administrative text commands recognized verbatim as full message content.
pub enum AdminCommand {
    ClearHistory,
    ShowHistory,
}

/// Matches the trimmed message content against the configured command
/// literals. Commands run before rate limiting and response gating.
pub fn parse_admin_command(
    content: &str,
    clear_command: &str,
    history_command: &str,
) -> Option<AdminCommand> {
    let trimmed = content.trim();
    if trimmed == clear_command {
        Some(AdminCommand::ClearHistory)
    } else if trimmed == history_command {
        Some(AdminCommand::ShowHistory)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_match_verbatim_full_content_only() {
        assert_eq!(
            parse_admin_command("!clear", "!clear", "!history"),
            Some(AdminCommand::ClearHistory)
        );
        assert_eq!(
            parse_admin_command("  !history  ", "!clear", "!history"),
            Some(AdminCommand::ShowHistory)
        );
        assert_eq!(parse_admin_command("!clear please", "!clear", "!history"), None);
        assert_eq!(parse_admin_command("what is !clear", "!clear", "!history"), None);
    }
}
