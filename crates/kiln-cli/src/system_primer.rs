use std::path::Path;

use anyhow::{Context, Result};

/// Built-in primer used when no override file is configured. The textual
/// content is deliberately bland; deployments override it with their own
/// product knowledge via `--system-primer-file`.
const DEFAULT_SYSTEM_PRIMER: &str = "\
You are Kiln, the support assistant for a game-server hosting platform, \
answering questions in the platform's Discord support channel.

When helping users:
1. Be friendly, professional, and concise.
2. If you don't know the answer, say so rather than guessing.
3. For technical issues, ask for the exact error message when one exists.
4. Provide step-by-step instructions when explaining solutions.

Response format:
- Replies are Discord messages; use Discord markdown sparingly.
- Never ping @everyone, @here, or individual users.
- Stay on hosting and game-server topics; politely decline anything else.";

/// The built-in primer, or the contents of the override file when set.
pub fn resolve(override_file: Option<&Path>) -> Result<String> {
    match override_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read system primer file {}", path.display())),
        None => Ok(DEFAULT_SYSTEM_PRIMER.to_string()),
    }
}
