use std::path::PathBuf;

use clap::{ArgAction, Parser};

use kiln_ai::GoogleConfig;
use kiln_memory::MemoryConfig;
use kiln_safety::{EscalationConfig, GatingConfig, RateLimitConfig};
use kiln_session::SessionRuntimeConfig;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "kiln",
    about = "Discord support assistant with bounded conversation memory and escalation",
    version
)]
/// Flag surface for the `kiln` binary; every flag has a `KILN_*` env fallback.
pub struct Cli {
    #[arg(
        long,
        env = "KILN_DISCORD_TOKEN",
        hide_env_values = true,
        help = "Discord bot token"
    )]
    pub discord_token: String,

    #[arg(
        long,
        env = "KILN_GOOGLE_API_KEY",
        hide_env_values = true,
        help = "API key for the Gemini generateContent endpoint"
    )]
    pub google_api_key: String,

    #[arg(
        long,
        env = "KILN_SUPPORT_CHANNEL_ID",
        help = "Channel id the assistant watches; messages elsewhere are ignored"
    )]
    pub support_channel_id: String,

    #[arg(
        long,
        env = "KILN_SUPPORT_ROLE_ID",
        help = "Role id mentioned when a reply is escalated to human support"
    )]
    pub support_role_id: String,

    #[arg(
        long,
        env = "KILN_BOT_MENTION",
        help = "Optional mention token (e.g. <@1234567890>) that always warrants a reply"
    )]
    pub bot_mention: Option<String>,

    #[arg(
        long,
        env = "KILN_MODEL",
        default_value = "gemini-2.0-flash-001",
        help = "Primary generation model"
    )]
    pub model: String,

    #[arg(
        long,
        env = "KILN_FALLBACK_MODEL",
        default_value = "gemini-1.5-flash-001",
        help = "Fallback model tried once when the primary call fails; empty disables the fallback"
    )]
    pub fallback_model: String,

    #[arg(
        long,
        env = "KILN_API_BASE",
        default_value = "https://generativelanguage.googleapis.com/v1beta",
        help = "Base URL for the Gemini API"
    )]
    pub api_base: String,

    #[arg(
        long,
        env = "KILN_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for generation calls"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "KILN_STATE_DIR",
        default_value = "data",
        help = "Directory holding the conversation snapshot document"
    )]
    pub state_dir: PathBuf,

    #[arg(
        long,
        env = "KILN_SAVE_INTERVAL_MS",
        default_value_t = 5 * 60 * 1_000,
        value_parser = parse_positive_u64,
        help = "Interval between periodic snapshot writes"
    )]
    pub save_interval_ms: u64,

    #[arg(
        long,
        env = "KILN_MAX_MESSAGES",
        default_value_t = 15,
        value_parser = parse_positive_usize,
        help = "Maximum messages retained per conversation"
    )]
    pub max_messages: usize,

    #[arg(
        long,
        env = "KILN_CONVERSATION_EXPIRY_MS",
        default_value_t = 30 * 60 * 1_000,
        help = "Idle time after which a conversation is discarded"
    )]
    pub conversation_expiry_ms: i64,

    #[arg(
        long,
        env = "KILN_RATE_LIMIT_MAX_MESSAGES",
        default_value_t = 15,
        value_parser = parse_positive_usize,
        help = "Messages per window before a sender is throttled"
    )]
    pub rate_limit_max_messages: usize,

    #[arg(
        long,
        env = "KILN_RATE_LIMIT_WINDOW_MS",
        default_value_t = 2 * 60 * 1_000,
        value_parser = parse_positive_u64,
        help = "Sliding throttle window"
    )]
    pub rate_limit_window_ms: u64,

    #[arg(
        long,
        env = "KILN_BURST_THRESHOLD",
        default_value_t = 10,
        value_parser = parse_positive_usize,
        help = "Messages within the burst window that trigger escalation"
    )]
    pub burst_threshold: usize,

    #[arg(
        long,
        env = "KILN_BURST_WINDOW_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Sliding burst-detection window"
    )]
    pub burst_window_ms: u64,

    #[arg(
        long,
        env = "KILN_CLEAR_COMMAND",
        default_value = "!clear",
        help = "Verbatim message content that clears the channel's history"
    )]
    pub clear_command: String,

    #[arg(
        long,
        env = "KILN_HISTORY_COMMAND",
        default_value = "!history",
        help = "Verbatim message content that dumps the channel's history"
    )]
    pub history_command: String,

    #[arg(
        long,
        env = "KILN_HISTORY_CHAR_BUDGET",
        default_value_t = 100,
        value_parser = parse_positive_usize,
        help = "Character budget per rendered history entry"
    )]
    pub history_char_budget: usize,

    #[arg(
        long,
        env = "KILN_SHOW_TYPING",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Send the typing indicator while generating"
    )]
    pub show_typing: bool,

    #[arg(
        long,
        env = "KILN_LOG_CONVERSATIONS",
        default_value_t = false,
        action = ArgAction::Set,
        help = "Log recorded conversation turns"
    )]
    pub log_conversations: bool,

    #[arg(
        long,
        env = "KILN_SYSTEM_PRIMER_FILE",
        help = "Optional file overriding the built-in system primer"
    )]
    pub system_primer_file: Option<PathBuf>,
}

impl Cli {
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            max_messages: self.max_messages,
            expiry_ms: self.conversation_expiry_ms,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_messages_per_window: self.rate_limit_max_messages,
            window_ms: self.rate_limit_window_ms,
            burst_threshold: self.burst_threshold,
            burst_window_ms: self.burst_window_ms,
        }
    }

    pub fn google_config(&self) -> GoogleConfig {
        GoogleConfig {
            api_base: self.api_base.clone(),
            api_key: self.google_api_key.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn session_config(&self, system_primer: String) -> SessionRuntimeConfig {
        SessionRuntimeConfig {
            watched_channel_id: self.support_channel_id.clone(),
            support_role_id: self.support_role_id.clone(),
            primary_model: self.model.clone(),
            fallback_model: Some(self.fallback_model.clone())
                .filter(|model| !model.trim().is_empty()),
            system_primer,
            clear_command: self.clear_command.clone(),
            history_command: self.history_command.clone(),
            history_char_budget: self.history_char_budget,
            show_typing: self.show_typing,
            log_conversations: self.log_conversations,
            gating: GatingConfig {
                mention_token: self.bot_mention.clone(),
                ..GatingConfig::default()
            },
            escalation: EscalationConfig::default(),
        }
    }
}
