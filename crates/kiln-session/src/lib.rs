//! Per-message session orchestration for the Kiln support assistant.
//!
//! [`SupportSessionRuntime`] ties the conversation store, activity tracker,
//! escalation policy, and generation client together: every inbound message
//! runs through admin-command handling, throttling, transcript recording,
//! response gating, one generation call (plus at most one fallback), directive
//! extraction, sanitization, and escalation annotation, in that order. The
//! chat platform behind [`ChatTransport`] and the generation provider are the
//! only asynchronous collaborators.

mod session_commands;
mod session_render;
mod session_runtime;


pub use session_commands::{parse_admin_command, AdminCommand};
pub use session_render::render_history_dump;
pub use session_runtime::{
    ChatTransport, InboundMessage, SessionRuntimeConfig, SupportSessionRuntime, TurnOutcome,
    GENERATION_FAILURE_NOTICE, THROTTLE_NOTICE,
};
