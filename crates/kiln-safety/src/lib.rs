//! Rate limiting, response gating, and escalation policy for Kiln.
//!
//! Everything here is synchronous and deterministic given its inputs: the
//! activity tracker is a per-user sliding-window timestamp sequence, and the
//! policy layer is pure text matching. The session runtime combines the
//! signals; nothing in this crate touches the network or the clock.

mod activity;
mod escalation;
mod gating;

pub use activity::{ActivityTracker, RateLimitConfig};
pub use escalation::{
    compose_final_reply, extract_directives, is_urgent_content, sanitize_reply, EscalationConfig,
    ReplyDirectives, NO_RESPONSE_MARKER, PING_SUPPORT_MARKER,
};
pub use gating::{requires_response, GatingConfig};
