//! Workspace-level end-to-end tests for the Kiln session runtime live under
//! `tests/`; this library target is intentionally empty.
