//! Foundational low-level utilities shared across Kiln crates.
//!
//! Provides the atomic file-write helper used by the conversation snapshot
//! store and the Unix-time utilities used by rate-limit bookkeeping.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;

    #[test]
    fn timestamp_units_agree() {
        let now_s = current_unix_timestamp();
        let now_ms = current_unix_timestamp_ms();
        let now_ms_s = now_ms / 1_000;
        assert!(now_ms_s >= now_s);
        assert!(now_ms_s <= now_s.saturating_add(1));
    }

    #[test]
    fn write_text_atomic_writes_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("snapshot.json");
        write_text_atomic(&path, "{}").expect("write");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "{}");
    }

    #[test]
    fn write_text_atomic_creates_missing_parent_dirs() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("data").join("nested").join("doc.json");
        write_text_atomic(&path, "ok").expect("write");
        assert_eq!(read_to_string(&path).expect("read"), "ok");
    }
}
