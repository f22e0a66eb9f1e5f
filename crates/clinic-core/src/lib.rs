//! Low-level helpers shared across clinic crates.
//!
//! Provides atomic state-file writes, versioned JSON loading and time utilities
//! used by the selected-unit store, unit snapshots and policy files.

pub mod atomic_io;
pub mod state_file;
pub mod time_utils;

pub use atomic_io::{write_json_atomic, write_text_atomic};
pub use state_file::{read_json_if_exists, read_versioned_json_if_exists};
pub use time_utils::current_unix_timestamp_ms;
