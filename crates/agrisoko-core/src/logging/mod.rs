//! Structured logging to per-instance JSONL files.
//!
//! Console output goes through `tracing_subscriber::fmt`. When a log
//! directory is configured, every event is also appended as one JSON object
//! per line, so several client instances (a farmer and a customer on the
//! same machine, say) can log side by side without sharing a file.
//!
//! ```text
//! <log-dir>/
//! └── raw/
//!     ├── 2026-10-19_farmer.jsonl
//!     └── 2026-10-19_customer.jsonl
//! ```
//!
//! ```bash
//! # Every discarded resolution
//! jq 'select(.msg == "Discarding stale resolution")' logs/raw/*.jsonl
//! ```

mod entry;
mod layer;
mod writer;

pub use entry::LogEntry;
pub use layer::{JsonlLayer, LoggingBuilder};
pub use writer::{read_entries, InstanceLogWriter};
