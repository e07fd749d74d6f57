//! # Tracing Setup
//!
//! Structured logging for the whole process. Every actor log line carries `entity_type`
//! and `key`; the user actor adds `user_id` and `operation`, so filtering by user is a
//! field match rather than a text search.
//!
//! With `RUST_LOG=info` a status change reads:
//!
//! ```text
//! INFO set_status{user_id=42 status=Banned}: Operation succeeded user_id=42 operation="set_status"
//! ```
//!
//! With `RUST_LOG=debug` the pipeline stages show up as well:
//!
//! ```text
//! DEBUG Activating entity_type="UserActor" key=42
//! DEBUG Running step pipeline="set_status" step="load_cached_user"
//! DEBUG Running step pipeline="set_status" step="ensure_status_changed"
//! DEBUG Running step pipeline="set_status" step="persist_status"
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Falls back to `info` when `RUST_LOG` is unset.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false) // entity_type and user_id already say where a line came from
        .compact()
        .init();
}
