//! Correlation ids for rows the server has not created yet.
//!
//! A temp id is only meaningful inside one save attempt: it lets a later operation
//! (or the caller) refer to "the row I am about to create" until the response maps it
//! to a real numeric id. Ids are unique within a process run, not globally.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every generated id starts with this marker.
pub const TEMP_ID_PREFIX: &str = "temp_";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `temp_{prefix}_{unix millis}_{sequence}{random}`.
///
/// The per-process sequence makes ids unique even when two are generated within the
/// same millisecond; the random suffix keeps them from looking sequential across runs.
pub fn generate_temp_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    let prefix = prefix.trim_matches('_');
    if prefix.is_empty() {
        format!("{TEMP_ID_PREFIX}{millis}_{seq}{suffix}")
    } else {
        format!("{TEMP_ID_PREFIX}{prefix}_{millis}_{seq}{suffix}")
    }
}

pub fn is_temp_id(id: &str) -> bool {
    id.len() > TEMP_ID_PREFIX.len() && id.starts_with(TEMP_ID_PREFIX)
}
