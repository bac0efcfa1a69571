//! services/api/src/adapters/mod.rs
//!
//! Concrete implementations of the core ports: PostgreSQL and in-memory
//! persistence, SMTP email, HTTP blob storage and the OpenAI skill helpers.

pub mod db;
pub mod mailer;
pub mod memory;
pub mod skills_llm;
pub mod storage;

use campus_core::ports::{PortError, PortResult};
use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Start and end of the fixed rate-limit window containing `now`.
pub fn window_bounds(
    now: DateTime<Utc>,
    window: Duration,
) -> PortResult<(DateTime<Utc>, DateTime<Utc>)> {
    let width = window.as_secs() as i64;
    if width <= 0 {
        return Err(PortError::Unexpected("rate limit window must be at least one second".to_string()));
    }
    let start_secs = now.timestamp() - now.timestamp().rem_euclid(width);
    let start = Utc
        .timestamp_opt(start_secs, 0)
        .single()
        .ok_or_else(|| PortError::Unexpected(format!("invalid window start {}", start_secs)))?;
    Ok((start, start + chrono::Duration::seconds(width)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_aligned_to_their_width() {
        let now = Utc.timestamp_opt(1_700_000_075, 0).unwrap();
        let (start, end) = window_bounds(now, Duration::from_secs(60)).unwrap();
        assert_eq!(start.timestamp(), 1_700_000_040);
        assert_eq!(end.timestamp(), 1_700_000_100);
    }

    #[test]
    fn sub_second_windows_are_rejected() {
        assert!(window_bounds(Utc::now(), Duration::from_millis(10)).is_err());
    }
}
