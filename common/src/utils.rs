// Common Crate - utils.rs
// common/src/utils.rs
use std::str::FromStr;

use chrono::Utc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// Setup tracing for consistent logging across services
pub fn setup_tracing(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already installed");
    }
}

/// Fresh correlation id for a request or response message
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique_uuids() {
        let a = new_correlation_id();
        let b = new_correlation_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
