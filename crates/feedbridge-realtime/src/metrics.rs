//! Metric names recorded by the realtime bridge.

/// Push connect attempts (counter).
pub const PUSH_CONNECT_ATTEMPTS_TOTAL: &str = "push_connect_attempts_total";
/// Failed push connect attempts (counter).
pub const PUSH_CONNECT_FAILURES_TOTAL: &str = "push_connect_failures_total";
/// Established push connections that were lost (counter).
pub const PUSH_DISCONNECTS_TOTAL: &str = "push_disconnects_total";
/// Running push sessions (gauge).
pub const PUSH_SESSIONS_ACTIVE: &str = "push_sessions_active";
/// Push events received (counter, labels: event).
pub const PUSH_EVENTS_TOTAL: &str = "push_events_total";
/// Frames or events that failed to decode (counter).
pub const PUSH_DECODE_FAILURES_TOTAL: &str = "push_decode_failures_total";
/// Routed events by outcome (counter, labels: outcome).
pub const EVENTS_ROUTED_TOTAL: &str = "events_routed_total";
/// Routed events dropped on error (counter, labels: category).
pub const EVENTS_FAILED_TOTAL: &str = "events_failed_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_snake_case() {
        for name in [
            PUSH_CONNECT_ATTEMPTS_TOTAL,
            PUSH_CONNECT_FAILURES_TOTAL,
            PUSH_DISCONNECTS_TOTAL,
            PUSH_SESSIONS_ACTIVE,
            PUSH_EVENTS_TOTAL,
            PUSH_DECODE_FAILURES_TOTAL,
            EVENTS_ROUTED_TOTAL,
            EVENTS_FAILED_TOTAL,
        ] {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
