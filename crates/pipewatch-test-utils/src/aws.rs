//! AWS test utilities

use chrono::Utc;
use pipewatch_common::defaults::DEFAULT_REGION;

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-east-1
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| DEFAULT_REGION.to_string())
}

/// Unique name for a resource that must not exist.
///
/// Format: `pipewatch-test-{prefix}-{timestamp_ms}-{counter}`
pub fn test_resource_name(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("pipewatch-test-{prefix}-{ts}-{counter}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_names_unique() {
        let a = test_resource_name("repo");
        let b = test_resource_name("repo");
        assert!(a.starts_with("pipewatch-test-repo-"));
        assert_ne!(a, b);
    }
}
