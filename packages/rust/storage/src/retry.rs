//! Persistence error classification and bounded retry.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use briefwire_shared::{BriefwireError, PersistenceErrorKind, Result};
use tracing::warn;

/// Attempts per operation, including the first.
pub const MAX_ATTEMPTS: u32 = 4;

/// Backoff grows linearly: `BACKOFF_STEP * attempt`.
pub const BACKOFF_STEP: Duration = Duration::from_millis(80);

const TRANSIENT_MARKERS: &[&str] = &[
    "deadlock",
    "could not serialize",
    "serialization failure",
    "lock timeout",
    "database is locked",
    "database table is locked",
    "database is busy",
    "sqlite_busy",
];

const DRIFT_MARKERS: &[&str] = &["no such column", "has no column named"];

/// Classify a driver error message.
pub fn classify_persistence_error(message: &str) -> PersistenceErrorKind {
    let lower = message.to_ascii_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return PersistenceErrorKind::Transient;
    }
    let column_missing = lower.contains("column") && lower.contains("does not exist");
    if column_missing || DRIFT_MARKERS.iter().any(|m| lower.contains(m)) {
        return PersistenceErrorKind::SchemaDrift;
    }
    PersistenceErrorKind::Fatal
}

/// Run `op` until it succeeds, a non-transient error occurs, or
/// [`MAX_ATTEMPTS`] is reached. Failures come back as
/// [`BriefwireError::Persistence`] tagged with `operation`.
pub async fn with_retry<T, E, F, Fut>(operation: &str, mut op: F) -> Result<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let message = e.to_string();
                let kind = classify_persistence_error(&message);
                if kind != PersistenceErrorKind::Transient || attempt >= MAX_ATTEMPTS {
                    return Err(BriefwireError::persistence(operation, kind, message));
                }
                let delay = BACKOFF_STEP * attempt;
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %message,
                    "transient persistence error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn classification() {
        use PersistenceErrorKind::*;
        assert_eq!(classify_persistence_error("SQLite failure: `database is locked`"), Transient);
        assert_eq!(classify_persistence_error("deadlock detected"), Transient);
        assert_eq!(
            classify_persistence_error("could not serialize access due to concurrent update"),
            Transient
        );
        assert_eq!(classify_persistence_error("Lock timeout exceeded"), Transient);
        assert_eq!(
            classify_persistence_error("table articles has no column named mission_tags"),
            SchemaDrift
        );
        assert_eq!(classify_persistence_error("no such column: track"), SchemaDrift);
        assert_eq!(
            classify_persistence_error(r#"column "track" of relation "articles" does not exist"#),
            SchemaDrift
        );
        assert_eq!(classify_persistence_error("UNIQUE constraint failed"), Fatal);
    }

    #[tokio::test]
    async fn transient_failures_retry_until_success() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result = with_retry("upsert_articles", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= 2 {
                Err("database is locked".to_string())
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_fails_after_one_attempt() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<()> = with_retry("save_content", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("UNIQUE constraint failed: articles.url")
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(err.persistence_kind(), Some(PersistenceErrorKind::Fatal));
        assert!(err.to_string().starts_with("save_content failed"));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: Result<()> = with_retry("prune_orphan_topics", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("database is locked")
        })
        .await;
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_ATTEMPTS);
        assert_eq!(
            result.unwrap_err().persistence_kind(),
            Some(PersistenceErrorKind::Transient)
        );
    }
}
