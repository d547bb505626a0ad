//! Usage analytics — append-only event log for LLM executions.
//!
//! One row per actual LLM attempt, success or failure. Payload-only and
//! preview requests never log here. Writes are fire-and-append: execution
//! outcome does not depend on the event insert, but a failed insert is
//! surfaced in the logs.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One execution's outcome.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub endpoint_id: Uuid,
    pub success: bool,
    pub error_message: Option<String>,
    pub tokens_input: Option<i64>,
    pub tokens_output: Option<i64>,
    pub latency_ms: Option<i64>,
    /// Integer cost column; see `pricing::to_stored_cents`.
    pub estimated_cost_cents: Option<i64>,
    /// Free-form context, e.g. which provider and model served the call.
    pub metadata: Option<Value>,
}

impl UsageEvent {
    #[must_use]
    pub fn success(endpoint_id: Uuid, tokens_input: i64, tokens_output: i64, latency_ms: i64, cost_cents: i64) -> Self {
        Self {
            endpoint_id,
            success: true,
            error_message: None,
            tokens_input: Some(tokens_input),
            tokens_output: Some(tokens_output),
            latency_ms: Some(latency_ms),
            estimated_cost_cents: Some(cost_cents),
            metadata: None,
        }
    }

    #[must_use]
    pub fn failure(endpoint_id: Uuid, error_message: String, latency_ms: Option<i64>) -> Self {
        Self {
            endpoint_id,
            success: false,
            error_message: Some(error_message),
            tokens_input: None,
            tokens_output: None,
            latency_ms,
            estimated_cost_cents: None,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Stored event row, as listed back to the endpoint owner.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageEventRow {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub success: bool,
    pub error_message: Option<String>,
    pub tokens_input: Option<i64>,
    pub tokens_output: Option<i64>,
    pub latency_ms: Option<i64>,
    pub estimated_cost_cents: Option<i64>,
    pub metadata: Option<Value>,
}

/// Append one event.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn record_event(pool: &PgPool, event: &UsageEvent) -> Result<(), AnalyticsError> {
    sqlx::query(
        "INSERT INTO usage_events
             (id, endpoint_id, success, error_message, tokens_input, tokens_output,
              latency_ms, estimated_cost_cents, metadata)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(Uuid::new_v4())
    .bind(event.endpoint_id)
    .bind(event.success)
    .bind(&event.error_message)
    .bind(event.tokens_input)
    .bind(event.tokens_output)
    .bind(event.latency_ms)
    .bind(event.estimated_cost_cents)
    .bind(&event.metadata)
    .execute(pool)
    .await?;
    Ok(())
}

/// List an endpoint's most recent events, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_events(pool: &PgPool, endpoint_id: Uuid, limit: i64) -> Result<Vec<UsageEventRow>, AnalyticsError> {
    let rows = sqlx::query_as::<
        _,
        (Uuid, bool, Option<String>, Option<i64>, Option<i64>, Option<i64>, Option<i64>, Option<Value>),
    >(
        "SELECT id, success, error_message, tokens_input, tokens_output, latency_ms, estimated_cost_cents, metadata
         FROM usage_events
         WHERE endpoint_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(endpoint_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, success, error_message, tokens_input, tokens_output, latency_ms, estimated_cost_cents, metadata)| {
                UsageEventRow {
                    id,
                    endpoint_id,
                    success,
                    error_message,
                    tokens_input,
                    tokens_output,
                    latency_ms,
                    estimated_cost_cents,
                    metadata,
                }
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_event_carries_counters_and_no_error() {
        let event = UsageEvent::success(Uuid::new_v4(), 120, 45, 900, 15);
        assert!(event.success);
        assert_eq!(event.tokens_input, Some(120));
        assert_eq!(event.estimated_cost_cents, Some(15));
        assert!(event.error_message.is_none());
    }

    #[test]
    fn failure_event_carries_error_and_partial_latency() {
        let event = UsageEvent::failure(Uuid::new_v4(), "LLM processing failed".into(), Some(300));
        assert!(!event.success);
        assert_eq!(event.error_message.as_deref(), Some("LLM processing failed"));
        assert_eq!(event.latency_ms, Some(300));
        assert!(event.tokens_input.is_none());
    }
}
