//! Poll transport
//!
//! Runs the lightweight projection and fingerprints the result. It never
//! retries and never touches engine state; the caller owns backoff.

use contracts::{ContractError, DatasetFingerprint, ProjectionQuery, Row, RowQuery};
use tracing::{instrument, trace};

use crate::error::{Result, TransportError};
use crate::fingerprint::fingerprint;

/// Result of one successful poll
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Rows ordered by `updated_at` descending
    pub rows: Vec<Row>,
    pub fingerprint: DatasetFingerprint,
}

/// Pull-based transport over a [`RowQuery`]
pub struct PollTransport<Q> {
    query: Q,
    projection: ProjectionQuery,
}

impl<Q: RowQuery> PollTransport<Q> {
    /// Poll `table`, fetching `columns` on top of `id`, `updated_at`, `name`
    pub fn new(query: Q, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            query,
            projection: ProjectionQuery::latest_first(table, columns),
        }
    }

    pub fn table(&self) -> &str {
        &self.projection.table
    }

    pub fn projection(&self) -> &ProjectionQuery {
        &self.projection
    }

    /// Run one poll
    ///
    /// # Errors
    /// `TransportError::Query` when the store read fails
    #[instrument(name = "poll_transport", skip(self), fields(table = %self.projection.table))]
    pub async fn poll(&self) -> Result<PollOutcome> {
        let rows = self
            .query
            .fetch(&self.projection)
            .await
            .map_err(|e| self.query_error(e))?;

        let fingerprint = fingerprint(&rows);
        trace!(rows = rows.len(), %fingerprint, "poll completed");

        Ok(PollOutcome { rows, fingerprint })
    }

    fn query_error(&self, err: ContractError) -> TransportError {
        match err {
            ContractError::Query { table, message } => TransportError::Query { table, message },
            other => TransportError::query(&self.projection.table, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTable;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_poll_orders_latest_first() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let table = MemoryTable::new("locations");
        table.upsert(Row::new(1u64, t0));
        table.upsert(Row::new(2u64, t0 + Duration::minutes(5)));

        let transport = PollTransport::new(table.clone(), "locations", vec![]);
        let outcome = transport.poll().await.unwrap();

        let ids: Vec<&str> = outcome.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(outcome.fingerprint, fingerprint(&outcome.rows));
    }

    #[tokio::test]
    async fn test_poll_is_stable_without_changes() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let table = MemoryTable::new("locations");
        table.upsert(Row::new(1u64, t0));

        let transport = PollTransport::new(table.clone(), "locations", vec![]);
        let first = transport.poll().await.unwrap();
        let second = transport.poll().await.unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[tokio::test]
    async fn test_poll_failure_is_returned_not_retried() {
        let table = MemoryTable::new("locations");
        table.fail_next_queries(1);

        let transport = PollTransport::new(table.clone(), "locations", vec![]);
        let err = transport.poll().await.unwrap_err();
        assert!(matches!(err, TransportError::Query { .. }));
        assert_eq!(table.query_count(), 1);

        // Next call succeeds on its own
        assert!(transport.poll().await.is_ok());
        assert_eq!(table.query_count(), 2);
    }

    #[tokio::test]
    async fn test_poll_projects_columns() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let table = MemoryTable::new("locations");
        table.upsert(
            Row::new(1u64, t0)
                .with_column("lat", 1.5)
                .with_column("internal_note", "x"),
        );

        let transport = PollTransport::new(table, "locations", vec!["lat".into()]);
        let outcome = transport.poll().await.unwrap();
        assert!(outcome.rows[0].columns.contains_key("lat"));
        assert!(!outcome.rows[0].columns.contains_key("internal_note"));
    }
}
