use async_trait::async_trait;
use czrpay_types::{BlockHeight, MatchId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::store::{CommitRecord, SettlementStore, StateTransition, StoreError};

// ═══════════════════════════════════════════════════════════════════════════
// SQLITE STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `db_path`
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        // Each connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), StoreError> {
        for migration in [
            include_str!("../migrations/001_create_commits.sql"),
            include_str!("../migrations/002_create_transitions.sql"),
            include_str!("../migrations/003_index_transitions.sql"),
        ] {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        }

        Ok(())
    }

    fn row_to_transition(row: &SqliteRow) -> Result<StateTransition, StoreError> {
        Ok(StateTransition {
            match_id: parse_match_id(row.get("match_id"))?,
            from: row.get::<String, _>("from_state").parse()?,
            to: row.get::<String, _>("to_state").parse()?,
            height: row.get::<i64, _>("height") as u64,
            timestamp: row.get::<i64, _>("timestamp") as u64,
            details: row.get("details"),
            tx_hash: row.get("tx_hash"),
        })
    }
}

#[async_trait]
impl SettlementStore for SqliteStore {
    async fn record_commit(
        &self,
        match_id: &MatchId,
        height: BlockHeight,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO settlement_commits (match_id, height, committed_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(match_id.as_str())
        .bind(height as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn list_commits(&self) -> Result<Vec<CommitRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT match_id, height, committed_at FROM settlement_commits ORDER BY committed_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(CommitRecord {
                    match_id: parse_match_id(row.get("match_id"))?,
                    height: row.get::<i64, _>("height") as u64,
                    committed_at: row.get::<i64, _>("committed_at") as u64,
                })
            })
            .collect()
    }

    async fn record_transition(&self, transition: StateTransition) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settlement_transitions (
                match_id, from_state, to_state, height, timestamp, details, tx_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transition.match_id.as_str())
        .bind(transition.from.as_str())
        .bind(transition.to.as_str())
        .bind(transition.height as i64)
        .bind(transition.timestamp as i64)
        .bind(&transition.details)
        .bind(&transition.tx_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn history(&self, match_id: &MatchId) -> Result<Vec<StateTransition>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM settlement_transitions WHERE match_id = ? ORDER BY id ASC",
        )
        .bind(match_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.iter().map(Self::row_to_transition).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

fn parse_match_id(raw: String) -> Result<MatchId, StoreError> {
    raw.parse()
        .map_err(|e: czrpay_types::TypeError| StoreError::SerializationError(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SettlementState;

    #[tokio::test]
    async fn test_sqlite_record_commit_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = MatchId::from_legs("aa", "bb");

        store.record_commit(&id, 100).await.unwrap();
        store.record_commit(&id, 101).await.unwrap();
        store
            .record_commit(&MatchId::from_legs("cc", "dd"), 102)
            .await
            .unwrap();

        let commits = store.list_commits().await.unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].match_id, id);
        assert_eq!(commits[0].height, 100);
    }

    #[tokio::test]
    async fn test_sqlite_history() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = MatchId::from_legs("aa", "bb");

        store
            .record_transition(
                StateTransition::new(
                    id.clone(),
                    SettlementState::Waiting,
                    SettlementState::Broadcasting,
                    110,
                )
                .with_details("manual"),
            )
            .await
            .unwrap();
        store
            .record_transition(
                StateTransition::new(
                    id.clone(),
                    SettlementState::Broadcasting,
                    SettlementState::BroadcastFailed,
                    110,
                )
                .with_details("node unreachable"),
            )
            .await
            .unwrap();

        let history = store.history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, SettlementState::Waiting);
        assert_eq!(history[0].details.as_deref(), Some("manual"));
        assert_eq!(history[1].to, SettlementState::BroadcastFailed);
        assert_eq!(history[1].height, 110);
        assert!(history[1].tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settlements.db");
        let id = MatchId::from_legs("aa", "bb");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store.record_commit(&id, 100).await.unwrap();
        }

        let reopened = SqliteStore::new(&path).await.unwrap();
        let commits = reopened.list_commits().await.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].match_id, id);
    }
}
