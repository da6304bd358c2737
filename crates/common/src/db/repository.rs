//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

/// Fields of a paper known before it is persisted
#[derive(Debug, Clone, Default)]
pub struct NewPaper {
    pub title: String,
    pub doi: Option<String>,
    pub file: Option<String>,
    pub topic: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub citation: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open a write transaction; dropping it without commit rolls back
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        self.write_conn().begin().await.map_err(Into::into)
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Insert a paper on the given connection or transaction
    pub async fn insert_paper<C: ConnectionTrait>(&self, conn: &C, new: NewPaper) -> Result<Paper> {
        let now = chrono::Utc::now();

        let paper = PaperActiveModel {
            id: NotSet,
            title: Set(new.title),
            doi: Set(new.doi),
            file: Set(new.file),
            uploaded_at: Set(now.into()),
            topic: Set(new.topic),
            summary: Set(new.summary),
            audio: Set(None),
            source_url: Set(new.source_url),
            citation: Set(new.citation),
        };

        paper.insert(conn).await.map_err(Into::into)
    }

    /// Record the narration path of a paper
    pub async fn attach_audio<C: ConnectionTrait>(
        &self,
        conn: &C,
        paper: Paper,
        audio: String,
    ) -> Result<Paper> {
        let mut active = paper.into_active_model();
        active.audio = Set(Some(audio));

        active.update(conn).await.map_err(Into::into)
    }

    /// Find paper by ID
    pub async fn find_paper_by_id(&self, id: i32) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List every paper in creation order
    pub async fn list_papers(&self) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .order_by_asc(PaperColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Count stored papers
    pub async fn count_papers(&self) -> Result<u64> {
        PaperEntity::find()
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Papers classified under `topic` that carry a summary
    pub async fn find_papers_by_topic(&self, topic: &str) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::Topic.eq(topic))
            .filter(PaperColumn::Summary.is_not_null())
            .order_by_asc(PaperColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
