use async_trait::async_trait;
use chrono::NaiveDate;
use citewatch_common::{Doi, RetractionCache, RetractionRecord, RetractionSource, StoreError};
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
struct RetractionRow {
    doi: String,
    paper_title: Option<String>,
    retraction_date: Option<NaiveDate>,
    reason: Option<String>,
}

impl TryFrom<RetractionRow> for RetractionRecord {
    type Error = StoreError;

    /// Whatever wrote the row first, a hit served from here comes from the cache.
    fn try_from(row: RetractionRow) -> Result<Self, Self::Error> {
        let doi = Doi::parse(&row.doi)
            .ok_or_else(|| StoreError::Corrupt(format!("retractions_cache.doi {:?}", row.doi)))?;
        Ok(RetractionRecord {
            doi,
            paper_title: row.paper_title,
            retraction_date: row.retraction_date,
            reason: row.reason,
            source: RetractionSource::Cache,
        })
    }
}

pub struct PgRetractionCache {
    pool: PgPool,
}

impl PgRetractionCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RetractionCache for PgRetractionCache {
    async fn lookup(&self, doi: &Doi) -> Result<Option<RetractionRecord>, StoreError> {
        let row = sqlx::query_as::<_, RetractionRow>(
            r#"
            SELECT doi, paper_title, retraction_date, reason
            FROM retractions_cache
            WHERE doi = $1
            "#,
        )
        .bind(doi.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RetractionRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &RetractionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO retractions_cache (doi, paper_title, retraction_date, reason, origin)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (doi) DO UPDATE SET
                paper_title     = COALESCE(EXCLUDED.paper_title, retractions_cache.paper_title),
                retraction_date = COALESCE(EXCLUDED.retraction_date, retractions_cache.retraction_date),
                reason          = COALESCE(EXCLUDED.reason, retractions_cache.reason),
                fetched_at      = NOW()
            "#,
        )
        .bind(record.doi.as_str())
        .bind(&record.paper_title)
        .bind(record.retraction_date)
        .bind(&record.reason)
        .bind(record.source.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
