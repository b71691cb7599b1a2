use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use citewatch_common::{Citation, CitationFilter, CitationRepository, Snapshot, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

const CITATION_COLUMNS: &str = "id, article_title, article_language, ordinal, \
    source_url, source_doi, source_title, source_authors, source_journal, source_year, \
    snapshot_url, snapshot_date, last_checked, created_at";

/// SQL predicate equivalent to `CitationFilter::matches`.
fn filter_clause(filter: CitationFilter) -> &'static str {
    match filter {
        CitationFilter::HasUrl => "source_url IS NOT NULL",
        CitationFilter::HasDoi => "source_doi IS NOT NULL",
        CitationFilter::HasSnapshot => "source_url IS NOT NULL AND snapshot_url IS NOT NULL",
    }
}

fn due_query(filter: CitationFilter) -> String {
    format!(
        r#"
        SELECT {CITATION_COLUMNS}
        FROM citations
        WHERE {}
          AND (last_checked IS NULL OR last_checked < $1)
        ORDER BY last_checked ASC NULLS FIRST, created_at ASC
        LIMIT $2
        "#,
        filter_clause(filter)
    )
}

pub struct PgCitationStore {
    pool: PgPool,
}

impl PgCitationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CitationRepository for PgCitationStore {
    async fn citations_due(
        &self,
        filter: CitationFilter,
        staleness: Duration,
        limit: u32,
    ) -> Result<Vec<Citation>, StoreError> {
        let cutoff = Utc::now() - staleness;
        let sql = due_query(filter);
        let rows = sqlx::query_as::<_, Citation>(&sql)
            .bind(cutoff)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn citations_with_doi(&self) -> Result<Vec<Citation>, StoreError> {
        let sql = format!(
            "SELECT {CITATION_COLUMNS} FROM citations WHERE source_doi IS NOT NULL ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, Citation>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn snapshot_for(&self, citation_id: Uuid) -> Result<Option<Snapshot>, StoreError> {
        let row = sqlx::query_as::<_, (Option<String>, Option<DateTime<Utc>>)>(
            "SELECT snapshot_url, snapshot_date FROM citations WHERE id = $1",
        )
        .bind(citation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(url, captured_at)| {
            url.map(|archive_url| Snapshot {
                citation_id,
                archive_url,
                captured_at,
            })
        }))
    }

    async fn attach_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        sqlx::query("UPDATE citations SET snapshot_url = $2, snapshot_date = $3 WHERE id = $1")
            .bind(snapshot.citation_id)
            .bind(&snapshot.archive_url)
            .bind(snapshot.captured_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_checked(&self, citation_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE citations SET last_checked = NOW() WHERE id = $1")
            .bind(citation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_filter_requires_url_and_snapshot() {
        let sql = due_query(CitationFilter::HasSnapshot);
        assert!(sql.contains("source_url IS NOT NULL AND snapshot_url IS NOT NULL"));
    }

    #[test]
    fn due_query_orders_never_checked_first() {
        let sql = due_query(CitationFilter::HasUrl);
        assert!(sql.contains("last_checked IS NULL OR last_checked < $1"));
        assert!(sql.contains("ORDER BY last_checked ASC NULLS FIRST, created_at ASC"));
        assert!(sql.contains("LIMIT $2"));
    }

    #[test]
    fn doi_filter_only_checks_doi() {
        assert_eq!(filter_clause(CitationFilter::HasDoi), "source_doi IS NOT NULL");
    }
}
