use async_trait::async_trait;
use citewatch_common::{FindingRepository, NewFinding, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgFindingStore {
    pool: PgPool,
}

impl PgFindingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FindingRepository for PgFindingStore {
    async fn insert(&self, finding: &NewFinding) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO findings (citation_id, article_title, problem_type, severity, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(finding.citation_id)
        .bind(&finding.article_title)
        .bind(finding.problem_type.as_str())
        .bind(finding.severity.to_string())
        .bind(&finding.details)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}
