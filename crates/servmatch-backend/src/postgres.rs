use async_trait::async_trait;
use chrono::NaiveDate;
use servmatch_core::{ProfessionalView, Quote, QuoteStatus, RequestStatus, ServiceRequest};
use servmatch_normalize::{Normalizer, RawProfessional, RecordShape};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::{Backend, BackendError, QuoteRow};

/// Direct connection to the hosted Postgres database.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
    normalizer: Normalizer,
}

impl PgBackend {
    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            normalizer: Normalizer::default(),
        }
    }
}

fn request_from_row(row: &PgRow) -> Result<ServiceRequest, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let description: Option<String> = row.try_get("description")?;
    let location: Option<String> = row.try_get("location")?;
    let date: NaiveDate = row.try_get("date")?;
    Ok(ServiceRequest {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: description.unwrap_or_default(),
        date,
        location: location.unwrap_or_default(),
        status: RequestStatus::from(status),
        quotes_count: 0,
        timing: row.try_get("timing")?,
    })
}

fn quote_row_from_row(row: &PgRow) -> Result<QuoteRow, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(QuoteRow {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        professional_id: row.try_get("professional_id")?,
        price: row.try_get("price")?,
        estimated_time: row.try_get("estimated_time")?,
        description: row.try_get("description")?,
        status: QuoteStatus::from(status),
        professional: row.try_get("professional")?,
    })
}

#[async_trait]
impl Backend for PgBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_user_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ServiceRequest>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, date, location, status, timing
              FROM requests
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .instrument(info_span!(
            "backend_call",
            backend = "postgres",
            op = "fetch_user_requests",
            %user_id
        ))
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(request_from_row(row)?);
        }
        Ok(out)
    }

    async fn count_quotes_for_request(&self, request_id: Uuid) -> Result<u32, BackendError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotes WHERE request_id = $1")
            .bind(request_id)
            .fetch_one(&self.pool)
            .instrument(info_span!(
                "backend_call",
                backend = "postgres",
                op = "count_quotes",
                %request_id
            ))
            .await?;
        u32::try_from(count)
            .map_err(|_| BackendError::InvalidRow(format!("quote count {count} out of range")))
    }

    async fn fetch_quotes_for_request(&self, request_id: Uuid) -> Result<Vec<Quote>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT q.id,
                   q.request_id,
                   q.professional_id,
                   q.price::float8 AS price,
                   q.estimated_time,
                   q.description,
                   q.status,
                   to_jsonb(p) AS professional
              FROM quotes q
              LEFT JOIN professionals p ON p.id = q.professional_id
             WHERE q.request_id = $1
             ORDER BY q.created_at
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .instrument(info_span!(
            "backend_call",
            backend = "postgres",
            op = "fetch_quotes",
            %request_id
        ))
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let quote_row = quote_row_from_row(row)?;
            out.push(quote_row.into_quote(RecordShape::Directory, &self.normalizer)?);
        }
        Ok(out)
    }

    async fn check_if_accepted_quote_exists(&self, request_id: Uuid) -> Result<bool, BackendError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM quotes WHERE request_id = $1 AND status = 'accepted')",
        )
        .bind(request_id)
        .fetch_one(&self.pool)
        .instrument(info_span!(
            "backend_call",
            backend = "postgres",
            op = "check_accepted",
            %request_id
        ))
        .await?;
        Ok(exists)
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<(), BackendError> {
        let result = sqlx::query("UPDATE quotes SET status = $2 WHERE id = $1")
            .bind(quote_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .instrument(info_span!(
                "backend_call",
                backend = "postgres",
                op = "update_quote_status",
                %quote_id,
                %status
            ))
            .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(format!("quote {quote_id}")));
        }
        Ok(())
    }

    async fn fetch_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalView>, BackendError> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT to_jsonb(p) FROM professionals p WHERE p.id = $1")
                .bind(professional_id)
                .fetch_optional(&self.pool)
                .instrument(info_span!(
                    "backend_call",
                    backend = "postgres",
                    op = "fetch_professional",
                    %professional_id
                ))
                .await?;
        let Some(value) = value else {
            return Ok(None);
        };
        let raw = RawProfessional::from_json(RecordShape::Directory, value)
            .map_err(|e| BackendError::InvalidRow(e.to_string()))?;
        Ok(Some(self.normalizer.normalize(&raw)))
    }
}
