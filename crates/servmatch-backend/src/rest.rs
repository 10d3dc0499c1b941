use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use servmatch_core::{ProfessionalView, Quote, QuoteStatus, ServiceRequest};
use servmatch_normalize::{Normalizer, RawProfessional, RecordShape};
use tokio::sync::Semaphore;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::{
    Backend, BackendError, BucketKind, BucketRegistry, HttpClientConfig, QuoteRow, RequestRow,
};

const QUOTE_SELECT: &str = concat!(
    "id,request_id,professional_id,price,estimated_time,description,status,",
    "professional:professionals(id,name,profession,location,image,rating,reviews_count,",
    "verified,company_name,phone)"
);

/// PostgREST-style hosted backend (`/rest/v1/<table>`).
#[derive(Debug)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    buckets: BucketRegistry,
    in_flight: Arc<Semaphore>,
    normalizer: Normalizer,
}

impl RestBackend {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        access_token: Option<String>,
        buckets: BucketRegistry,
        config: HttpClientConfig,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token,
            buckets,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            normalizer: Normalizer::default(),
        })
    }

    pub fn buckets(&self) -> &BucketRegistry {
        &self.buckets
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| BackendError::Message("http client is shutting down".to_string()))?;
        let resp = self.authorized(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Relative storage paths become public bucket URLs; absolute URLs and
    /// site-local paths are kept.
    fn resolve_image(&self, view: &mut ProfessionalView) {
        if view.image.contains("://") || view.image.starts_with('/') {
            return;
        }
        view.image = self
            .buckets
            .public_object_url(&self.base_url, BucketKind::Avatars, &view.image);
    }
}

/// Total from a `Content-Range` header such as `0-0/12` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u32> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn fetch_user_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ServiceRequest>, BackendError> {
        let request = self.client.get(self.table_url("requests")).query(&[
            ("select", "id,title,description,date,location,status,timing".to_string()),
            ("user_id", format!("eq.{user_id}")),
        ]);
        let rows: Vec<RequestRow> = self
            .get_json(request)
            .instrument(info_span!(
                "backend_call",
                backend = "rest",
                op = "fetch_user_requests",
                %user_id
            ))
            .await?;
        Ok(rows.into_iter().map(ServiceRequest::from).collect())
    }

    async fn count_quotes_for_request(&self, request_id: Uuid) -> Result<u32, BackendError> {
        let request = self
            .client
            .get(self.table_url("quotes"))
            .query(&[("select", "id".to_string()), ("request_id", format!("eq.{request_id}"))])
            .header("Prefer", "count=exact")
            .header("Range-Unit", "items")
            .header("Range", "0-0");
        let resp = self
            .send(request)
            .instrument(info_span!(
                "backend_call",
                backend = "rest",
                op = "count_quotes",
                %request_id
            ))
            .await?;
        resp.headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| {
                BackendError::Message(format!(
                    "missing or malformed content-range counting quotes for {request_id}"
                ))
            })
    }

    async fn fetch_quotes_for_request(&self, request_id: Uuid) -> Result<Vec<Quote>, BackendError> {
        let request = self.client.get(self.table_url("quotes")).query(&[
            ("select", QUOTE_SELECT.to_string()),
            ("request_id", format!("eq.{request_id}")),
            ("order", "created_at.asc".to_string()),
        ]);
        let rows: Vec<QuoteRow> = self
            .get_json(request)
            .instrument(info_span!(
                "backend_call",
                backend = "rest",
                op = "fetch_quotes",
                %request_id
            ))
            .await?;
        rows.into_iter()
            .map(|row| {
                let mut quote = row.into_quote(RecordShape::QuoteEmbed, &self.normalizer)?;
                self.resolve_image(&mut quote.professional);
                Ok(quote)
            })
            .collect()
    }

    async fn check_if_accepted_quote_exists(&self, request_id: Uuid) -> Result<bool, BackendError> {
        let request = self.client.get(self.table_url("quotes")).query(&[
            ("select", "id".to_string()),
            ("request_id", format!("eq.{request_id}")),
            ("status", format!("eq.{}", QuoteStatus::Accepted)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<serde_json::Value> = self
            .get_json(request)
            .instrument(info_span!(
                "backend_call",
                backend = "rest",
                op = "check_accepted",
                %request_id
            ))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .patch(self.table_url("quotes"))
            .query(&[("id", format!("eq.{quote_id}"))])
            .header("Prefer", "return=representation")
            .json(&json!({ "status": status }));
        let rows: Vec<serde_json::Value> = self
            .get_json(request)
            .instrument(info_span!(
                "backend_call",
                backend = "rest",
                op = "update_quote_status",
                %quote_id,
                %status
            ))
            .await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound(format!("quote {quote_id}")));
        }
        Ok(())
    }

    async fn fetch_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalView>, BackendError> {
        let request = self.client.get(self.table_url("professionals")).query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{professional_id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<serde_json::Value> = self
            .get_json(request)
            .instrument(info_span!(
                "backend_call",
                backend = "rest",
                op = "fetch_professional",
                %professional_id
            ))
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let raw = RawProfessional::from_json(RecordShape::Directory, row)
            .map_err(|e| BackendError::InvalidRow(e.to_string()))?;
        let mut view = self.normalizer.normalize(&raw);
        self.resolve_image(&mut view);
        Ok(Some(view))
    }
}
