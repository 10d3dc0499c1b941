use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use servmatch_core::{ProfessionalView, Quote, QuoteStatus, RequestStatus, ServiceRequest};
use servmatch_normalize::{DirectoryRow, EmbeddedProfessionalRow, Normalizer, RawProfessional};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{Backend, BackendError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    pub location: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub timing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuote {
    pub id: Uuid,
    pub request_id: Uuid,
    pub professional_id: Uuid,
    pub price: f64,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub description: String,
    pub status: QuoteStatus,
}

/// Tables held by [`InMemoryBackend`], in the JSON layout of `fixtures/demo.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub requests: Vec<StoredRequest>,
    #[serde(default)]
    pub professionals: Vec<DirectoryRow>,
    #[serde(default)]
    pub quotes: Vec<StoredQuote>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_requests: bool,
    failing_counts: HashSet<Uuid>,
    failing_quotes: HashSet<Uuid>,
    count_delays: HashMap<Uuid, Duration>,
}

/// Fixture-backed backend for local runs and tests, with fault injection.
#[derive(Debug)]
pub struct InMemoryBackend {
    data: RwLock<Dataset>,
    faults: RwLock<Faults>,
    normalizer: Normalizer,
}

impl InMemoryBackend {
    pub fn new(data: Dataset) -> Self {
        Self::with_normalizer(data, Normalizer::default())
    }

    pub fn with_normalizer(data: Dataset, normalizer: Normalizer) -> Self {
        Self {
            data: RwLock::new(data),
            faults: RwLock::new(Faults::default()),
            normalizer,
        }
    }

    pub fn from_fixture_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let data: Dataset = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self::new(data))
    }

    pub async fn fail_requests(&self, fail: bool) {
        self.faults.write().await.fail_requests = fail;
    }

    pub async fn fail_count_for(&self, request_id: Uuid) {
        self.faults.write().await.failing_counts.insert(request_id);
    }

    pub async fn fail_quotes_for(&self, request_id: Uuid) {
        self.faults.write().await.failing_quotes.insert(request_id);
    }

    pub async fn delay_count_for(&self, request_id: Uuid, delay: Duration) {
        self.faults.write().await.count_delays.insert(request_id, delay);
    }

    /// Clears every injected fault and delay.
    pub async fn heal(&self) {
        *self.faults.write().await = Faults::default();
    }

    pub async fn insert_quote(&self, quote: StoredQuote) {
        self.data.write().await.quotes.push(quote);
    }

    fn professional_record(data: &Dataset, professional_id: Uuid) -> RawProfessional {
        data.professionals
            .iter()
            .find(|p| p.id == professional_id)
            .cloned()
            .map(RawProfessional::Directory)
            .unwrap_or_else(|| {
                RawProfessional::QuoteEmbed(EmbeddedProfessionalRow::bare(professional_id))
            })
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_user_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ServiceRequest>, BackendError> {
        if self.faults.read().await.fail_requests {
            return Err(BackendError::Message("injected failure fetching requests".to_string()));
        }
        let data = self.data.read().await;
        Ok(data
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| ServiceRequest {
                id: r.id,
                title: r.title.clone(),
                description: r.description.clone(),
                date: r.date,
                location: r.location.clone(),
                status: r.status.clone(),
                quotes_count: 0,
                timing: r.timing.clone(),
            })
            .collect())
    }

    async fn count_quotes_for_request(&self, request_id: Uuid) -> Result<u32, BackendError> {
        let (failing, delay) = {
            let faults = self.faults.read().await;
            (
                faults.failing_counts.contains(&request_id),
                faults.count_delays.get(&request_id).copied(),
            )
        };
        if let Some(delay) = delay {
            debug!(%request_id, ?delay, "delaying quote count");
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(BackendError::Message(format!(
                "injected failure counting quotes for {request_id}"
            )));
        }
        let data = self.data.read().await;
        let count = data.quotes.iter().filter(|q| q.request_id == request_id).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn fetch_quotes_for_request(&self, request_id: Uuid) -> Result<Vec<Quote>, BackendError> {
        if self.faults.read().await.failing_quotes.contains(&request_id) {
            return Err(BackendError::Message(format!(
                "injected failure fetching quotes for {request_id}"
            )));
        }
        let data = self.data.read().await;
        Ok(data
            .quotes
            .iter()
            .filter(|q| q.request_id == request_id)
            .map(|q| Quote {
                id: q.id,
                request_id: q.request_id,
                professional: self
                    .normalizer
                    .normalize(&Self::professional_record(&data, q.professional_id)),
                price: q.price,
                estimated_time: q.estimated_time.clone(),
                description: q.description.clone(),
                status: q.status.clone(),
            })
            .collect())
    }

    async fn check_if_accepted_quote_exists(&self, request_id: Uuid) -> Result<bool, BackendError> {
        let data = self.data.read().await;
        Ok(data
            .quotes
            .iter()
            .any(|q| q.request_id == request_id && q.status.is_accepted()))
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: QuoteStatus,
    ) -> Result<(), BackendError> {
        let mut data = self.data.write().await;
        let quote = data
            .quotes
            .iter_mut()
            .find(|q| q.id == quote_id)
            .ok_or_else(|| BackendError::NotFound(format!("quote {quote_id}")))?;
        quote.status = status;
        Ok(())
    }

    async fn fetch_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalView>, BackendError> {
        let data = self.data.read().await;
        Ok(data
            .professionals
            .iter()
            .find(|p| p.id == professional_id)
            .map(|row| self.normalizer.normalize(&RawProfessional::Directory(row.clone()))))
    }
}
