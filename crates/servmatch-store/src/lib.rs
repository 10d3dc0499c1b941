//! Request and quote state for a signed-in marketplace user.

mod notify;
mod quotes;
mod requests;

use std::sync::Arc;

use anyhow::Context;
use servmatch_backend::{Backend, BackendConfig, BackendError};
use servmatch_core::ProfessionalView;
use uuid::Uuid;

pub use notify::{Notice, NoticeBuffer, NoticeLevel, Notifier, TracingNotifier};
pub use quotes::{find_accepted, merge_quotes, QuoteStore};
pub use requests::{compare_requests, sort_requests, RequestStore};

pub const CRATE_NAME: &str = "servmatch-store";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("request {request_id} already has an accepted quote")]
    QuoteAlreadyAccepted { request_id: Uuid },
    #[error("quote {quote_id} is not loaded")]
    QuoteNotFound { quote_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub user_id: Option<Uuid>,
    pub web_port: u16,
}

impl StoreConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let user_id = match std::env::var("SERVMATCH_USER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("SERVMATCH_USER_ID is not a uuid: {raw}"))?,
            ),
            _ => None,
        };
        Ok(Self {
            backend: BackendConfig::from_env()?,
            user_id,
            web_port: std::env::var("SERVMATCH_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        })
    }
}

/// Both stores over one backend, as a single user sees them.
pub struct MarketplaceSession {
    backend: Arc<dyn Backend>,
    requests: RequestStore,
    quotes: QuoteStore,
}

impl MarketplaceSession {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_notifier(backend, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            requests: RequestStore::new(backend.clone()),
            quotes: QuoteStore::new(backend.clone()).with_notifier(notifier),
            backend,
        }
    }

    /// Connect the configured backend and sign in the configured user, if any.
    pub async fn from_config(
        config: &StoreConfig,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let backend = servmatch_backend::connect(&config.backend).await?;
        let mut session = Self::with_notifier(backend, notifier);
        if config.user_id.is_some() {
            session
                .requests
                .set_user(config.user_id)
                .await
                .context("loading requests for configured user")?;
        }
        Ok(session)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn requests(&self) -> &RequestStore {
        &self.requests
    }

    pub fn requests_mut(&mut self) -> &mut RequestStore {
        &mut self.requests
    }

    pub fn quotes(&self) -> &QuoteStore {
        &self.quotes
    }

    pub fn quotes_mut(&mut self) -> &mut QuoteStore {
        &mut self.quotes
    }

    pub async fn fetch_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<Option<ProfessionalView>, StoreError> {
        Ok(self.backend.fetch_professional(professional_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servmatch_backend::{Dataset, InMemoryBackend};

    #[tokio::test]
    async fn unknown_professional_is_none() {
        let session = MarketplaceSession::new(Arc::new(InMemoryBackend::new(Dataset::default())));
        assert_eq!(session.backend_name(), "memory");
        assert!(session.fetch_professional(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn store_error_messages_name_the_ids() {
        let id = Uuid::nil();
        let err = StoreError::QuoteAlreadyAccepted { request_id: id };
        assert!(err.to_string().contains(&id.to_string()));
    }
}
