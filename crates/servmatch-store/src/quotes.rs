use std::sync::Arc;

use servmatch_backend::Backend;
use servmatch_core::{Quote, QuoteStatus};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::StoreError;

/// Quotes held for every other request, followed by the fresh batch for
/// `request_id`. The refreshed request's quotes are replaced wholesale.
pub fn merge_quotes(existing: Vec<Quote>, request_id: Uuid, fresh: Vec<Quote>) -> Vec<Quote> {
    let mut merged = existing
        .into_iter()
        .filter(|q| q.request_id != request_id)
        .collect::<Vec<_>>();
    merged.extend(fresh);
    merged
}

pub fn find_accepted(quotes: &[Quote]) -> Option<Uuid> {
    quotes.iter().find(|q| q.status.is_accepted()).map(|q| q.id)
}

/// Quotes for the requests the user has looked at, keyed by request id.
pub struct QuoteStore {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    selected_request_id: Option<Uuid>,
    quotes: Vec<Quote>,
    last_accepted_quote_id: Option<Uuid>,
}

impl QuoteStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            notifier: Arc::new(TracingNotifier),
            selected_request_id: None,
            quotes: Vec::new(),
            last_accepted_quote_id: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn quotes_for(&self, request_id: Uuid) -> impl Iterator<Item = &Quote> {
        self.quotes.iter().filter(move |q| q.request_id == request_id)
    }

    /// Most recently observed accepted quote. Not cleared when a later
    /// refresh finds none, so it may belong to a previously viewed request.
    pub fn last_accepted_quote_id(&self) -> Option<Uuid> {
        self.last_accepted_quote_id
    }

    pub fn selected_request_id(&self) -> Option<Uuid> {
        self.selected_request_id
    }

    /// Replace the held quotes for one request with a fresh fetch.
    ///
    /// A missing or nil id is a logged no-op. On fetch failure the user is
    /// notified and the request's previously held quotes are dropped.
    pub async fn refresh_quotes(&mut self, request_id: Option<Uuid>) -> Result<(), StoreError> {
        let Some(request_id) = request_id.filter(|id| !id.is_nil()) else {
            debug!("no request selected; skipping quote refresh");
            return Ok(());
        };

        match self.backend.fetch_quotes_for_request(request_id).await {
            Ok(fresh) => {
                if let Some(accepted) = find_accepted(&fresh) {
                    self.last_accepted_quote_id = Some(accepted);
                }
                info!(%request_id, count = fresh.len(), "quotes refreshed");
                let existing = std::mem::take(&mut self.quotes);
                self.quotes = merge_quotes(existing, request_id, fresh);
                Ok(())
            }
            Err(err) => {
                warn!(%request_id, error = %err, "failed to fetch quotes");
                self.notifier.notify(Notice::error(
                    "שגיאה בטעינת הצעות מחיר",
                    "לא ניתן היה לטעון את הצעות המחיר לבקשה זו",
                ));
                self.quotes.retain(|q| q.request_id != request_id);
                Err(err.into())
            }
        }
    }

    /// Change the externally selected request; a change triggers a refresh.
    pub async fn select_request(&mut self, request_id: Option<Uuid>) -> Result<(), StoreError> {
        if self.selected_request_id == request_id {
            return Ok(());
        }
        self.selected_request_id = request_id;
        self.refresh_quotes(request_id).await
    }

    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        self.refresh_quotes(self.selected_request_id).await
    }

    /// Mark a held quote as accepted, unless its request already has one.
    ///
    /// Returns `Ok` once the status update is stored, even if the reload
    /// that follows fails.
    pub async fn accept_quote(&mut self, quote_id: Uuid) -> Result<(), StoreError> {
        let request_id = self
            .quotes
            .iter()
            .find(|q| q.id == quote_id)
            .map(|q| q.request_id)
            .ok_or(StoreError::QuoteNotFound { quote_id })?;

        if self.backend.check_if_accepted_quote_exists(request_id).await? {
            return Err(StoreError::QuoteAlreadyAccepted { request_id });
        }

        self.backend
            .update_quote_status(quote_id, QuoteStatus::Accepted)
            .await?;
        self.notifier.notify(Notice::info(
            "ההצעה התקבלה",
            "בעל המקצוע יקבל הודעה על בחירתך",
        ));
        // The acceptance is stored; a failed reload is already reported by refresh_quotes.
        if let Err(err) = self.refresh_quotes(Some(request_id)).await {
            warn!(%quote_id, %request_id, error = %err, "quote accepted but reload failed");
        }
        Ok(())
    }
}
