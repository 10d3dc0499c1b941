use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use servmatch_backend::Backend;
use servmatch_core::ServiceRequest;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::StoreError;

/// Display order: status priority, then newest date, then id.
pub fn compare_requests(a: &ServiceRequest, b: &ServiceRequest) -> Ordering {
    b.status
        .sort_priority()
        .cmp(&a.status.sort_priority())
        .then_with(|| b.date.cmp(&a.date))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_requests(requests: &mut [ServiceRequest]) {
    requests.sort_by(compare_requests);
}

/// The current user's service requests, annotated with quote counts.
pub struct RequestStore {
    backend: Arc<dyn Backend>,
    user_id: Option<Uuid>,
    requests: Vec<ServiceRequest>,
}

impl RequestStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            user_id: None,
            requests: Vec::new(),
        }
    }

    pub fn requests(&self) -> &[ServiceRequest] {
        &self.requests
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    /// Record the signed-in user. A newly available identity triggers a
    /// refresh; signing out clears the held requests.
    pub async fn set_user(&mut self, user_id: Option<Uuid>) -> Result<(), StoreError> {
        if self.user_id == user_id {
            return Ok(());
        }
        self.user_id = user_id;
        match user_id {
            Some(_) => self.refresh().await.map(|_| ()),
            None => {
                self.requests.clear();
                Ok(())
            }
        }
    }

    /// Fetch, count and order the user's requests without touching state.
    ///
    /// Quote counts are fetched concurrently; a failed count is logged and
    /// recorded as 0 for that request only.
    pub async fn load_requests(&self) -> Result<Vec<ServiceRequest>, StoreError> {
        let Some(user_id) = self.user_id else {
            debug!("no user identity yet; nothing to load");
            return Ok(Vec::new());
        };

        let mut requests = self.backend.fetch_user_requests(user_id).await?;
        let ids = requests.iter().map(|r| r.id).collect::<Vec<_>>();
        let backend = &self.backend;
        let counts = join_all(ids.iter().map(|&request_id| async move {
            backend.count_quotes_for_request(request_id).await
        }))
        .await;

        for (request, count) in requests.iter_mut().zip(counts) {
            request.quotes_count = match count {
                Ok(n) => n,
                Err(err) => {
                    warn!(request_id = %request.id, error = %err, "quote count failed; showing 0");
                    0
                }
            };
        }

        sort_requests(&mut requests);
        Ok(requests)
    }

    /// Re-run the full load. On failure the previously held requests stay.
    pub async fn refresh(&mut self) -> Result<&[ServiceRequest], StoreError> {
        match self.load_requests().await {
            Ok(requests) => {
                info!(count = requests.len(), "requests refreshed");
                self.requests = requests;
                Ok(&self.requests)
            }
            Err(err) => {
                error!(error = %err, "failed to load requests");
                Err(err)
            }
        }
    }
}
