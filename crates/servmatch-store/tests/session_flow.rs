use std::path::Path;
use std::sync::Arc;

use servmatch_backend::InMemoryBackend;
use servmatch_core::{RequestStatus, NOT_SPECIFIED};
use servmatch_store::{MarketplaceSession, NoticeBuffer, StoreError};
use uuid::Uuid;

fn id(raw: &str) -> Uuid {
    raw.parse().unwrap()
}

fn demo_session() -> (Arc<InMemoryBackend>, NoticeBuffer, MarketplaceSession) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/demo.json");
    let backend = Arc::new(InMemoryBackend::from_fixture_file(path).unwrap());
    let notices = NoticeBuffer::new();
    let session = MarketplaceSession::with_notifier(backend.clone(), Arc::new(notices.clone()));
    (backend, notices, session)
}

#[tokio::test]
async fn demo_user_browses_requests_and_accepts_a_quote() {
    let (_backend, notices, mut session) = demo_session();
    let user = id("11111111-1111-4111-8111-111111111111");
    session.requests_mut().set_user(Some(user)).await.unwrap();

    let listed = session
        .requests()
        .requests()
        .iter()
        .map(|r| (r.id.as_u128() & 0xff, r.quotes_count))
        .collect::<Vec<_>>();
    assert_eq!(listed, vec![(2, 2), (4, 1), (3, 2), (1, 1), (5, 0)]);
    assert_eq!(session.requests().requests()[0].status, RequestStatus::WaitingForRating);

    let open_request = id("a1000000-0000-4000-8000-000000000003");
    session.quotes_mut().select_request(Some(open_request)).await.unwrap();
    assert_eq!(session.quotes().quotes().len(), 2);
    assert_eq!(session.quotes().last_accepted_quote_id(), None);

    let orphan = session
        .quotes()
        .quotes()
        .iter()
        .find(|q| q.id == id("c3000000-0000-4000-8000-000000000004"))
        .unwrap();
    assert_eq!(orphan.professional.name, NOT_SPECIFIED);

    let rated_request = id("a1000000-0000-4000-8000-000000000002");
    session.quotes_mut().select_request(Some(rated_request)).await.unwrap();
    let previously_accepted = id("c3000000-0000-4000-8000-000000000001");
    assert_eq!(session.quotes().last_accepted_quote_id(), Some(previously_accepted));
    assert_eq!(session.quotes().quotes().len(), 4);

    // Switching back to a request without an accepted quote keeps the old id.
    session.quotes_mut().select_request(Some(open_request)).await.unwrap();
    assert_eq!(session.quotes().last_accepted_quote_id(), Some(previously_accepted));

    let chosen = id("c3000000-0000-4000-8000-000000000003");
    session.quotes_mut().accept_quote(chosen).await.unwrap();
    assert_eq!(session.quotes().last_accepted_quote_id(), Some(chosen));

    let second = session
        .quotes_mut()
        .accept_quote(id("c3000000-0000-4000-8000-000000000004"))
        .await;
    assert!(matches!(second, Err(StoreError::QuoteAlreadyAccepted { .. })));
    assert_eq!(notices.drain().len(), 1);
}

#[tokio::test]
async fn outages_keep_requests_and_clear_only_failed_quotes() {
    let (backend, notices, mut session) = demo_session();
    session
        .requests_mut()
        .set_user(Some(id("11111111-1111-4111-8111-111111111111")))
        .await
        .unwrap();

    let a = id("a1000000-0000-4000-8000-000000000002");
    let b = id("a1000000-0000-4000-8000-000000000004");
    session.quotes_mut().refresh_quotes(Some(a)).await.unwrap();
    session.quotes_mut().refresh_quotes(Some(b)).await.unwrap();
    assert_eq!(session.quotes().quotes().len(), 3);

    backend.fail_requests(true).await;
    backend.fail_quotes_for(a).await;
    assert!(session.requests_mut().refresh().await.is_err());
    assert_eq!(session.requests().requests().len(), 5);

    assert!(session.quotes_mut().refresh_quotes(Some(a)).await.is_err());
    assert_eq!(session.quotes().quotes().len(), 1);
    assert_eq!(session.quotes().quotes_for(b).count(), 1);
    assert_eq!(notices.drain().len(), 1);

    backend.heal().await;
    session.quotes_mut().refresh_quotes(Some(a)).await.unwrap();
    assert_eq!(session.quotes().quotes().len(), 3);
}

#[tokio::test]
async fn professional_lookup_returns_normalized_profile() {
    let (_backend, _notices, session) = demo_session();
    let pro = session
        .fetch_professional(id("b2000000-0000-4000-8000-000000000001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pro.profession, "אינסטלטור");
    assert_eq!(pro.region, "חיפה והקריות");
    assert_eq!(pro.phone, "050-123-4567");
}
