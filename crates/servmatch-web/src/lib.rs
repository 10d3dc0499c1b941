//! JSON API over a shared marketplace session.

use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use servmatch_backend::{Backend, BackendError};
use servmatch_core::{regions, Quote, ServiceRequest};
use servmatch_store::{MarketplaceSession, Notice, NoticeBuffer, StoreConfig, StoreError};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub const CRATE_NAME: &str = "servmatch-web";

pub struct AppState {
    session: Mutex<MarketplaceSession>,
    notices: NoticeBuffer,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let notices = NoticeBuffer::new();
        let session = MarketplaceSession::with_notifier(backend, Arc::new(notices.clone()));
        Self::from_session(session, notices)
    }

    /// `notices` must be the buffer the session notifies into.
    pub fn from_session(session: MarketplaceSession, notices: NoticeBuffer) -> Self {
        Self {
            session: Mutex::new(session),
            notices,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserBody {
    user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct SelectionBody {
    request_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotesQuery {
    request_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct QuotesView {
    selected_request_id: Option<Uuid>,
    last_accepted_quote_id: Option<Uuid>,
    quotes: Vec<Quote>,
}

#[derive(Debug, Serialize)]
struct CityRegion {
    city: String,
    region: &'static str,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::QuoteAlreadyAccepted { .. } => StatusCode::CONFLICT,
            StoreError::QuoteNotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Backend(BackendError::NotFound(_)) => StatusCode::NOT_FOUND,
            StoreError::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/requests", get(requests_handler))
        .route("/requests/refresh", post(refresh_requests_handler))
        .route("/session/user", put(set_user_handler))
        .route("/quotes", get(quotes_handler))
        .route("/quotes/selection", put(select_request_handler))
        .route("/quotes/refresh", post(refresh_quotes_handler))
        .route("/quotes/{id}/accept", post(accept_quote_handler))
        .route("/professionals/{id}", get(professional_handler))
        .route("/regions", get(regions_handler))
        .route("/regions/{region}/cities", get(region_cities_handler))
        .route("/cities", get(cities_handler))
        .route("/cities/{city}/region", get(city_region_handler))
        .route("/notices", get(notices_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(StoreConfig::from_env()?).await
}

pub async fn serve(config: StoreConfig) -> anyhow::Result<()> {
    let notices = NoticeBuffer::new();
    let session = MarketplaceSession::from_config(&config, Arc::new(notices.clone())).await?;
    let state = AppState::from_session(session, notices);
    let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
    info!(port = config.web_port, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn quotes_view(session: &MarketplaceSession, filter: Option<Uuid>) -> QuotesView {
    let store = session.quotes();
    QuotesView {
        selected_request_id: store.selected_request_id(),
        last_accepted_quote_id: store.last_accepted_quote_id(),
        quotes: match filter {
            Some(request_id) => store.quotes_for(request_id).cloned().collect(),
            None => store.quotes().to_vec(),
        },
    }
}

async fn requests_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ServiceRequest>> {
    Json(state.session.lock().await.requests().requests().to_vec())
}

async fn refresh_requests_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<ServiceRequest>> {
    let mut session = state.session.lock().await;
    let requests = session.requests_mut().refresh().await?;
    Ok(Json(requests.to_vec()))
}

async fn set_user_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UserBody>,
) -> ApiResult<Vec<ServiceRequest>> {
    let mut session = state.session.lock().await;
    session.requests_mut().set_user(body.user_id).await?;
    Ok(Json(session.requests().requests().to_vec()))
}

async fn quotes_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuotesQuery>,
) -> Json<QuotesView> {
    let session = state.session.lock().await;
    Json(quotes_view(&session, query.request_id))
}

async fn select_request_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectionBody>,
) -> ApiResult<QuotesView> {
    let mut session = state.session.lock().await;
    session.quotes_mut().select_request(body.request_id).await?;
    Ok(Json(quotes_view(&session, None)))
}

async fn refresh_quotes_handler(State(state): State<Arc<AppState>>) -> ApiResult<QuotesView> {
    let mut session = state.session.lock().await;
    session.quotes_mut().refresh().await?;
    Ok(Json(quotes_view(&session, None)))
}

async fn accept_quote_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<Uuid>,
) -> ApiResult<QuotesView> {
    let mut session = state.session.lock().await;
    session.quotes_mut().accept_quote(id).await?;
    Ok(Json(quotes_view(&session, None)))
}

async fn professional_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<Uuid>,
) -> Response {
    let session = state.session.lock().await;
    match session.fetch_professional(id).await {
        Ok(Some(view)) => Json(view).into_response(),
        Ok(None) => ApiError::not_found(format!("professional {id} not found")).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

async fn regions_handler() -> Json<Vec<&'static str>> {
    Json(regions::all_regions())
}

async fn region_cities_handler(AxumPath(region): AxumPath<String>) -> ApiResult<Vec<&'static str>> {
    if !regions::REGIONS.contains(&region.as_str()) {
        return Err(ApiError::not_found(format!("unknown region {region}")));
    }
    Ok(Json(regions::cities_of(&region).into_iter().collect()))
}

async fn cities_handler() -> Json<Vec<&'static str>> {
    Json(regions::all_cities())
}

async fn city_region_handler(AxumPath(city): AxumPath<String>) -> ApiResult<CityRegion> {
    match regions::region_of(&city) {
        Some(region) => Ok(Json(CityRegion { city, region })),
        None => Err(ApiError::not_found(format!("no region known for {city}"))),
    }
}

async fn notices_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Notice>> {
    Json(state.notices.drain())
}
