use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use quartier_realtime::HubHandle;
use quartier_shared::constants::DEFAULT_STORY_DURATION_MS;
use quartier_shared::geo::{distance_km, format_distance, GeoPoint, Located};
use quartier_store::{run_story_cleanup, CleanupOutcome, Database, Listing, ListingCategory, Story};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::throttle::{throttle_middleware, Throttle};
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub hub: HubHandle,
    pub throttle: Throttle,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/stories", post(create_story).get(list_stories))
        .route("/stories/:id", get(get_story))
        .route("/stories/:id", delete(delete_story))
        .route("/stories/:id/highlight", post(highlight_story))
        .route("/listings", post(create_listing).get(list_listings))
        .route("/listings/nearby", get(nearby_listings))
        .route("/internal/cleanup", post(run_cleanup))
        .route("/channels/:name/ws", get(ws::channel_ws))
        .layer(middleware::from_fn_with_state(
            state.throttle.clone(),
            throttle_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    cleanup_interval_secs: u64,
}

#[derive(Deserialize)]
struct CreateStoryRequest {
    author_id: Uuid,
    media_url: String,
    caption: Option<String>,
    duration_ms: Option<i64>,
}

#[derive(Deserialize)]
struct CreateListingRequest {
    title: String,
    category: ListingCategory,
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct NearbyQuery {
    lat: f64,
    lon: f64,
    radius_km: f64,
}

/// A listing decorated with its distance from the query origin.
#[derive(Serialize)]
struct NearbyListing {
    #[serde(flatten)]
    listing: Listing,
    distance_km: f64,
    distance: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        cleanup_interval_secs: state.config.cleanup_interval_secs,
    })
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

async fn create_story(
    State(state): State<AppState>,
    Json(req): Json<CreateStoryRequest>,
) -> Result<Json<Story>, ServerError> {
    if req.media_url.trim().is_empty() {
        return Err(ServerError::BadRequest("media_url must not be empty".into()));
    }

    let duration_ms = req.duration_ms.unwrap_or(DEFAULT_STORY_DURATION_MS);
    if duration_ms <= 0 {
        return Err(ServerError::BadRequest(
            "duration_ms must be positive".into(),
        ));
    }

    let story = Story {
        id: Uuid::new_v4(),
        author_id: req.author_id,
        media_url: req.media_url,
        caption: req.caption,
        duration_ms,
        is_highlighted: false,
        created_at: Utc::now(),
    };

    state.db.lock().await.insert_story(&story)?;

    info!(story = %story.id, author = %story.author_id, "Story created");
    Ok(Json(story))
}

async fn list_stories(State(state): State<AppState>) -> Result<Json<Vec<Story>>, ServerError> {
    let stories = state.db.lock().await.list_active_stories(Utc::now())?;
    Ok(Json(stories))
}

async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Story>, ServerError> {
    let story = state.db.lock().await.get_story(id)?;

    // An expired row that the sweep has not yet removed is still gone as far
    // as the API is concerned.
    if !story.is_active(Utc::now()) {
        return Err(ServerError::NotFound("Record not found".into()));
    }

    Ok(Json(story))
}

async fn highlight_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let updated = state.db.lock().await.set_story_highlighted(id, true)?;
    if !updated {
        return Err(ServerError::NotFound("Record not found".into()));
    }

    info!(story = %id, "Story promoted to highlight");
    Ok(Json(serde_json::json!({ "highlighted": true })))
}

async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let deleted = state.db.lock().await.delete_story(id)?;
    if !deleted {
        return Err(ServerError::NotFound("Record not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

async fn create_listing(
    State(state): State<AppState>,
    Json(req): Json<CreateListingRequest>,
) -> Result<Json<Listing>, ServerError> {
    if req.title.trim().is_empty() {
        return Err(ServerError::BadRequest("title must not be empty".into()));
    }

    let listing = Listing {
        id: Uuid::new_v4(),
        title: req.title,
        category: req.category,
        lat: req.lat,
        lon: req.lon,
        created_at: Utc::now(),
    };

    state.db.lock().await.insert_listing(&listing)?;

    info!(listing = %listing.id, category = listing.category.as_str(), "Listing created");
    Ok(Json(listing))
}

async fn list_listings(State(state): State<AppState>) -> Result<Json<Vec<Listing>>, ServerError> {
    let listings = state.db.lock().await.list_listings()?;
    Ok(Json(listings))
}

async fn nearby_listings(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyListing>>, ServerError> {
    if query.radius_km <= 0.0 {
        return Err(ServerError::BadRequest("radius_km must be positive".into()));
    }

    let origin = GeoPoint::new(query.lat, query.lon);
    let listings = state
        .db
        .lock()
        .await
        .list_listings_within_radius(origin, query.radius_km)?;

    let decorated = listings
        .into_iter()
        .map(|listing| {
            let km = distance_km(origin, listing.position());
            NearbyListing {
                listing,
                distance_km: km,
                distance: format_distance(km),
            }
        })
        .collect();

    Ok(Json(decorated))
}

// ---------------------------------------------------------------------------
// Cleanup entry point (external scheduler)
// ---------------------------------------------------------------------------

async fn run_cleanup(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CleanupOutcome>, ServerError> {
    // Missing credentials are a precondition failure for this invocation,
    // reported through the job's own structured result so the scheduler
    // sees the same shape either way.
    let Some(ref expected) = state.config.admin_token else {
        return Ok(Json(CleanupOutcome::failed(
            "cleanup credentials not configured (set ADMIN_TOKEN)",
        )));
    };

    verify_bearer_token(&headers, expected)?;

    let db = state.db.lock().await;
    let outcome = run_story_cleanup(&db, Utc::now());
    Ok(Json(outcome))
}

fn verify_bearer_token(headers: &HeaderMap, expected: &str) -> Result<(), ServerError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    // Constant-time comparison to prevent timing attacks on the token.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_verification() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer sesame"));

        assert!(verify_bearer_token(&headers, "sesame").is_ok());
        assert!(verify_bearer_token(&headers, "other").is_err());

        let empty = HeaderMap::new();
        assert!(verify_bearer_token(&empty, "sesame").is_err());
    }
}
