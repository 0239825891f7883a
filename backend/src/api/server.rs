//! HTTP server for the birdwatch API.
//!
//! Serves lens summaries over the cleaned dataset and runs the cleaning
//! pipeline on uploaded exports.
//!
//! # API Endpoints
//!
//! | Method | Path                  | Description                                  |
//! |--------|-----------------------|----------------------------------------------|
//! | GET    | `/health`             | Health check                                 |
//! | GET    | `/api/readiness`      | Readiness report of the served dataset       |
//! | GET    | `/api/lenses`         | Available lenses                             |
//! | GET    | `/api/lenses/{lens}`  | One lens, filtered by `start`, `end`, `species`, `observer` |
//! | POST   | `/api/clean`          | Upload exports, clean, persist, serve result |
//! | GET    | `/api/logs`           | SSE stream for real-time logs                |

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_warning, LOG_BROADCASTER};
use super::types::{error_response, CleanResponse, LensInfo, LensQuery};
use crate::config::{parse_flag, AppConfig};
use crate::error::{PipelineError, ServerResult};
use crate::insights::{apply_filters, load_cleaned, summarize, Lens, LensSummary};
use crate::insights::loader::rederive;
use crate::models::Table;
use crate::readiness::{summarize_readiness, ReadinessReport};
use crate::transform::pipeline::{clean_bytes, persist, CleanOptions, OutputFormat};

type ApiError = (StatusCode, Json<Value>);

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Dataset every lens reads; replaced wholesale by `/api/clean`.
    pub table: Arc<RwLock<Table>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(table: Table, config: AppConfig) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
            config: Arc::new(config),
        }
    }

    /// Load the configured dataset; start empty when it is not there yet.
    pub fn load(config: AppConfig) -> Self {
        let table = match load_cleaned(&config.data_path) {
            Ok(table) => {
                log_info(format!(
                    "Serving {} ({} rows)",
                    config.data_path.display(),
                    table.len()
                ));
                table
            }
            Err(e) => {
                log_warning(format!(
                    "No dataset at {} ({}); POST /api/clean to create one",
                    config.data_path.display(),
                    e
                ));
                Table::default()
            }
        };
        Self::new(table, config)
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/readiness", get(readiness))
        .route("/api/lenses", get(list_lenses))
        .route("/api/lenses/{lens}", get(lens_summary))
        .route("/api/clean", post(clean_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> ServerResult<()> {
    let port = config.port;
    let app = router(AppState::load(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🚀 birdwatch server running on http://localhost:{}", port);
    tracing::info!("   GET  /api/lenses/{{lens}} - Lens summaries");
    tracing::info!("   POST /api/clean          - Upload exports to clean");
    tracing::info!("   GET  /api/logs           - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "birdwatch",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "lenses": "GET /api/lenses/{lens}",
            "clean": "POST /api/clean",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn readiness(State(state): State<AppState>) -> Json<ReadinessReport> {
    let table = state.table.read().await;
    Json(summarize_readiness(&table))
}

async fn list_lenses() -> Json<Vec<LensInfo>> {
    Json(Lens::ALL.into_iter().map(LensInfo::from).collect())
}

async fn lens_summary(
    State(state): State<AppState>,
    Path(lens): Path<String>,
    Query(query): Query<LensQuery>,
) -> Result<Json<LensSummary>, ApiError> {
    let lens: Lens = lens
        .parse()
        .map_err(|e: String| (StatusCode::NOT_FOUND, Json(error_response(&e))))?;
    let criteria = query
        .to_criteria()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(error_response(&e))))?;

    let table = state.table.read().await;
    let filtered = apply_filters(&table, &criteria);
    Ok(Json(summarize(&filtered, lens)))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Clean uploaded exports (`file` fields, optional `extended` field), persist
/// the result to the configured path and serve it.
async fn clean_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CleanResponse>, ApiError> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    let mut extended = state.config.extended;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, Json(error_response(&format!("Multipart error: {}", e))))
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("upload-{}", files.len() + 1));
                let bytes = field.bytes().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, Json(error_response(&format!("Read error: {}", e))))
                })?;
                files.push((file_name, bytes.to_vec()));
            }
            "extended" => {
                let value = field.text().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, Json(error_response(&format!("Read error: {}", e))))
                })?;
                extended = parse_flag(&value).ok_or_else(|| {
                    let msg = format!("Invalid 'extended' value: '{}'", value.trim());
                    (StatusCode::BAD_REQUEST, Json(error_response(&msg)))
                })?;
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(error_response("No file provided"))));
    }

    let total: usize = files.iter().map(|(_, b)| b.len()).sum();
    log_info(format!("📄 New upload: {} file(s), {} bytes", files.len(), total));

    let destination = state.config.data_path.clone();
    let options = CleanOptions {
        extended,
        format: OutputFormat::from_path(&destination),
        ..CleanOptions::default()
    };

    let dest = destination.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = clean_bytes(&files, &options)?;
        persist(&outcome.table, &dest, options.format)?;
        Ok::<_, PipelineError>(outcome)
    })
    .await
    .map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(&format!("Worker failed: {}", e))))
    })?
    .map_err(|e| {
        let status = match e {
            PipelineError::AllSourcesUnavailable(_) | PipelineError::EmptyAfterCleaning { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&e.to_string())))
    })?;

    *state.table.write().await = rederive(outcome.table);

    Ok(Json(CleanResponse::new(
        outcome.report,
        destination.display().to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use crate::models::Cell;

    async fn multipart(body: &str) -> Multipart {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body.replace('\n', "\r\n")))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }


    fn state() -> AppState {
        let table = Table::from_rows(
            vec!["date".into(), "taxoncode".into(), "observer".into()],
            vec![
                vec![Cell::text("2018-05-01"), Cell::text("BCCH"), Cell::text("Ann")],
                vec![Cell::text("2018-08-01"), Cell::text("NOCA"), Cell::text("Bob")],
            ],
        );
        AppState::new(rederive(table), AppConfig::default())
    }

    #[tokio::test]
    async fn test_lens_summary_filters() {
        let query = LensQuery {
            observer: Some("Bob".into()),
            ..Default::default()
        };
        let Json(summary) = lens_summary(State(state()), Path("species".into()), Query(query))
            .await
            .unwrap();

        assert_eq!(summary.lens, Lens::Species);
        assert_eq!(summary.rows, 1);
    }

    #[tokio::test]
    async fn test_clean_upload_rejects_bad_extended_flag() {
        let body = "--XBOUNDARY\n\
                    Content-Disposition: form-data; name=\"extended\"\n\
                    \n\
                    maybe\n\
                    --XBOUNDARY--\n";
        let err = clean_upload(State(state()), multipart(body).await)
            .await
            .unwrap_err();

        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1 .0["error"].as_str().unwrap().contains("extended"));
    }

    #[tokio::test]
    async fn test_unknown_lens_is_not_found() {
        let err = lens_summary(State(state()), Path("weather".into()), Query(LensQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let Json(report) = readiness(State(state())).await;
        assert_eq!(report.rows, 2);
        assert!(report.category("temporal").unwrap().is_usable());
    }
}
