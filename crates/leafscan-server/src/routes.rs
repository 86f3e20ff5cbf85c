//! HTTP routes and handlers

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use leafscan_core::{Error, PredictionResult};
use leafscan_vision::catalog;
use serde::Serialize;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::state::AppState;

// Multipart framing overhead on top of the payload limit
const MULTIPART_SLACK: usize = 64 * 1024;

pub fn create_router(state: AppState, cors_allow_any: bool, cors_origins: &[String]) -> Router {
    let cors = if cors_allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/classes", get(classes))
        .route("/api/health", get(health))
        .route("/metrics", get(render_metrics))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(state.max_body_bytes + MULTIPART_SLACK))
        .layer(cors)
        .with_state(state)
}

/// Diagnosis endpoint: multipart upload with the image under `file`
async fn predict(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    metrics::counter!("leafscan_requests_total").increment(1);
    let started = Instant::now();

    let upload = match extract_file(&mut multipart).await {
        Ok(upload) => upload,
        Err(response) => {
            metrics::counter!("leafscan_predictions_total", "outcome" => "error").increment(1);
            return response;
        }
    };

    let outcome = state
        .engine
        .predict(&upload.bytes, upload.content_type.as_deref())
        .await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("leafscan_predict_latency_ms").record(elapsed_ms);

    match outcome {
        Ok(diagnosis) => {
            metrics::counter!("leafscan_predictions_total", "outcome" => "success").increment(1);
            info!(
                class = %diagnosis.prediction.class_name,
                confidence = diagnosis.prediction.confidence,
                elapsed_ms,
                "diagnosis served"
            );
            (StatusCode::OK, Json(PredictionResult::from(diagnosis))).into_response()
        }
        Err(err) => {
            let outcome_label = if matches!(err, Error::GuardRejected(_)) {
                "rejected"
            } else {
                "error"
            };
            metrics::counter!("leafscan_predictions_total", "outcome" => outcome_label)
                .increment(1);
            warn!(error = %err, elapsed_ms, "prediction failed");
            error_response(&err)
        }
    }
}

struct Upload {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// Pull the `file` part out of the multipart form
async fn extract_file(multipart: &mut Multipart) -> Result<Upload, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return Err(failure(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "No file uploaded. Attach an image under the 'file' field.",
                ))
            }
            Err(_) => {
                return Err(failure(
                    StatusCode::BAD_REQUEST,
                    "Malformed multipart form data.",
                ))
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(_) => {
                return Err(failure(
                    StatusCode::BAD_REQUEST,
                    "Failed to read the uploaded file.",
                ))
            }
        };

        return Ok(Upload {
            bytes,
            content_type,
        });
    }
}

/// Class table and knowledge base listing
async fn classes() -> Json<catalog::CatalogListing> {
    Json(catalog::catalog_listing())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    model_backbone: String,
    num_classes: usize,
    guard: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_loaded: state.engine.model_loaded(),
        model_backbone: state.backbone.to_string(),
        num_classes: catalog::num_classes(),
        guard: state.engine.guard_strategy(),
    })
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Map a pipeline error to a status and the wire failure shape
fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::NotAnImage => StatusCode::BAD_REQUEST,
        Error::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        Error::GuardRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        e if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(PredictionResult::failure(err.public_message()))).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(PredictionResult::failure(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::{header, Request};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "leafscan-test-boundary";

    fn test_router() -> Router {
        let mut config = ServerConfig::default();
        // Point the model at a path that cannot exist so the loader
        // reports ModelUnavailable instead of touching the network.
        config.model.source = leafscan_vision::ModelSource::Local {
            path: "/nonexistent/leafscan-test/model.safetensors".into(),
        };
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::from_config(&config, handle).unwrap();
        create_router(state, true, &[])
    }

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([34, 139, 34])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn multipart_body(field_name: &str, content_type: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"{field_name}\"; filename=\"leaf.png\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn predict_request(field_name: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field_name, content_type, payload)))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn classes_lists_the_full_table() {
        let response = test_router()
            .oneshot(Request::get("/api/classes").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total_classes"], 38);
        assert_eq!(json["classes"].as_array().unwrap().len(), 38);
    }

    #[tokio::test]
    async fn health_reports_the_unloaded_model() {
        let response = test_router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model_loaded"], false);
        assert_eq!(json["num_classes"], 38);
        assert_eq!(json["guard"], "statistical");
    }

    #[tokio::test]
    async fn predict_without_weights_returns_service_unavailable() {
        let response = test_router()
            .oneshot(predict_request("file", "image/png", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("Model not loaded"));
    }

    #[tokio::test]
    async fn non_image_declared_type_is_a_bad_request() {
        let response = test_router()
            .oneshot(predict_request("file", "text/plain", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn empty_upload_is_unprocessable() {
        let response = test_router()
            .oneshot(predict_request("file", "image/png", b""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn missing_file_field_is_unprocessable() {
        let response = test_router()
            .oneshot(predict_request("attachment", "image/png", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let response = test_router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = test_router()
            .oneshot(Request::get("/api/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
