//! Request routing and JSON handlers for the points and settings API

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use chartnotes_data::Backend;
use chartnotes_renderer::{render_svg, ChartLayout, LayoutOptions};
use chartnotes_shared::{
    ChartNotesError, ChartNotesResult, ChartSettings, ErrorResponse, PointDraft, PointFields,
    PointPatch,
};
use hyper::header::{self, HeaderValue};
use hyper::{body::Body, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::form_urlencoded;

/// Shared by every connection
pub struct AppState {
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self { backend })
    }
}

/// Query parameters for `/api/chart.svg`
#[derive(Debug, Clone, PartialEq)]
pub struct ChartQuery {
    pub width: f64,
    pub height: f64,
    pub notes: bool,
}

/// Top-level service: CORS preflight, then dispatch on method and path.
pub async fn service_handler(
    state: Arc<AppState>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    log::debug!("{method} {path}");

    if method == Method::OPTIONS {
        let mut response = empty(StatusCode::NO_CONTENT);
        with_cors(&mut response);
        return Ok(response);
    }

    let result = route(&state, req).await;
    let mut response = result.unwrap_or_else(|err| {
        if err.is_client_error() {
            log::debug!("{method} {path} rejected: {err}");
        } else {
            log::error!("{method} {path} failed: {err}");
        }
        error_response(&err)
    });
    with_cors(&mut response);
    Ok(response)
}

async fn route(state: &AppState, req: Request<Body>) -> ChartNotesResult<Response<Body>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => Ok(json(
            StatusCode::OK,
            &serde_json::json!({"status": "healthy"}),
        )),
        (&Method::GET, ["api", "points"]) => list_points(state).await,
        (&Method::POST, ["api", "points"]) => create_point(state, req).await,
        (&Method::DELETE, ["api", "points"]) => clear_points(state).await,
        (&Method::PUT, ["api", "points", id]) => {
            let id = parse_id(id)?;
            update_point(state, id, req).await
        }
        (&Method::DELETE, ["api", "points", id]) => {
            let id = parse_id(id)?;
            delete_point(state, id).await
        }
        (&Method::GET, ["api", "settings"]) => get_settings(state).await,
        (&Method::PUT, ["api", "settings"]) => save_settings(state, req).await,
        (&Method::GET, ["api", "chart.svg"]) => {
            let query = parse_chart_query(req.uri().query())?;
            chart_svg(state, query).await
        }
        _ => Ok(not_found()),
    }
}

async fn list_points(state: &AppState) -> ChartNotesResult<Response<Body>> {
    let points = state.backend.get_points().await?;
    Ok(json(StatusCode::OK, &points))
}

async fn create_point(state: &AppState, req: Request<Body>) -> ChartNotesResult<Response<Body>> {
    let fields: PointFields = read_json(req).await?;
    let draft = PointDraft::from_fields(fields)?;
    let point = state.backend.create_point(draft).await?;
    log::info!("created point {} ({})", point.id, point.month);
    Ok(json(StatusCode::CREATED, &point))
}

async fn update_point(
    state: &AppState,
    id: i64,
    req: Request<Body>,
) -> ChartNotesResult<Response<Body>> {
    let fields: PointFields = read_json(req).await?;
    let patch = PointPatch::from(fields).validated()?;
    let point = state.backend.update_point(id, patch).await?;
    Ok(json(StatusCode::OK, &point))
}

async fn delete_point(state: &AppState, id: i64) -> ChartNotesResult<Response<Body>> {
    state.backend.delete_point(id).await?;
    Ok(empty(StatusCode::NO_CONTENT))
}

async fn clear_points(state: &AppState) -> ChartNotesResult<Response<Body>> {
    state.backend.clear_all_points().await?;
    log::info!("cleared all points");
    Ok(empty(StatusCode::NO_CONTENT))
}

async fn get_settings(state: &AppState) -> ChartNotesResult<Response<Body>> {
    let settings = state.backend.get_settings().await?.unwrap_or_default();
    Ok(json(StatusCode::OK, &settings))
}

async fn save_settings(state: &AppState, req: Request<Body>) -> ChartNotesResult<Response<Body>> {
    // Absent keys take their defaults, not their previously stored values
    let settings: ChartSettings = read_json(req).await?;
    let saved = state.backend.save_settings(settings).await?;
    Ok(json(StatusCode::OK, &saved))
}

async fn chart_svg(state: &AppState, query: ChartQuery) -> ChartNotesResult<Response<Body>> {
    let points = state.backend.get_points().await?;
    let settings = state.backend.get_settings().await?.unwrap_or_default();
    let layout = ChartLayout::compute(
        &points,
        &settings,
        LayoutOptions {
            width: query.width,
            height: query.height,
            show_notes: query.notes,
        },
    )?;

    let mut response = Response::new(Body::from(render_svg(&layout, &points, &settings)));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("image/svg+xml"),
    );
    Ok(response)
}

pub fn parse_id(raw: &str) -> ChartNotesResult<i64> {
    raw.parse()
        .map_err(|_| ChartNotesError::validation("id", format!("'{raw}' is not a point id")))
}

/// Parse `width`, `height` and `notes`; absent values take layout defaults
pub fn parse_chart_query(query: Option<&str>) -> ChartNotesResult<ChartQuery> {
    let params: HashMap<String, String> = query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let defaults = LayoutOptions::default();

    let dimension = |key: &str, default: f64| -> ChartNotesResult<f64> {
        match params.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| ChartNotesError::validation(key, format!("invalid {key}: {raw}"))),
        }
    };

    Ok(ChartQuery {
        width: dimension("width", defaults.width)?,
        height: dimension("height", defaults.height)?,
        notes: matches!(
            params.get("notes").map(String::as_str),
            Some("1" | "true" | "yes" | "on")
        ),
    })
}

async fn read_json<T: DeserializeOwned>(req: Request<Body>) -> ChartNotesResult<T> {
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| ChartNotesError::validation("body", e.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ChartNotesError::validation("body", format!("invalid JSON: {e}")))
}

pub fn status_for(err: &ChartNotesError) -> StatusCode {
    match err {
        ChartNotesError::Validation { .. } => StatusCode::BAD_REQUEST,
        ChartNotesError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChartNotesError::EmptyDomain => StatusCode::UNPROCESSABLE_ENTITY,
        ChartNotesError::Transport { .. } => StatusCode::BAD_GATEWAY,
        ChartNotesError::Storage { .. } | ChartNotesError::Config { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: &ChartNotesError) -> Response<Body> {
    let mut response = Response::new(Body::from(ErrorResponse::new(err).to_json()));
    *response.status_mut() = status_for(err);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => error_response(&ChartNotesError::from(e)),
    }
}

fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from(
        ErrorResponse {
            error: "Not Found".to_string(),
        }
        .to_json(),
    ));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn with_cors(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
