//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::analytics::{
    DeviceInsights, FleetAnalytics, Overview, SdgProgress, by_building, by_type, time_series,
    trends,
};
use crate::assistant;
use crate::devices::Device;
use crate::io::export;
use crate::registry::DeviceFilter;

use super::AppState;
use super::error::ApiError;
use super::types::{
    AnalyticsQuery, ApiResponse, ChatReply, ChatRequest, DeviceActionRequest, DeviceDetail,
    Health, RealtimeAnalytics, RealtimeDevice,
};

/// Readings returned with a device detail or realtime history.
const HISTORY_WINDOW: usize = 100;
/// Hours covered by chart series.
const SERIES_HOURS: usize = 24;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wraps a realtime payload so intermediaries never serve it stale.
fn no_store<T: Serialize>(body: ApiResponse<T>) -> Response {
    ([(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
}

/// `GET /devices?building=&type=&status=`
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DeviceFilter>, QueryRejection>,
) -> ApiResult<Vec<Device>> {
    let Query(filter) = query?;
    let devices = state.registry.filter(&filter);
    let count = devices.len();
    Ok(Json(ApiResponse::ok(devices).with_count(count)))
}

/// `POST /devices` with `{deviceId, action, value?}`.
///
/// `toggle` flips online/offline, `update` applies `value` as a partial update.
pub async fn device_action(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DeviceActionRequest>, JsonRejection>,
) -> ApiResult<Device> {
    let Json(request) = body?;

    let device = match request.action.as_str() {
        "toggle" => state.registry.toggle(&request.device_id)?,
        "update" => {
            let update = request
                .value
                .ok_or_else(|| ApiError::InvalidInput("Missing value for update".to_string()))?;
            state.registry.apply_update(&request.device_id, update)?
        }
        _ => return Err(ApiError::InvalidInput("Invalid action".to_string())),
    };

    info!(
        "{} {}: status={} draw={:.1} W",
        request.action, device.id, device.status, device.consumption.current
    );
    Ok(Json(ApiResponse::ok(device)))
}

/// `GET /devices/{id}`
pub async fn device_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DeviceDetail> {
    let device = state.registry.get(&id)?;
    let readings = state.registry.readings(&id, HISTORY_WINDOW)?;
    let latest_reading = readings.last().cloned();

    Ok(Json(ApiResponse::ok(DeviceDetail {
        device,
        readings,
        latest_reading,
    })))
}

/// `GET /devices/{id}/export`: full retained history as CSV.
pub async fn export_readings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let readings = state
        .registry
        .readings(&id, state.registry.history_limit())?;
    let csv = export::to_csv_string(&readings).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}-readings.csv\""),
            ),
        ],
        csv,
    )
        .into_response())
}

/// `GET /analytics?type=overview|by-building|by-type|time-series|sdg`
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let devices = state.registry.all();
    let tariff = state.registry.tariff();

    let response = match query.kind.as_deref().unwrap_or("overview") {
        "overview" => Json(ApiResponse::ok(Overview::from_devices(&devices, tariff))).into_response(),
        "by-building" => Json(ApiResponse::ok(by_building(&devices, tariff))).into_response(),
        "by-type" => Json(ApiResponse::ok(by_type(&devices))).into_response(),
        "time-series" => {
            let total = Overview::from_devices(&devices, tariff).total_consumption;
            Json(ApiResponse::ok(time_series(total, Utc::now(), SERIES_HOURS, tariff)))
                .into_response()
        }
        "sdg" => {
            let fleet = FleetAnalytics::from_devices(&devices, tariff);
            Json(ApiResponse::ok(SdgProgress::from_analytics(&fleet))).into_response()
        }
        _ => return Err(ApiError::InvalidInput("Invalid analytics type".to_string())),
    };
    Ok(response)
}

/// `GET /realtime/devices`
pub async fn realtime_devices(State(state): State<Arc<AppState>>) -> Response {
    no_store(ApiResponse::ok(state.registry.all()).with_timestamp(Utc::now()))
}

/// `GET /realtime/analytics`
pub async fn realtime_analytics(State(state): State<Arc<AppState>>) -> Response {
    let devices = state.registry.all();
    let tariff = state.registry.tariff();
    let now = Utc::now();

    no_store(
        ApiResponse::ok(RealtimeAnalytics {
            analytics: FleetAnalytics::from_devices(&devices, tariff),
            trends: trends(&devices, now, SERIES_HOURS, tariff),
        })
        .with_timestamp(now),
    )
}

/// `GET /realtime/device/{id}`
pub async fn realtime_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let device = state.registry.get(&id)?;
    let history = state.registry.readings(&id, HISTORY_WINDOW)?;
    let insights = DeviceInsights::compute(&device, &history, state.registry.tariff());

    Ok(no_store(
        ApiResponse::ok(RealtimeDevice {
            device,
            insights,
            history,
        })
        .with_timestamp(Utc::now()),
    ))
}

/// `POST /assistant/chat` with `{message}`.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    let Json(request) = body?;
    let devices = state.registry.all();
    let message = assistant::reply(&request.message, &devices, state.registry.tariff());

    Ok(Json(ApiResponse::ok(ChatReply {
        message,
        timestamp: Utc::now(),
    })))
}

/// `GET /v1/analytics`, guarded by `Authorization: Bearer <api key>`.
pub async fn v1_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Overview> {
    authorize(&state, &headers)?;
    let devices = state.registry.all();
    let overview = Overview::from_devices(&devices, state.registry.tariff());
    Ok(Json(ApiResponse::ok(overview).with_timestamp(Utc::now())))
}

/// Rejects unless the bearer token equals the configured key.
/// With no key configured every request is rejected.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Health>> {
    let tick = state.ticks.borrow().tick;
    Json(ApiResponse::ok(Health {
        status: "ok".to_string(),
        devices: state.registry.len(),
        tick,
    }))
}
