//! Request and response bodies.
//!
//! Every response is wrapped in [`ApiResponse`], the same envelope the
//! polling client decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{DeviceInsights, FleetAnalytics, TrendPoint};
use crate::devices::{Device, DeviceUpdate, Reading};

/// `{success, data?, error?, count?, timestamp?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            count: None,
            timestamp: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            count: None,
            timestamp: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Body of `POST /devices`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceActionRequest {
    pub device_id: String,
    /// `toggle` or `update`.
    pub action: String,
    /// Fields to change; required for `update`.
    pub value: Option<DeviceUpdate>,
}

/// `GET /devices/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetail {
    pub device: Device,
    pub readings: Vec<Reading>,
    pub latest_reading: Option<Reading>,
}

/// `GET /analytics?type=...`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `GET /realtime/analytics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeAnalytics {
    pub analytics: FleetAnalytics,
    pub trends: Vec<TrendPoint>,
}

/// `GET /realtime/device/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeDevice {
    pub device: Device,
    pub insights: DeviceInsights,
    pub history: Vec<Reading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub devices: usize,
    pub tick: u64,
}
