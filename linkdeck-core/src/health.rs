//! Link health-check fields carried on every URL item.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Result of the most recent reachability check for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Redirect,
    Broken,
    Timeout,
}

impl HealthStatus {
    /// Classify an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => HealthStatus::Healthy,
            300..=399 => HealthStatus::Redirect,
            _ => HealthStatus::Broken,
        }
    }
}

/// Health-check fields. Written by the (external) link checker, carried
/// through every mutation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub last_http_status: Option<u16>,
    pub response_time_ms: Option<u64>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub checked_at: Option<Timestamp>,
}

impl HealthCheck {
    /// Record a completed check.
    pub fn record(&mut self, http_status: u16, response_time_ms: u64, at: Timestamp) {
        self.status = HealthStatus::from_http_status(http_status);
        self.last_http_status = Some(http_status);
        self.response_time_ms = Some(response_time_ms);
        self.checked_at = Some(at);
    }

    /// Record a check that never got a response.
    pub fn record_timeout(&mut self, at: Timestamp) {
        self.status = HealthStatus::Timeout;
        self.last_http_status = None;
        self.response_time_ms = None;
        self.checked_at = Some(at);
    }
}
