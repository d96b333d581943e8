//! Message type, status, and priority enumerations.

use serde::{Deserialize, Serialize};

/// Closed set of application message types.
///
/// The wire `type` field stays a string so unknown values can be
/// reported by the validator and the dispatcher's explicit unknown arm
/// instead of failing at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Analytics
    AnalyticsUpdate,
    MetricsUpdate,
    DashboardUpdate,
    TrendUpdate,
    ForecastUpdate,
    // Alerts
    Alert,
    Notification,
    Warning,
    Error,
    // Status
    StatusUpdate,
    ProgressUpdate,
    Completion,
    // Data
    DataUpdate,
    DataSync,
    DataValidation,
    // User
    UserAction,
    UserPreference,
    UserStatus,
    // System
    SystemStatus,
    SystemMaintenance,
    SystemError,
}

impl MessageType {
    /// All members of the closed set, in catalog order.
    pub const ALL: [MessageType; 21] = [
        Self::AnalyticsUpdate,
        Self::MetricsUpdate,
        Self::DashboardUpdate,
        Self::TrendUpdate,
        Self::ForecastUpdate,
        Self::Alert,
        Self::Notification,
        Self::Warning,
        Self::Error,
        Self::StatusUpdate,
        Self::ProgressUpdate,
        Self::Completion,
        Self::DataUpdate,
        Self::DataSync,
        Self::DataValidation,
        Self::UserAction,
        Self::UserPreference,
        Self::UserStatus,
        Self::SystemStatus,
        Self::SystemMaintenance,
        Self::SystemError,
    ];

    /// Wire representation (SCREAMING_SNAKE_CASE).
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::AnalyticsUpdate => "ANALYTICS_UPDATE",
            Self::MetricsUpdate => "METRICS_UPDATE",
            Self::DashboardUpdate => "DASHBOARD_UPDATE",
            Self::TrendUpdate => "TREND_UPDATE",
            Self::ForecastUpdate => "FORECAST_UPDATE",
            Self::Alert => "ALERT",
            Self::Notification => "NOTIFICATION",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::StatusUpdate => "STATUS_UPDATE",
            Self::ProgressUpdate => "PROGRESS_UPDATE",
            Self::Completion => "COMPLETION",
            Self::DataUpdate => "DATA_UPDATE",
            Self::DataSync => "DATA_SYNC",
            Self::DataValidation => "DATA_VALIDATION",
            Self::UserAction => "USER_ACTION",
            Self::UserPreference => "USER_PREFERENCE",
            Self::UserStatus => "USER_STATUS",
            Self::SystemStatus => "SYSTEM_STATUS",
            Self::SystemMaintenance => "SYSTEM_MAINTENANCE",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }

    /// Parses a wire type string into a member of the closed set.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ANALYTICS_UPDATE" => Some(Self::AnalyticsUpdate),
            "METRICS_UPDATE" => Some(Self::MetricsUpdate),
            "DASHBOARD_UPDATE" => Some(Self::DashboardUpdate),
            "TREND_UPDATE" => Some(Self::TrendUpdate),
            "FORECAST_UPDATE" => Some(Self::ForecastUpdate),
            "ALERT" => Some(Self::Alert),
            "NOTIFICATION" => Some(Self::Notification),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "STATUS_UPDATE" => Some(Self::StatusUpdate),
            "PROGRESS_UPDATE" => Some(Self::ProgressUpdate),
            "COMPLETION" => Some(Self::Completion),
            "DATA_UPDATE" => Some(Self::DataUpdate),
            "DATA_SYNC" => Some(Self::DataSync),
            "DATA_VALIDATION" => Some(Self::DataValidation),
            "USER_ACTION" => Some(Self::UserAction),
            "USER_PREFERENCE" => Some(Self::UserPreference),
            "USER_STATUS" => Some(Self::UserStatus),
            "SYSTEM_STATUS" => Some(Self::SystemStatus),
            "SYSTEM_MAINTENANCE" => Some(Self::SystemMaintenance),
            "SYSTEM_ERROR" => Some(Self::SystemError),
            _ => None,
        }
    }

    /// The broadcast topic the built-in dispatch routes this type to.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::AnalyticsUpdate => "/topic/analytics/updates",
            Self::MetricsUpdate => "/topic/analytics/metrics",
            Self::DashboardUpdate => "/topic/dashboard/updates",
            Self::TrendUpdate => "/topic/analytics/trends",
            Self::ForecastUpdate => "/topic/analytics/forecasts",
            Self::Alert => "/topic/alerts",
            Self::Notification => "/topic/notifications",
            Self::Warning => "/topic/warnings",
            Self::Error => "/topic/errors",
            Self::StatusUpdate => "/topic/status",
            Self::ProgressUpdate => "/topic/progress",
            Self::Completion => "/topic/completion",
            Self::DataUpdate => "/topic/data/updates",
            Self::DataSync => "/topic/data/sync",
            Self::DataValidation => "/topic/data/validation",
            Self::UserAction => "/topic/user/actions",
            Self::UserPreference => "/topic/user/preferences",
            Self::UserStatus => "/topic/user/status",
            Self::SystemStatus => "/topic/system/status",
            Self::SystemMaintenance => "/topic/system/maintenance",
            Self::SystemError => "/topic/system/errors",
        }
    }
}

/// Processing status carried in every message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Success,
    Error,
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Alert priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip_for_all_types() {
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_wire(t.as_wire()), Some(t));
        }
    }

    #[test]
    fn test_unknown_wire_type() {
        assert_eq!(MessageType::from_wire("BOGUS_TYPE"), None);
        assert_eq!(MessageType::from_wire("alert"), None);
    }

    #[test]
    fn test_status_serde() {
        let s: MessageStatus = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(s, MessageStatus::Success);
        assert_eq!(serde_json::to_string(&MessageStatus::Failed).unwrap(), "\"FAILED\"");
    }
}
