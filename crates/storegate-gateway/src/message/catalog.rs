//! Fixed destination catalog for the business categories.
//!
//! Broadcast topics are `/topic/...`; user-addressed queues are built
//! with [`user_queue`].

// Analytics
pub const ANALYTICS_UPDATES: &str = "/topic/analytics/updates";
pub const ANALYTICS_DASHBOARD: &str = "/topic/analytics/dashboard";
pub const ANALYTICS_SALES: &str = "/topic/analytics/sales";
pub const ANALYTICS_REVENUE: &str = "/topic/analytics/revenue";

// Alerts
pub const ALERTS: &str = "/topic/alerts";
pub const LOW_STOCK_ALERTS: &str = "/topic/alerts/low-stock";
pub const SYSTEM_ALERTS: &str = "/topic/alerts/system";

// Orders
pub const ORDER_UPDATES: &str = "/topic/orders/updates";
pub const NEW_ORDERS: &str = "/topic/orders/new";
pub const ORDER_STATUS: &str = "/topic/orders/status";

// Inventory
pub const INVENTORY_UPDATES: &str = "/topic/inventory/updates";
pub const STOCK_LEVELS: &str = "/topic/inventory/stock-levels";

// Customers
pub const CUSTOMER_UPDATES: &str = "/topic/customers/updates";

// Employees
pub const EMPLOYEE_UPDATES: &str = "/topic/employees/updates";

// Payments
pub const PAYMENT_UPDATES: &str = "/topic/payments/updates";
pub const NEW_PAYMENTS: &str = "/topic/payments/new";

// Reports
pub const REPORT_UPDATES: &str = "/topic/reports/updates";

// System
pub const SYSTEM_STATUS: &str = "/topic/system/status";
pub const HEARTBEAT: &str = "/topic/heartbeat";

// Admin
pub const ADMIN_CONNECTIONS: &str = "/topic/admin/connections";
pub const ERROR_BROADCAST: &str = "/topic/errors";

// Per-session queue suffixes
pub const QUEUE_ERRORS: &str = "/queue/errors";
pub const QUEUE_WELCOME: &str = "/queue/welcome";
pub const QUEUE_EXPIRATION: &str = "/queue/expiration";
pub const QUEUE_HEARTBEAT: &str = "/queue/heartbeat";
pub const QUEUE_NOTIFICATIONS: &str = "/queue/notifications";

/// Builds the private queue destination for one session.
pub fn user_queue(session_id: &str, suffix: &str) -> String {
    format!("/user/{session_id}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_queue_path() {
        assert_eq!(user_queue("abc", QUEUE_ERRORS), "/user/abc/queue/errors");
    }
}
