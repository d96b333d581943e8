//! Destination authorization policy table.
//!
//! Maps hierarchical destination prefixes to the role sets allowed to
//! subscribe or send there. The most specific matching prefix wins and
//! anything unlisted is denied.

use crate::role::Role;

/// Who may use destinations under a given prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No authentication required.
    Public,
    /// Any authenticated principal.
    Authenticated,
    /// Any one of the listed roles (ANY semantics).
    Roles(Vec<Role>),
}

/// One policy entry: a path prefix and the access it requires.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    /// Destination path prefix, e.g. `/topic/orders`.
    pub prefix: String,
    /// Required access.
    pub access: Access,
}

/// Ordered set of destination policy rules with default-deny fallback.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
}

impl PolicyTable {
    /// Creates an empty table (denies everything).
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard StoreGate policy covering every business category.
    pub fn standard() -> Self {
        let mut table = Self::new();

        table.permit_public("/topic/public");
        table.permit_public("/app/public");

        table.permit_roles(
            "/topic/analytics",
            &[Role::Admin, Role::Manager, Role::Analyst],
        );
        table.permit_roles("/app/analytics", &[Role::Admin, Role::Manager, Role::Analyst]);

        table.permit_roles("/topic/dashboard", &[Role::Admin, Role::Manager]);
        table.permit_roles("/app/dashboard", &[Role::Admin, Role::Manager]);

        table.permit_authenticated("/topic/alerts");
        table.permit_roles("/app/alerts", &[Role::Admin, Role::Manager]);

        table.permit_roles(
            "/topic/inventory",
            &[Role::Admin, Role::Manager, Role::Inventory],
        );
        table.permit_roles(
            "/app/inventory",
            &[Role::Admin, Role::Manager, Role::Inventory],
        );

        table.permit_roles(
            "/topic/orders",
            &[Role::Admin, Role::Manager, Role::Sales, Role::Cashier],
        );
        table.permit_roles(
            "/app/orders",
            &[Role::Admin, Role::Manager, Role::Sales, Role::Cashier],
        );

        table.permit_roles("/topic/customers", &[Role::Admin, Role::Manager, Role::Sales]);
        table.permit_roles("/app/customers", &[Role::Admin, Role::Manager, Role::Sales]);

        table.permit_roles("/topic/employees", &[Role::Admin, Role::Hr]);
        table.permit_roles("/app/employees", &[Role::Admin, Role::Hr]);

        table.permit_roles("/topic/payments", &[Role::Admin, Role::Finance]);
        table.permit_roles("/app/payments", &[Role::Admin, Role::Finance]);

        table.permit_roles("/topic/reports", &[Role::Admin, Role::Manager, Role::Analyst]);
        table.permit_roles("/app/reports", &[Role::Admin, Role::Manager, Role::Analyst]);

        table.permit_authenticated("/topic/notifications");
        table.permit_roles("/app/notifications", &[Role::Admin, Role::Manager]);

        table.permit_authenticated("/topic/system");
        table.permit_roles("/app/system", &[Role::Admin]);

        table.permit_roles("/topic/errors", &[Role::Admin]);
        table.permit_roles("/app/errors", &[Role::Admin]);

        table.permit_roles("/topic/admin", &[Role::Admin]);
        table.permit_roles("/app/admin", &[Role::Admin]);

        table.permit_roles("/topic/audit", &[Role::Admin]);
        table.permit_roles("/app/audit", &[Role::Admin]);

        table.permit_authenticated("/topic/groups");
        table.permit_authenticated("/topic/heartbeat");

        // User-addressed queues; the transport scopes them per session.
        table.permit_authenticated("/user");
        table.permit_authenticated("/app/user");

        table
    }

    /// Adds a rule permitting anyone under `prefix`.
    pub fn permit_public(&mut self, prefix: &str) {
        self.push(prefix, Access::Public);
    }

    /// Adds a rule permitting any authenticated principal under `prefix`.
    pub fn permit_authenticated(&mut self, prefix: &str) {
        self.push(prefix, Access::Authenticated);
    }

    /// Adds a rule permitting the listed roles under `prefix`.
    pub fn permit_roles(&mut self, prefix: &str, roles: &[Role]) {
        self.push(prefix, Access::Roles(roles.to_vec()));
    }

    fn push(&mut self, prefix: &str, access: Access) {
        self.rules.push(PolicyRule {
            prefix: prefix.to_string(),
            access,
        });
    }

    /// Finds the most specific rule whose prefix covers `destination`.
    ///
    /// Prefixes match on whole path segments: `/topic/orders` covers
    /// `/topic/orders` and `/topic/orders/updates` but not
    /// `/topic/ordersarchive`.
    pub fn matching_rule(&self, destination: &str) -> Option<&PolicyRule> {
        self.rules
            .iter()
            .filter(|rule| prefix_covers(&rule.prefix, destination))
            .max_by_key(|rule| rule.prefix.len())
    }

    /// Checks whether the given role set may use `destination`.
    ///
    /// Returns `false` for any destination without a matching rule
    /// (default deny).
    pub fn is_allowed(&self, destination: &str, roles: &[Role]) -> bool {
        match self.matching_rule(destination) {
            Some(rule) => match &rule.access {
                Access::Public => true,
                Access::Authenticated => !roles.is_empty(),
                Access::Roles(required) => roles.iter().any(|r| required.contains(r)),
            },
            None => false,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Segment-aware prefix test.
fn prefix_covers(prefix: &str, destination: &str) -> bool {
    if !destination.starts_with(prefix) {
        return false;
    }
    destination.len() == prefix.len() || destination.as_bytes()[prefix.len()] == b'/'
}
