use axum::{routing::get, Router};
use std::sync::Arc;
use testpulse::ReportSettings;

use crate::handlers::{get_active_tests, AppState};

pub const ACTIVE_TESTS_ROUTE_NAME: &str = "testpulse - ActiveTests";
pub const ACTIVE_TESTS_ACTION: &str = "Tests/GetActiveTests";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRoute {
    pub name: String,
    pub path: String,
}

/// Named routes, registered at most once each.
pub struct RouteTable {
    routes: Vec<RegisteredRoute>,
    router: Router<Arc<AppState>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            router: Router::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.iter().any(|r| r.name == name)
    }

    pub fn routes(&self) -> &[RegisteredRoute] {
        &self.routes
    }

    /// Registers `GET {prefix}Tests/GetActiveTests`. Returns whether a route was added.
    pub fn register_active_tests(&mut self, settings: &ReportSettings) -> bool {
        if !settings.automatic_testing_enabled {
            tracing::info!("automatic content testing disabled; active tests route not registered");
            return false;
        }
        if self.contains(ACTIVE_TESTS_ROUTE_NAME) {
            tracing::warn!(
                "route '{}' is already registered; skipping",
                ACTIVE_TESTS_ROUTE_NAME
            );
            return false;
        }

        let path = match settings.command_route_prefix.trim_matches('/') {
            "" => format!("/{}", ACTIVE_TESTS_ACTION),
            prefix => format!("/{}/{}", prefix, ACTIVE_TESTS_ACTION),
        };
        let router = std::mem::take(&mut self.router);
        self.router = router.route(&path, get(get_active_tests));
        tracing::info!("registered route '{}' at {}", ACTIVE_TESTS_ROUTE_NAME, path);
        self.routes.push(RegisteredRoute {
            name: ACTIVE_TESTS_ROUTE_NAME.to_string(),
            path,
        });
        true
    }

    pub fn into_router(self) -> Router<Arc<AppState>> {
        self.router
    }
}
