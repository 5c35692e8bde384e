//! Dashboard routes and their parameters.

use std::collections::BTreeMap;
use std::fmt;

/// Path of the stores list.
pub const STORES_PATH: &str = "/stores";
/// Path prefix of the node pages.
pub const NODES_PATH: &str = "/nodes";

/// A page the dashboard can mount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/stores`
    Stores,
    /// `/stores/{store_id}`
    Store {
        /// Store id exactly as it appeared in the path.
        store_id: String,
    },
    /// `/nodes/{node_id}`
    Node {
        /// Node id exactly as it appeared in the path.
        node_id: String,
    },
}

impl Route {
    /// Canonical path for this route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Stores => STORES_PATH.to_string(),
            Self::Store { store_id } => store_href(store_id),
            Self::Node { node_id } => node_href(node_id),
        }
    }

    /// Named parameters captured by the route.
    #[must_use]
    pub fn params(&self) -> RouteParams {
        match self {
            Self::Stores => RouteParams::default(),
            Self::Store { store_id } => RouteParams::default().with("store_id", store_id.clone()),
            Self::Node { node_id } => RouteParams::default().with("node_id", node_id.clone()),
        }
    }

    /// Stable page label used in logs and metrics.
    #[must_use]
    pub const fn page_name(&self) -> &'static str {
        match self {
            Self::Stores => "stores",
            Self::Store { .. } => "store",
            Self::Node { .. } => "node",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Named route parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    values: BTreeMap<String, String>,
}

impl RouteParams {
    /// Add or replace parameter `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Value of parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Numeric id carried by a route parameter.
///
/// Only the canonical decimal form is accepted: `01` is not store 1, because
/// chart series are named after the raw parameter.
#[must_use]
pub fn parse_id(raw: &str) -> Option<i32> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| id.to_string() == raw)
}

/// Link target for a store page.
#[must_use]
pub fn store_href(store_id: impl fmt::Display) -> String {
    format!("{STORES_PATH}/{store_id}")
}

/// Link target for a node page.
#[must_use]
pub fn node_href(node_id: impl fmt::Display) -> String {
    format!("{NODES_PATH}/{node_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_canonical() {
        assert_eq!(parse_id("4"), Some(4));
        assert_eq!(parse_id("-2"), Some(-2));
        assert_eq!(parse_id("04"), None);
        assert_eq!(parse_id(" 4"), None);
        assert_eq!(parse_id("+4"), None);
        assert_eq!(parse_id("abc"), None);
    }

    #[test]
    fn path_and_params_round_trip_the_id() {
        let route = Route::Store {
            store_id: "12".to_string(),
        };
        assert_eq!(route.path(), "/stores/12");
        assert_eq!(route.params().param("store_id"), Some("12"));
        assert_eq!(route.params().param("node_id"), None);
        assert_eq!(route.to_string(), "/stores/12");
        assert_eq!(node_href(3), "/nodes/3");
    }
}
