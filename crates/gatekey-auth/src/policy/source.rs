//! Permission sources.
//!
//! A source maps a role name to the set of route names that role may invoke.
//! Matching is exact and case-sensitive; the queried route name is trimmed of
//! surrounding whitespace first. There is no wildcard or prefix matching.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// Route names granted to one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteSet(HashSet<String>);

impl RouteSet {
    /// Returns `true` if `route` (trimmed) is in the set.
    #[must_use]
    pub fn permits(&self, route: &str) -> bool {
        self.0.contains(route.trim())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RouteSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|route| route.into().trim().to_string())
                .collect(),
        )
    }
}

/// Source of role grants.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Routes granted to `role`. Unknown roles yield an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn routes_for(&self, role: &str) -> AuthResult<RouteSet>;

    /// Returns `true` if `role` may invoke `route`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    async fn lookup(&self, role: &str, route: &str) -> AuthResult<bool> {
        Ok(self.routes_for(role).await?.permits(route))
    }
}

/// Grants fixed at startup, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    roles: HashMap<String, RouteSet>,
}

impl StaticPermissions {
    #[must_use]
    pub fn new(roles: HashMap<String, RouteSet>) -> Self {
        Self { roles }
    }

    /// Builds grants from the `authorization.roles` configuration map.
    #[must_use]
    pub fn from_config(roles: &HashMap<String, Vec<String>>) -> Self {
        Self::new(
            roles
                .iter()
                .map(|(role, routes)| (role.clone(), routes.iter().cloned().collect()))
                .collect(),
        )
    }

    /// Adds or replaces the grants of one role.
    #[must_use]
    pub fn with_role<I, S>(mut self, role: impl Into<String>, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.insert(role.into(), routes.into_iter().collect());
        self
    }
}

#[async_trait]
impl PermissionSource for StaticPermissions {
    async fn routes_for(&self, role: &str) -> AuthResult<RouteSet> {
        Ok(self.roles.get(role).cloned().unwrap_or_default())
    }

    async fn lookup(&self, role: &str, route: &str) -> AuthResult<bool> {
        Ok(self.roles.get(role).is_some_and(|r| r.permits(route)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions() -> StaticPermissions {
        StaticPermissions::default()
            .with_role("admin", ["GetAllUsers", "GetUser"])
            .with_role("user", ["GetUser"])
    }

    #[tokio::test]
    async fn test_exact_match() {
        let p = permissions();
        assert!(p.lookup("admin", "GetAllUsers").await.unwrap());
        assert!(p.lookup("user", "GetUser").await.unwrap());
        assert!(!p.lookup("user", "GetAllUsers").await.unwrap());
    }

    #[tokio::test]
    async fn test_route_is_trimmed_but_case_sensitive() {
        let p = permissions();
        assert!(p.lookup("user", "  GetUser\n").await.unwrap());
        assert!(!p.lookup("user", "getuser").await.unwrap());
        assert!(!p.lookup("user", "Get").await.unwrap());
        assert!(!p.lookup("user", "GetUser*").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_role_has_no_routes() {
        let p = permissions();
        assert!(!p.lookup("guest", "GetUser").await.unwrap());
        assert!(p.routes_for("guest").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_config() {
        let mut roles = HashMap::new();
        roles.insert("auditor".to_string(), vec!["ReadLogs".to_string()]);
        let p = StaticPermissions::from_config(&roles);
        assert!(p.lookup("auditor", "ReadLogs").await.unwrap());
        assert_eq!(p.routes_for("auditor").await.unwrap().len(), 1);
    }

    #[test]
    fn test_route_set_from_json_array() {
        let set: RouteSet = serde_json::from_str(r#"["GetUser", "GetAllUsers"]"#).unwrap();
        assert!(set.permits("GetAllUsers"));
        assert_eq!(set.len(), 2);
    }
}
