//! Role permissions for PostgreSQL.
//!
//! `role_permission.routes` holds a JSON array of route names.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;

use gatekey_auth::AuthResult;
use gatekey_auth::policy::{PermissionSource, RouteSet};

use crate::{PgPool, StorageError, map_storage_error};

fn parse_routes(routes: serde_json::Value) -> Result<RouteSet, StorageError> {
    let routes: Vec<String> = serde_json::from_value(routes)?;
    Ok(RouteSet::from_iter(routes))
}

/// Arc-owning PostgreSQL permission source.
#[derive(Clone)]
pub struct PgPermissionSource {
    pool: Arc<PgPool>,
}

impl PgPermissionSource {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Replaces the routes granted to `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database upsert fails.
    pub async fn grant(&self, role: &str, routes: &[String]) -> AuthResult<()> {
        let routes = serde_json::to_value(routes)
            .map_err(|e| map_storage_error(StorageError::from(e)))?;

        query(
            r#"
            INSERT INTO role_permission (role_name, routes)
            VALUES ($1, $2)
            ON CONFLICT (role_name) DO UPDATE SET routes = EXCLUDED.routes
            "#,
        )
        .bind(role)
        .bind(&routes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_storage_error(e.into()))?;

        tracing::info!(role, "Role permissions updated");
        Ok(())
    }
}

#[async_trait]
impl PermissionSource for PgPermissionSource {
    async fn routes_for(&self, role: &str) -> AuthResult<RouteSet> {
        let routes: Option<serde_json::Value> =
            query_scalar("SELECT routes FROM role_permission WHERE role_name = $1")
                .bind(role)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_storage_error(e.into()))?;

        match routes {
            Some(routes) => parse_routes(routes).map_err(map_storage_error),
            None => Ok(RouteSet::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_routes() {
        let routes = parse_routes(json!(["GetAllUsers", "GetUser"])).unwrap();
        assert!(routes.permits("GetUser"));
        assert!(!routes.permits("DeleteUser"));
    }

    #[test]
    fn test_parse_routes_rejects_non_arrays() {
        let err = parse_routes(json!({"GetUser": true})).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
