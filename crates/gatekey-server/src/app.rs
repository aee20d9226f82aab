//! Wiring of keys, stores, permissions and mail into an [`AuthState`].

use std::sync::Arc;

use anyhow::{Context, anyhow};
use gatekey_auth::config::PermissionSourceKind;
use gatekey_auth::password::{generate_token_hash, hash_password};
use gatekey_auth::service::AuthStores;
use gatekey_auth::{
    AuthService, AuthState, KeyRing, MailDispatcher, MemoryStore, NewPrincipal, PermissionSource,
    StaticPermissions, UserStorage,
};
use gatekey_auth_postgres::PostgresAuthStorage;
use time::OffsetDateTime;

use crate::config::{AdminUserConfig, AppConfig, StorageBackend};

/// Builds the shared HTTP state with the dispatcher selected by `mail`.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AuthState> {
    let mailer = gatekey_notifications::dispatcher_from_config(&cfg.mail)
        .context("mail dispatcher initialization failed")?;
    build_state_with_mailer(cfg, mailer).await
}

/// Builds the shared HTTP state around the given mail dispatcher.
pub async fn build_state_with_mailer(
    cfg: &AppConfig,
    mailer: Arc<dyn MailDispatcher>,
) -> anyhow::Result<AuthState> {
    let keys = KeyRing::from_config(&cfg.auth.signing).context("signing key setup failed")?;
    tracing::info!(kid = %keys.current_kid(), "Signing key ring ready");

    let mut stores = build_stores(cfg).await?;
    if cfg.auth.authorization.source == PermissionSourceKind::Static {
        let permissions: Arc<dyn PermissionSource> =
            Arc::new(StaticPermissions::from_config(&cfg.auth.authorization.roles));
        stores.permissions = permissions;
    }

    if let Some(ref admin) = cfg.bootstrap.admin_user {
        bootstrap_admin(stores.users.as_ref(), admin).await?;
    }

    let service = AuthService::new(&cfg.auth, Arc::new(keys), stores, mailer);
    Ok(AuthState::new(service))
}

async fn build_stores(cfg: &AppConfig) -> anyhow::Result<AuthStores> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            // The memory backend has no table to read grants from
            for (role, routes) in &cfg.auth.authorization.roles {
                store.grant_routes(role, routes.iter().cloned());
            }
            tracing::warn!("Using in-memory storage; state is lost on restart");
            Ok(AuthStores {
                users: store.clone(),
                refresh_tokens: store.clone(),
                codes: store.clone(),
                permissions: store,
            })
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow!("storage.postgres is required for the postgres backend"))?;
            let storage = PostgresAuthStorage::connect(&pg.url, pg.pool_size)
                .await
                .context("postgres connection failed")?;
            storage
                .bootstrap()
                .await
                .context("postgres schema bootstrap failed")?;
            let swept = storage
                .codes()
                .cleanup_expired(OffsetDateTime::now_utc())
                .await
                .context("expired code sweep failed")?;
            tracing::info!(pool_size = pg.pool_size, swept, "PostgreSQL storage ready");
            Ok(storage.stores())
        }
    }
}

/// Creates the configured admin as a verified principal unless the email is
/// already registered.
async fn bootstrap_admin(users: &dyn UserStorage, admin: &AdminUserConfig) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();
    if users.find_by_email(&email).await?.is_some() {
        tracing::debug!(email = %email, "Admin user already exists");
        return Ok(());
    }

    let password_hash =
        hash_password(&admin.password).map_err(|e| anyhow!("admin password hashing failed: {e}"))?;
    let principal = users
        .create(&NewPrincipal {
            username: admin.username.trim().to_string(),
            email: email.clone(),
            role: admin.role.clone(),
            password_hash,
            token_hash: generate_token_hash(),
        })
        .await?;
    users.set_verified(&email, true).await?;

    tracing::info!(username = %principal.username, role = %principal.role, "Admin user created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminUserConfig;
    use gatekey_auth::mail::Outbox;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.auth.signing.secret = Some("a-test-secret-that-is-at-least-32-bytes".to_string());
        cfg
    }

    #[tokio::test]
    async fn test_missing_secret_fails() {
        let mut cfg = AppConfig::default();
        cfg.auth.signing.secret_env = "GATEKEY_TEST_UNSET_SECRET".to_string();
        let err = build_state_with_mailer(&cfg, Arc::new(Outbox::new())).await.err().unwrap();
        assert!(err.to_string().contains("signing key"));
    }

    #[tokio::test]
    async fn test_admin_bootstrap_is_idempotent() {
        let store = MemoryStore::new();
        let admin = AdminUserConfig {
            username: "root".to_string(),
            password: "correct-horse".to_string(),
            email: "Root@Example.com".to_string(),
            role: "admin".to_string(),
        };

        bootstrap_admin(&store, &admin).await.unwrap();
        bootstrap_admin(&store, &admin).await.unwrap();

        let users = store.list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "root@example.com");
        assert!(users[0].is_verified);
    }

    #[tokio::test]
    async fn test_admin_can_log_in() {
        let mut cfg = config();
        cfg.bootstrap.admin_user = Some(AdminUserConfig {
            username: "root".to_string(),
            password: "correct-horse".to_string(),
            email: "root@example.com".to_string(),
            role: "admin".to_string(),
        });

        let state = build_state_with_mailer(&cfg, Arc::new(Outbox::new())).await.unwrap();
        let pair = state.service.login("root", "correct-horse").await.unwrap();
        assert!(!pair.access_token.is_empty());
    }
}
