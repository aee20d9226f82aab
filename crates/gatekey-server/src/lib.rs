pub mod app;
pub mod config;
pub mod middleware;
pub mod observability;
pub mod server;

pub use app::{build_state, build_state_with_mailer};
pub use config::AppConfig;
pub use server::{GatekeyServer, ServerBuilder, build_app};
