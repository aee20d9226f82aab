//! Route authorization.
//!
//! This module provides:
//!
//! - [`PermissionSource`]: where role → route grants come from
//! - [`RequestBinding`]: extra identity checks for the "user" role
//! - [`AuthorizationEngine`]: token + route decision entry point

pub mod binding;
pub mod engine;
pub mod source;

pub use binding::{AllowAll, ParamBinding, RequestBinding, RequestParams};
pub use engine::AuthorizationEngine;
pub use source::{PermissionSource, RouteSet, StaticPermissions};
