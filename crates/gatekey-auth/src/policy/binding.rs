//! Identity binding for "user"-role requests.
//!
//! After the token is verified and before the route check, requests made with
//! a "user" token pass through a [`RequestBinding`]. The default binding
//! accepts everything; [`ParamBinding`] ties a named request parameter to the
//! token's username.

use std::collections::HashMap;

use crate::token::AccessClaims;

/// Request parameters (path and query) visible to a binding.
pub type RequestParams = HashMap<String, String>;

/// Decides whether a request is consistent with the token that made it.
pub trait RequestBinding: Send + Sync {
    fn is_request_verified(&self, claims: &AccessClaims, params: &RequestParams) -> bool;
}

/// Accepts every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RequestBinding for AllowAll {
    fn is_request_verified(&self, _claims: &AccessClaims, _params: &RequestParams) -> bool {
        true
    }
}

/// Requires `param`, when present, to equal the token username.
#[derive(Debug, Clone)]
pub struct ParamBinding {
    param: String,
}

impl ParamBinding {
    #[must_use]
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }
}

impl RequestBinding for ParamBinding {
    fn is_request_verified(&self, claims: &AccessClaims, params: &RequestParams) -> bool {
        params
            .get(&self.param)
            .is_none_or(|value| value.trim() == claims.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Identity;
    use std::time::Duration;
    use time::OffsetDateTime;

    fn claims() -> AccessClaims {
        AccessClaims::new(
            Identity::new("alice", "user", "alice@x.com"),
            OffsetDateTime::now_utc(),
            Duration::from_secs(60),
        )
    }

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.is_request_verified(&claims(), &params(&[("username", "bob")])));
    }

    #[test]
    fn test_param_binding() {
        let binding = ParamBinding::new("username");
        assert!(binding.is_request_verified(&claims(), &params(&[])));
        assert!(binding.is_request_verified(&claims(), &params(&[("username", "alice")])));
        assert!(!binding.is_request_verified(&claims(), &params(&[("username", "bob")])));
        assert!(binding.is_request_verified(&claims(), &params(&[("other", "bob")])));
    }
}
