//! Access gate for the prediction routes
//!
//! A request is admitted as a guest when it carries the guest marker, as an
//! authenticated user when it carries a bearer credential that verifies, and
//! denied otherwise. Rules are evaluated in order and the first one that
//! reaches a decision wins.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Reason given when no rule admits the request
pub const AUTHENTICATION_REQUIRED: &str = "authentication required";

/// Resolved caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

/// Outcome of the access gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Guest,
    AuthenticatedUser(Identity),
    Denied { reason: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }

    /// Label used for the access metric
    pub fn label(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::AuthenticatedUser(_) => "user",
            Self::Denied { .. } => "denied",
        }
    }
}

/// The parts of a request the gate looks at
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    /// Guest marker present and set to "true"
    pub guest_marker: bool,
    /// Bearer credential, if any
    pub bearer: Option<String>,
}

impl AccessRequest {
    pub fn from_headers(headers: &HeaderMap, guest_header: &str) -> Self {
        let guest_marker = headers
            .get(guest_header)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
            .map(str::to_string);

        Self {
            guest_marker,
            bearer,
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` value
fn extract_bearer(auth: &str) -> Option<&str> {
    let auth = auth.trim();
    let (scheme, token) = auth.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves a bearer credential to an identity
pub trait CredentialVerifier: Send + Sync {
    /// `None` when the credential is malformed, expired, or names no known user
    fn verify(&self, token: &str) -> Option<Identity>;
}

/// One step of the gate
pub trait AccessRule: Send + Sync {
    /// Rule name for logging
    fn name(&self) -> &'static str;

    /// `None` passes the request on to the next rule
    fn evaluate(&self, request: &AccessRequest) -> Option<AccessDecision>;
}

/// Admits any request carrying the guest marker
pub struct GuestMarkerRule;

impl AccessRule for GuestMarkerRule {
    fn name(&self) -> &'static str {
        "guest_marker"
    }

    fn evaluate(&self, request: &AccessRequest) -> Option<AccessDecision> {
        request.guest_marker.then_some(AccessDecision::Guest)
    }
}

/// Admits requests whose bearer credential verifies.
///
/// An invalid credential does not deny on its own; the request falls through
/// to the remaining rules.
pub struct BearerCredentialRule {
    verifier: Arc<dyn CredentialVerifier>,
}

impl BearerCredentialRule {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

impl AccessRule for BearerCredentialRule {
    fn name(&self) -> &'static str {
        "bearer_credential"
    }

    fn evaluate(&self, request: &AccessRequest) -> Option<AccessDecision> {
        let token = request.bearer.as_deref()?;
        self.verifier.verify(token).map(AccessDecision::AuthenticatedUser)
    }
}

/// Ordered list of access rules
pub struct AccessGate {
    rules: Vec<Box<dyn AccessRule>>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Guest marker first, then bearer credential
    pub fn standard(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self::new()
            .with_rule(GuestMarkerRule)
            .with_rule(BearerCredentialRule::new(verifier))
    }

    pub fn with_rule(mut self, rule: impl AccessRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn decide(&self, request: &AccessRequest) -> AccessDecision {
        for rule in &self.rules {
            if let Some(decision) = rule.evaluate(request) {
                debug!(rule = rule.name(), decision = decision.label(), "Access rule matched");
                return decision;
            }
        }

        AccessDecision::Denied {
            reason: AUTHENTICATION_REQUIRED.to_string(),
        }
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware guarding the prediction routes.
///
/// Runs before the body is read, so a denied request never reaches
/// validation or a model.
pub async fn require_access(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request = AccessRequest::from_headers(req.headers(), &state.config.auth.guest_header);
    let decision = state.gate.decide(&request);

    metrics::counter!("playcaller_access_total", "decision" => decision.label()).increment(1);

    if let AccessDecision::Denied { reason } = decision {
        return Err(ApiError::Denied(reason));
    }

    req.extensions_mut().insert(decision);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct SingleToken;

    impl CredentialVerifier for SingleToken {
        fn verify(&self, token: &str) -> Option<Identity> {
            (token == "good-token").then(|| Identity {
                user_id: Uuid::nil(),
                username: "coach".to_string(),
            })
        }
    }

    fn gate() -> AccessGate {
        AccessGate::standard(Arc::new(SingleToken))
    }

    fn request(guest: bool, bearer: Option<&str>) -> AccessRequest {
        AccessRequest {
            guest_marker: guest,
            bearer: bearer.map(str::to_string),
        }
    }

    #[test]
    fn test_guest_marker_admits() {
        assert_eq!(gate().decide(&request(true, None)), AccessDecision::Guest);
    }

    #[test]
    fn test_guest_marker_wins_over_invalid_credential() {
        assert_eq!(gate().decide(&request(true, Some("forged"))), AccessDecision::Guest);
    }

    #[test]
    fn test_valid_credential_authenticates() {
        match gate().decide(&request(false, Some("good-token"))) {
            AccessDecision::AuthenticatedUser(identity) => assert_eq!(identity.username, "coach"),
            other => panic!("expected authenticated user, got {:?}", other),
        }
    }

    #[test]
    fn test_no_marker_no_credential_is_denied() {
        assert_eq!(
            gate().decide(&request(false, None)),
            AccessDecision::Denied {
                reason: "authentication required".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_credential_without_marker_is_denied() {
        let decision = gate().decide(&request(false, Some("expired")));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_empty_gate_denies() {
        assert!(!AccessGate::new().decide(&request(true, Some("good-token"))).is_allowed());
    }

    #[test]
    fn test_request_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-guest", HeaderValue::from_static("TRUE"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));

        let req = AccessRequest::from_headers(&headers, "x-guest");
        assert!(req.guest_marker);
        assert_eq!(req.bearer.as_deref(), Some("abc.def"));

        headers.insert("x-guest", HeaderValue::from_static("false"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        let req = AccessRequest::from_headers(&headers, "x-guest");
        assert!(!req.guest_marker);
        assert!(req.bearer.is_none());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer token"), Some("token"));
        assert_eq!(extract_bearer("bearer  token "), Some("token"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("token"), None);
    }
}
