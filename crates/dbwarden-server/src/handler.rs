//! Request handler: verify the claim, parse its attributes, apply the rules.

use chrono::{DateTime, Utc};
use dbwarden::{
    AccessDate, AccessWindow, AccessWindowUpdater, AppliedRule, ApplyReport, Decision, FailedRule,
    ParseError, ParseWarning, ResourceName, SubjectId, evaluate_at, parse,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::{ClaimError, ClaimVerifier};
use crate::error::ServerError;
use crate::http::{HttpRequest, HttpResponse};

/// Acknowledgement sent for every claim that passed verification.
pub const CLAIM_RECEIVED: &str = "JWT received!";

// ============================================================================
// Outcome
// ============================================================================

/// Overall result of one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Every entry parsed and every rule was persisted.
    FullyApplied,
    /// Some rules were persisted, but there were errors.
    PartiallyApplied,
    /// Verification failed, or nothing was applied and errors occurred.
    Rejected,
}

/// Why verification rejected a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ClaimError> for Rejection {
    fn from(error: &ClaimError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Everything that happened to one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome {
    pub status: ClaimStatus,
    pub subject: Option<SubjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    pub applied: Vec<AppliedRule>,
    pub failed: Vec<FailedRule>,
    pub parse_errors: Vec<ParseError>,
    pub warnings: Vec<ParseWarning>,
}

impl ClaimOutcome {
    fn rejected(error: &ClaimError) -> Self {
        Self {
            status: ClaimStatus::Rejected,
            subject: None,
            rejection: Some(Rejection::from(error)),
            applied: Vec::new(),
            failed: Vec::new(),
            parse_errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn from_report(
        report: ApplyReport,
        parse_errors: Vec<ParseError>,
        warnings: Vec<ParseWarning>,
    ) -> Self {
        let clean = report.failed.is_empty() && parse_errors.is_empty();
        let status = if clean {
            ClaimStatus::FullyApplied
        } else if report.applied.is_empty() {
            ClaimStatus::Rejected
        } else {
            ClaimStatus::PartiallyApplied
        };

        Self {
            status,
            subject: Some(report.subject),
            rejection: None,
            applied: report.applied,
            failed: report.failed,
            parse_errors,
            warnings,
        }
    }

    /// True when verification itself failed.
    pub fn is_unauthorized(&self) -> bool {
        self.rejection.is_some()
    }
}

#[derive(Serialize)]
struct ClaimResponse<'a> {
    server_message: &'a str,
    #[serde(flatten)]
    outcome: &'a ClaimOutcome,
}

#[derive(Deserialize)]
struct ClaimRequest {
    client_message: String,
}

/// Body of `PUT /access/{subject}/{resource}`. Absent dates are stored unset.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WindowRequest {
    #[serde(default)]
    access_until: Option<AccessDate>,
    #[serde(default)]
    deny_until: Option<AccessDate>,
}

#[derive(Serialize)]
struct WindowStored<'a> {
    server_message: String,
    rows_affected: u64,
    window: &'a AccessWindow,
}

#[derive(Serialize)]
struct CheckResponse<'a> {
    subject: &'a str,
    resource: &'a str,
    #[serde(flatten)]
    decision: Decision,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
}

// ============================================================================
// Handler
// ============================================================================

/// Routes requests to the claim pipeline and the window queries.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    verifier: ClaimVerifier,
    updater: AccessWindowUpdater,
}

impl RequestHandler {
    pub fn new(verifier: ClaimVerifier, updater: AccessWindowUpdater) -> Self {
        Self { verifier, updater }
    }

    pub fn updater(&self) -> &AccessWindowUpdater {
        &self.updater
    }

    /// Runs one claim token through verification, parsing and application.
    ///
    /// Nothing touches the store unless verification succeeds.
    #[instrument(skip_all)]
    pub fn handle_claim(&self, token: &str, now: DateTime<Utc>) -> ClaimOutcome {
        let claim = match self.verifier.verify(token) {
            Ok(claim) => claim,
            Err(error) => {
                warn!(kind = error.kind(), %error, "claim rejected");
                return ClaimOutcome::rejected(&error);
            }
        };

        let parsed = parse(&claim.dbauth);
        let report = self.updater.apply(&claim.subject, &parsed.rules, now);
        let outcome = ClaimOutcome::from_report(report, parsed.errors, parsed.warnings);

        info!(
            subject = %claim.subject,
            status = ?outcome.status,
            applied = outcome.applied.len(),
            failed = outcome.failed.len(),
            parse_errors = outcome.parse_errors.len(),
            "claim processed"
        );
        outcome
    }

    /// Dispatches an HTTP request.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub fn handle(&self, request: &HttpRequest, now: DateTime<Utc>) -> HttpResponse {
        let segments = request.segments();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["jwt"]) => self.post_claim(&request.body, now),
            ("GET", ["access", subject, resource]) => self.get_window(subject, resource),
            ("PUT", ["access", subject, resource]) => {
                self.put_window(subject, resource, &request.body)
            }
            ("GET", ["check", subject, resource]) => self.check(subject, resource, now),
            ("GET", ["health"]) => HttpResponse::json(
                200,
                &HealthResponse {
                    status: "ok",
                    store: self.updater.store().name(),
                },
            ),
            (_, ["jwt"] | ["access", _, _] | ["check", _, _] | ["health"]) => {
                HttpResponse::message(405, "method not allowed")
            }
            _ => HttpResponse::message(404, "not found"),
        }
    }

    fn post_claim(&self, body: &[u8], now: DateTime<Utc>) -> HttpResponse {
        let request: ClaimRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => return HttpResponse::message(400, format!("invalid request body: {e}")),
        };

        let outcome = self.handle_claim(&request.client_message, now);
        let (status, message) = match (&outcome.rejection, outcome.status) {
            (Some(rejection), _) if rejection.kind == "invalid_signature" => {
                (401, "wrong JWT signature!".to_string())
            }
            (Some(rejection), _) => (401, rejection.message.clone()),
            (None, ClaimStatus::Rejected) => (422, "no rule could be applied".to_string()),
            (None, _) => (200, CLAIM_RECEIVED.to_string()),
        };

        HttpResponse::json(
            status,
            &ClaimResponse {
                server_message: &message,
                outcome: &outcome,
            },
        )
    }

    fn get_window(&self, subject: &str, resource: &str) -> HttpResponse {
        let store = self.updater.store();
        match store.read(
            &SubjectId::new(subject),
            &ResourceName::new(resource),
            self.updater.timeout(),
        ) {
            Ok(window) => HttpResponse::json(200, &window),
            Err(e) => error_response(&ServerError::from(e)),
        }
    }

    /// Overwrites both dates of one window.
    fn put_window(&self, subject: &str, resource: &str, body: &[u8]) -> HttpResponse {
        let request: WindowRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => return HttpResponse::message(400, format!("invalid request body: {e}")),
        };

        let window = AccessWindow {
            subject: SubjectId::new(subject),
            resource: ResourceName::new(resource),
            access_until: request.access_until,
            deny_until: request.deny_until,
        };
        if window.subject.is_blank() || window.is_unset() {
            return HttpResponse::message(400, "window needs a subject and at least one date");
        }

        match self.updater.store().put(&window, self.updater.timeout()) {
            Ok(rows) => {
                info!(
                    subject = %window.subject,
                    resource = %window.resource,
                    rows,
                    "window stored"
                );
                HttpResponse::json(
                    200,
                    &WindowStored {
                        server_message: format!("{rows} rows inserted"),
                        rows_affected: rows,
                        window: &window,
                    },
                )
            }
            Err(e) => error_response(&ServerError::from(e)),
        }
    }

    fn check(&self, subject: &str, resource: &str, now: DateTime<Utc>) -> HttpResponse {
        let store = self.updater.store();
        match store.find(
            &SubjectId::new(subject),
            &ResourceName::new(resource),
            self.updater.timeout(),
        ) {
            Ok(window) => HttpResponse::json(
                200,
                &CheckResponse {
                    subject,
                    resource,
                    decision: evaluate_at(window.as_ref(), now),
                },
            ),
            Err(e) => error_response(&ServerError::from(e)),
        }
    }
}

/// Maps a server error onto its status and `server_message` body.
pub fn error_response(error: &ServerError) -> HttpResponse {
    HttpResponse::message(error.status(), error.to_string())
}
