//! Turns one poll response into a [`PollOutcome`].
//!
//! The service answers "not ready yet" with the same 400/404 statuses it uses
//! for real errors; only the message text tells them apart. The decision is
//! therefore a table of [`PendingRule`]s consulted before anything else, so
//! new "still processing" wordings are data, not control flow.

use serde_json::Value;

use crate::config::ServiceConfig;
use crate::error::{TransportError, truncate_body};
use crate::service::HttpReply;
use crate::state_machine::{PollFailure, PollOutcome};

/// Statuses the service reuses for "result not available yet".
pub const NOT_READY_STATUSES: &[u16] = &[400, 404];

/// Known "still processing" wordings, matched case-insensitively.
pub const PENDING_MESSAGES: &[&str] = &[
    "result for parsing job",
    "not completed",
    "still processing",
    "job is pending",
    "in progress",
];

/// A `(statuses, pattern)` entry. A response matches when its status is in
/// `statuses` and, if `pattern` is set, the error message contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRule {
    pub statuses: Vec<u16>,
    pattern: Option<String>,
}

impl PendingRule {
    /// Every response with one of `statuses` is pending.
    pub fn any_message(statuses: &[u16]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            pattern: None,
        }
    }

    pub fn message(statuses: &[u16], pattern: &str) -> Self {
        Self {
            statuses: statuses.to_vec(),
            pattern: Some(pattern.to_lowercase()),
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    fn matches(&self, status: u16, message_lower: &str) -> bool {
        self.statuses.contains(&status)
            && self
                .pattern
                .as_deref()
                .is_none_or(|pattern| message_lower.contains(pattern))
    }
}

/// The default table: 202 always pends, 400/404 pend on known wordings.
pub fn default_rules() -> Vec<PendingRule> {
    let mut rules = vec![PendingRule::any_message(&[202])];
    rules.extend(
        PENDING_MESSAGES
            .iter()
            .map(|pattern| PendingRule::message(NOT_READY_STATUSES, pattern)),
    );
    rules
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<PendingRule>,
    result_field: String,
    transport_retries: u32,
}

impl Classifier {
    pub fn new(result_field: impl Into<String>) -> Self {
        Self {
            rules: default_rules(),
            result_field: result_field.into(),
            transport_retries: 0,
        }
    }

    /// Default rules plus the configured extra wordings and retry budget.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let mut classifier = Self::new(config.result_field.clone())
            .with_transport_retries(config.transport_retries);
        for pattern in &config.pending_messages {
            classifier = classifier.with_rule(PendingRule::message(NOT_READY_STATUSES, pattern));
        }
        classifier
    }

    pub fn with_rule(mut self, rule: PendingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    pub fn rules(&self) -> &[PendingRule] {
        &self.rules
    }

    pub fn result_field(&self) -> &str {
        &self.result_field
    }

    /// Classify a response the service actually sent.
    pub fn classify(&self, reply: &HttpReply) -> PollOutcome {
        let message = error_message(&reply.body);
        let lower = message.to_lowercase();
        if self.rules.iter().any(|rule| rule.matches(reply.status, &lower)) {
            return PollOutcome::Pending;
        }

        if reply.is_success() {
            return PollOutcome::Ready(self.extract_payload(&reply.body));
        }

        PollOutcome::Permanent(PollFailure {
            status: Some(reply.status),
            message: truncate_body(&message),
        })
    }

    /// Classify a request that never got a response. `failures_so_far` counts
    /// the consecutive transport failures before this one.
    pub fn classify_transport_error(
        &self,
        err: &TransportError,
        failures_so_far: u32,
    ) -> PollOutcome {
        let failure = PollFailure {
            status: None,
            message: truncate_body(&err.0),
        };
        if failures_so_far < self.transport_retries {
            PollOutcome::Transient(failure)
        } else {
            PollOutcome::Permanent(failure)
        }
    }

    /// The terminal field of a JSON body, or the raw body itself when the
    /// body is not the expected JSON shape (plain-text artifacts).
    fn extract_payload(&self, body: &str) -> Value {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(mut map)) => match map.remove(&self.result_field) {
                Some(value) => value,
                None => Value::String(body.to_string()),
            },
            _ => Value::String(body.to_string()),
        }
    }
}

/// Human-readable message of an error body: `detail` (or `detail.message`),
/// then `message`, then `error`, else the raw body.
pub fn error_message(body: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    let detail = match map.get("detail") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(inner)) => inner.get("message").and_then(Value::as_str),
        _ => None,
    };

    detail
        .or_else(|| map.get("message").and_then(Value::as_str))
        .or_else(|| map.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
