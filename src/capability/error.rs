use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityErrorKind {
    /// Service down, connection refused, 5xx.
    Unavailable,
    Timeout,
    /// Required credentials or endpoint missing from config.
    NotConfigured,
    /// 4xx: the service understood the request and refused it.
    Rejected,
    InvalidResponse,
}

impl CapabilityErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityErrorKind::Unavailable => "unavailable",
            CapabilityErrorKind::Timeout => "timeout",
            CapabilityErrorKind::NotConfigured => "not_configured",
            CapabilityErrorKind::Rejected => "rejected",
            CapabilityErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for CapabilityErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged failure returned by every capability call.
#[derive(Debug, Clone, Error)]
#[error("{capability} {kind}: {message}")]
pub struct CapabilityError {
    pub capability: &'static str,
    pub kind: CapabilityErrorKind,
    pub message: String,
}

impl CapabilityError {
    pub fn new(
        capability: &'static str,
        kind: CapabilityErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            capability,
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(capability: &'static str, message: impl Into<String>) -> Self {
        Self::new(capability, CapabilityErrorKind::Unavailable, message)
    }

    pub fn not_configured(capability: &'static str, message: impl Into<String>) -> Self {
        Self::new(capability, CapabilityErrorKind::NotConfigured, message)
    }

    pub fn invalid_response(capability: &'static str, message: impl Into<String>) -> Self {
        Self::new(capability, CapabilityErrorKind::InvalidResponse, message)
    }

    pub fn rejected(capability: &'static str, message: impl Into<String>) -> Self {
        Self::new(capability, CapabilityErrorKind::Rejected, message)
    }

    pub fn from_reqwest(capability: &'static str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            CapabilityErrorKind::Timeout
        } else if err.is_decode() {
            CapabilityErrorKind::InvalidResponse
        } else {
            CapabilityErrorKind::Unavailable
        };
        Self::new(capability, kind, err.to_string())
    }

    /// Maps a non-success HTTP status: 4xx is a rejection, anything else means
    /// the service is not serving.
    pub fn from_status(
        capability: &'static str,
        status: reqwest::StatusCode,
        body: &str,
    ) -> Self {
        let kind = if status.is_client_error() {
            CapabilityErrorKind::Rejected
        } else {
            CapabilityErrorKind::Unavailable
        };
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, truncate(body, 300))
        };
        Self::new(capability, kind, message)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// Sends a request and turns transport failures and non-2xx statuses into
/// `CapabilityError`s.
pub(crate) async fn send_checked(
    capability: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, CapabilityError> {
    let response = request
        .send()
        .await
        .map_err(|err| CapabilityError::from_reqwest(capability, err))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CapabilityError::from_status(capability, status, &body));
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_rejections() {
        let err = CapabilityError::from_status(
            "weather_query",
            reqwest::StatusCode::NOT_FOUND,
            "city not found",
        );
        assert_eq!(err.kind, CapabilityErrorKind::Rejected);
        assert!(err.message.contains("city not found"));
    }

    #[test]
    fn server_errors_are_unavailability() {
        let err = CapabilityError::from_status(
            "text_generation",
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "",
        );
        assert_eq!(err.kind, CapabilityErrorKind::Unavailable);
        assert_eq!(err.to_string(), "text_generation unavailable: HTTP 503 Service Unavailable");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err =
            CapabilityError::from_status("web_search", reqwest::StatusCode::BAD_GATEWAY, &body);
        assert!(err.message.chars().count() < 400);
    }
}
