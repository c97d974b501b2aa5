//! Upstream failure classification.
//!
//! A status code and/or raw error text from a download service becomes a
//! user-facing message plus an optional remediation tip. The status table
//! wins; text heuristics apply in a fixed priority order only when the
//! status is absent or unknown. Classification never fails.

use std::fmt;

/// Outcome category for an upstream request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Success,
    BadRequest,
    MethodNotAllowed,
    RateLimited,
    ServerError,
    BadGateway,
    Unavailable,
    GatewayTimeout,
    NotFound,
    Unknown,
}

impl FailureKind {
    /// Map a known HTTP status to its category.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 => Some(Self::Success),
            400 => Some(Self::BadRequest),
            405 => Some(Self::MethodNotAllowed),
            429 => Some(Self::RateLimited),
            500 => Some(Self::ServerError),
            502 => Some(Self::BadGateway),
            503 => Some(Self::Unavailable),
            504 => Some(Self::GatewayTimeout),
            _ => None,
        }
    }

    /// Canonical user-facing message for this category.
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "✅ Request completed successfully.",
            Self::BadRequest => "❌ Bad request. The service could not process this link.",
            Self::MethodNotAllowed => "❌ Method not allowed. Please report this bug.",
            Self::RateLimited => "⏳ Too many requests. Please wait a moment and try again.",
            Self::ServerError => "⚠️ The download service hit an internal error.",
            Self::BadGateway => {
                "⚠️ Bad gateway. The download service returned an invalid response."
            }
            Self::Unavailable => "🔧 The download service is temporarily unavailable.",
            Self::GatewayTimeout => {
                "⏱ The request timed out. The service took too long to respond."
            }
            Self::NotFound => {
                "🔍 Nothing found at this link. The media may have been removed or made private."
            }
            Self::Unknown => "❓ An unknown error occurred. Please try again later.",
        }
    }

    /// Whether the caller may retry the request after this failure.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::GatewayTimeout)
    }
}

/// Remediation tip for a failing HTTP status. Empty when there is no advice.
pub fn tip(status: u16) -> &'static str {
    match status {
        400 => "Tip: check that the link is complete and publicly accessible.",
        429 => "Tip: the service enforces a per-minute quota. A short pause usually clears it.",
        500 => "Tip: this is a problem on the service side. Retrying later usually helps.",
        502 => "Tip: the upstream provider is misbehaving. Try again in a few minutes.",
        503 => "Tip: the service is likely under maintenance. Try again shortly.",
        504 => "Tip: the media may be large or the service busy. Try again later.",
        _ => "",
    }
}

/// Classified failure ready for presentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: FailureKind,
    pub message: String,
    pub tip: String,
}

/// Classify an upstream failure from its HTTP status and/or error text.
pub fn classify(status: Option<u16>, error_message: &str) -> Classification {
    let tip_text = status.map(tip).unwrap_or("").to_string();

    if let Some(kind) = status.and_then(FailureKind::from_status) {
        return Classification {
            kind,
            message: kind.message().to_string(),
            tip: tip_text,
        };
    }

    if !error_message.is_empty() {
        // Priority order matters: a message naming several symptoms takes the
        // first matching rule.
        let lower = error_message.to_lowercase();
        let kind = if lower.contains("rate limit") || lower.contains("too many") {
            Some(FailureKind::RateLimited)
        } else if lower.contains("timeout") {
            Some(FailureKind::GatewayTimeout)
        } else if lower.contains("bad request") || lower.contains("invalid") {
            Some(FailureKind::BadRequest)
        } else if lower.contains("not found") {
            Some(FailureKind::NotFound)
        } else if lower.contains("unavailable") {
            Some(FailureKind::Unavailable)
        } else {
            None
        };

        if let Some(kind) = kind {
            return Classification {
                kind,
                message: kind.message().to_string(),
                tip: tip_text,
            };
        }

        return Classification {
            kind: FailureKind::Unknown,
            message: format!("❌ Error: {error_message}"),
            tip: tip_text,
        };
    }

    Classification {
        kind: FailureKind::Unknown,
        message: FailureKind::Unknown.message().to_string(),
        tip: tip_text,
    }
}

/// Failure data carried back from a download adapter.
#[derive(Clone, Debug)]
pub struct UpstreamFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn classify(&self) -> Classification {
        classify(self.status, &self.message)
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "status {code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
