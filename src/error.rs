use thiserror::Error;

use crate::model::overtime::OtStatus;

/// Every outcome the core can refuse a request with.
///
/// All variants except [`ClockError::StoreUnavailable`] are expected, user-facing
/// denials and are rendered verbatim as the response message.
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("Site configuration not found")]
    SiteConfigMissing,

    #[error("You are outside the work area ({distance:.0} m from site, allowed {radius:.0} m)")]
    OutOfRange { distance: f64, radius: f64 },

    #[error("GPS signal too weak (accuracy {accuracy:.0} m, required {max:.0} m or better)")]
    WeakSignal { accuracy: f64, max: f64 },

    #[error("You already have an open session, clock out first")]
    AlreadyOpenSession,

    #[error("No open session found to clock out")]
    NoOpenSession,

    #[error("Overtime request not found")]
    RequestNotFound,

    #[error("Only supervisors can decide overtime requests")]
    Forbidden,

    #[error("Overtime request was already {status}")]
    AlreadyDecided { status: OtStatus },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ClockError {
    /// Message shown to the caller. Backend detail never leaves the process.
    pub fn user_message(&self) -> String {
        match self {
            ClockError::StoreUnavailable(_) => {
                "Service temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ClockError::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for ClockError {
    fn from(e: sqlx::Error) -> Self {
        ClockError::StoreUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_detail_is_hidden_from_callers() {
        let err = ClockError::StoreUnavailable("connection refused on 10.0.0.3".into());
        assert!(err.is_transient());
        assert!(!err.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn denials_render_verbatim() {
        let err = ClockError::AlreadyDecided {
            status: OtStatus::Approved,
        };
        assert!(!err.is_transient());
        assert_eq!(err.user_message(), "Overtime request was already Approved");
    }
}
