use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidInput = 2,
    NotFound = 3,
    Readonly = 4,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Error returned by the platform for a non-2xx response
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    /// Platform error code from the `error` envelope, when present
    pub code: Option<i64>,
    pub message: String,
    pub body: String,
}

impl ApiError {
    /// Build from a status and raw body, pulling the message out of the
    /// platform's `{"error": {...}}` envelope when there is one.
    pub fn from_body(status: StatusCode, body: String) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();
        let envelope = parsed.as_ref().map(|v| v.get("error").unwrap_or(v));

        let code = envelope.and_then(|e| e.get("code")).and_then(|c| c.as_i64());
        let message = envelope
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });

        Self {
            status,
            code,
            message,
            body,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.status == StatusCode::NOT_FOUND {
            ExitCode::NotFound
        } else if self.status.is_client_error() {
            ExitCode::InvalidInput
        } else {
            ExitCode::GeneralError
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {}", self.message, self.status.as_u16())?;
        if let Some(code) = self.code {
            write!(f, ", code {}", code)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("not logged in (run 'slcli auth login' or set SYSTEMLINK_API_URL and SYSTEMLINK_API_KEY)")]
    MissingCredentials,
    #[error("{0}")]
    Api(ApiError),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("readonly mode is enabled; refusing to {0}")]
    Readonly(String),
    #[error("{failed} of {total} {what} failed", total = .succeeded + .failed)]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        what: &'static str,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CliError::NotFound(message.into())
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Api(err) => err.exit_code(),
            CliError::InvalidInput(_) => ExitCode::InvalidInput,
            CliError::NotFound(_) => ExitCode::NotFound,
            CliError::Readonly(_) => ExitCode::Readonly,
            CliError::MissingCredentials
            | CliError::Http(_)
            | CliError::Json(_)
            | CliError::PartialFailure { .. }
            | CliError::Io(_)
            | CliError::Other(_) => ExitCode::GeneralError,
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        CliError::Api(err)
    }
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Print an error with the failure marker and return the exit code to use
pub fn report(err: &CliError) -> i32 {
    if let CliError::Api(api) = err {
        tracing::debug!(status = %api.status, body = %api.body, "error response");
    }
    crate::output::print_error(&format!("Error: {}", err));
    err.exit_code().code()
}

/// Reject batch operations with no ids or more than the platform accepts
pub fn validate_batch(ids: &[String], what: &str) -> Result<()> {
    const MAX_BATCH: usize = 1000;
    if ids.is_empty() {
        return Err(CliError::invalid(format!("no {} ids given", what)));
    }
    if ids.len() > MAX_BATCH {
        return Err(CliError::invalid(format!(
            "cannot process more than {} {} at once (got {})",
            MAX_BATCH,
            what,
            ids.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::from_body(StatusCode::NOT_FOUND, String::new());
        assert_eq!(not_found.exit_code(), ExitCode::NotFound);

        let bad_request = ApiError::from_body(StatusCode::BAD_REQUEST, String::new());
        assert_eq!(bad_request.exit_code(), ExitCode::InvalidInput);

        let conflict = ApiError::from_body(StatusCode::CONFLICT, String::new());
        assert_eq!(conflict.exit_code(), ExitCode::InvalidInput);

        let server = ApiError::from_body(StatusCode::INTERNAL_SERVER_ERROR, String::new());
        assert_eq!(server.exit_code(), ExitCode::GeneralError);
    }

    #[test]
    fn test_error_envelope_parsed() {
        let body = r#"{"error":{"name":"Skyline.NotFound","code":-251041,"message":"Asset does not exist."}}"#;
        let err = ApiError::from_body(StatusCode::NOT_FOUND, body.to_string());
        assert_eq!(err.code, Some(-251041));
        assert_eq!(err.message, "Asset does not exist.");
        assert_eq!(err.to_string(), "Asset does not exist. (HTTP 404, code -251041)");
    }

    #[test]
    fn test_plain_text_body() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "upstream down\n".to_string());
        assert_eq!(err.message, "upstream down");
        assert_eq!(err.code, None);

        let empty = ApiError::from_body(StatusCode::UNAUTHORIZED, String::new());
        assert_eq!(empty.message, "Unauthorized");
    }

    #[test]
    fn test_cli_error_codes() {
        assert_eq!(CliError::invalid("x").exit_code().code(), 2);
        assert_eq!(CliError::not_found("x").exit_code().code(), 3);
        assert_eq!(CliError::Readonly("delete".into()).exit_code().code(), 4);
        let partial = CliError::PartialFailure {
            succeeded: 2,
            failed: 1,
            what: "comments",
        };
        assert_eq!(partial.exit_code(), ExitCode::GeneralError);
        assert_eq!(partial.to_string(), "1 of 3 comments failed");
    }

    #[test]
    fn test_validate_batch() {
        let ids: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
        assert!(validate_batch(&ids, "comments").is_ok());

        let too_many: Vec<String> = (0..1001).map(|i| i.to_string()).collect();
        let err = validate_batch(&too_many, "comments").unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);

        assert!(validate_batch(&[], "comments").is_err());
    }
}
