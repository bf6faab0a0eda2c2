//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_ecr::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for cleanup and retry logic
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (safe to skip in cleanup)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Repository still holds images
    #[error("Resource is not empty: {message}")]
    NotEmpty { message: String },

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded")]
    Throttled,

    /// Credentials missing, expired, or lacking permission
    #[error("Access denied: {message}")]
    AccessDenied { code: String, message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Classify any SDK error that carries error metadata.
    pub fn from_sdk<E>(err: &E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| aws_sdk_ecr::error::DisplayErrorContext(err).to_string());
        classify_aws_error(err.code(), Some(&message))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::AccessDenied { code, .. } => suggestion_for_code(code),
            AwsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            AwsError::Throttled => suggestion_for_code("Throttling"),
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "RepositoryNotFoundException",
    "ImageNotFoundException",
    "ResourceNotFoundException",
    "PipelineNotFoundException",
];

/// Known AWS error codes for non-empty containers
const NOT_EMPTY_CODES: &[&str] = &["RepositoryNotEmptyException"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
];

/// Known AWS error codes for credential and permission problems
const ACCESS_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
];

/// Classify an AWS SDK error using the error code.
///
/// CloudFormation reports missing stacks as a `ValidationError` whose message
/// ends in "does not exist"; that case is treated as not found too.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some("ValidationError") if message.contains("does not exist") => {
            AwsError::NotFound { message }
        }
        Some(c) if NOT_EMPTY_CODES.contains(&c) => AwsError::NotEmpty { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if ACCESS_CODES.contains(&c) => AwsError::AccessDenied {
            code: c.to_string(),
            message,
        },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an error from an anyhow::Error.
///
/// Every client wrapper converts SDK failures into [`AwsError`] before adding
/// context, so walking the chain for that type is enough.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<AwsError>() {
            return match e {
                AwsError::NotFound { message } => AwsError::NotFound {
                    message: message.clone(),
                },
                AwsError::NotEmpty { message } => AwsError::NotEmpty {
                    message: message.clone(),
                },
                AwsError::Throttled => AwsError::Throttled,
                AwsError::AccessDenied { code, message } => AwsError::AccessDenied {
                    code: code.clone(),
                    message: message.clone(),
                },
                AwsError::Sdk { code, message } => AwsError::Sdk {
                    code: code.clone(),
                    message: message.clone(),
                },
            };
        }
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Shorthand for checking whether an error chain bottoms out in "not found".
pub fn is_not_found(error: &anyhow::Error) -> bool {
    classify_anyhow_error(error).is_not_found()
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "ExpiredToken",
        "Your session has expired. Refresh credentials (e.g. `aws sso login`).",
    ),
    (
        "ExpiredTokenException",
        "Your session has expired. Refresh credentials (e.g. `aws sso login`).",
    ),
    (
        "InvalidClientTokenId",
        "The access key is not valid. Check AWS_PROFILE and your credentials file.",
    ),
    (
        "UnrecognizedClientException",
        "The access key is not valid. Check AWS_PROFILE and your credentials file.",
    ),
    (
        "AccessDenied",
        "The current identity lacks permission for this operation.",
    ),
    (
        "AccessDeniedException",
        "The current identity lacks permission for this operation.",
    ),
    (
        "Throttling",
        "AWS API rate limit hit. Wait a moment and run the command again.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
