//! Classification of failures returned by AWS API calls.
//!
//! Remote failures are classified by the structured error code AWS returns, never by the
//! human-readable message.

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Already exists: {0}")]
    AlreadyExists(String, #[source] Option<BoxError>),
    #[error("Not found: {0}")]
    NotFound(String, #[source] Option<BoxError>),
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String, #[source] Option<BoxError>),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String, #[source] Option<BoxError>),
    #[error("Permission denied: {0}")]
    PermissionDenied(String, #[source] Option<BoxError>),
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String, #[source] Option<BoxError>),
    #[error("Timed out: {0}")]
    Timeout(String, #[source] Option<BoxError>),
    #[error("Unknown: {0}")]
    Unknown(String, #[source] Option<BoxError>),
}

impl Error {
    /// Whether the remote side reported a pre-existing entity (IAM `EntityAlreadyExists`).
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(..))
    }

    pub fn message(&self) -> &str {
        match self {
            Error::AlreadyExists(m, _)
            | Error::NotFound(m, _)
            | Error::InvalidArgument(m, _)
            | Error::Unauthenticated(m, _)
            | Error::PermissionDenied(m, _)
            | Error::ResourceExhausted(m, _)
            | Error::Timeout(m, _)
            | Error::Unknown(m, _) => m,
        }
    }

    /// Maps an AWS error code to a variant.
    pub fn from_code(code: Option<&str>, message: String, source: Option<BoxError>) -> Error {
        match code {
            Some("EntityAlreadyExists") | Some("EntityAlreadyExistsException") => {
                Error::AlreadyExists(message, source)
            }
            Some("NoSuchEntity") | Some("NoSuchEntityException") => Error::NotFound(message, source),
            Some("AccessDenied") | Some("AccessDeniedException") => {
                Error::PermissionDenied(message, source)
            }
            Some("ExpiredToken")
            | Some("ExpiredTokenException")
            | Some("InvalidClientTokenId")
            | Some("SignatureDoesNotMatch") => Error::Unauthenticated(message, source),
            Some("LimitExceeded") | Some("LimitExceededException") | Some("Throttling") => {
                Error::ResourceExhausted(message, source)
            }
            Some("MalformedPolicyDocument")
            | Some("PackedPolicyTooLarge")
            | Some("RegionDisabledException")
            | Some("InvalidInput")
            | Some("ValidationError") => Error::InvalidArgument(message, source),
            _ => Error::Unknown(message, source),
        }
    }
}

/// Maps an SDK error to [`Error`]. `context` names the API operation, e.g. `iam:CreateGroup`.
pub fn from_sdk_error<E, R>(
    context: &str,
    err: aws_smithy_runtime_api::client::result::SdkError<E, R>,
) -> Error
where
    E: std::error::Error
        + aws_smithy_types::error::metadata::ProvideErrorMetadata
        + Send
        + Sync
        + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    use aws_smithy_types::error::metadata::ProvideErrorMetadata;

    if let aws_smithy_runtime_api::client::result::SdkError::TimeoutError(_) = err {
        return Error::Timeout(format!("{context} timed out"), Some(Box::new(err)));
    }

    let code = err.code().map(|c| c.to_owned());
    let message = format!(
        "AWS returned {code:?} for {context}: {message:?}",
        code = code.as_deref(),
        context = context,
        message = err.message(),
    );
    Error::from_code(code.as_deref(), message, Some(Box::new(err)))
}
