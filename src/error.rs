#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required field was missing or empty.
    #[error("InvalidInput: {0}")]
    InvalidInput(String),

    #[error("UnsupportedProvider: {0}")]
    UnsupportedProvider(String),

    /// sts:AssumeRole into the customer account was rejected. `detail` carries the provider
    /// diagnostic only when `debug_errors` is enabled.
    #[error("TrustNotEstablished: {reason}{}", fmt_detail(.detail))]
    TrustNotEstablished {
        reason: TrustFailureReason,
        detail: Option<String>,
    },

    /// Any IAM step failed after a successful role assumption. Which step failed is
    /// deliberately not part of the error.
    #[error("ProvisioningFailed: failed to create admin identity")]
    ProvisioningFailed,

    #[error("EntropyUnavailable: {0}")]
    EntropyUnavailable(String),

    #[error("IntegrationNotFound: {0}")]
    IntegrationNotFound(String),

    #[error("ConfigError: {0}")]
    ConfigError(String),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    /// Failure, but we don't want to emit error to stderr/out anymore. Used in cmd
    #[error("")]
    FailureButSilentlyExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustFailureReason {
    /// The role is missing, the trust stack has not been applied yet, or the external id does
    /// not match. STS reports all of these as AccessDenied.
    AccessDenied,
    /// The platform's own credentials were rejected by STS.
    PlatformUnauthenticated,
    InvalidRequest,
    Unknown,
}

impl std::fmt::Display for TrustFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TrustFailureReason::AccessDenied => {
                "role assumption was denied; the trust stack may not be deployed yet"
            }
            TrustFailureReason::PlatformUnauthenticated => {
                "platform credentials were rejected by the provider"
            }
            TrustFailureReason::InvalidRequest => "role assumption request was rejected as invalid",
            TrustFailureReason::Unknown => "role assumption failed",
        })
    }
}

fn fmt_detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
