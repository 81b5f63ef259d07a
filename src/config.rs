pub fn config_dir() -> std::path::PathBuf {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(d) => std::path::PathBuf::from(d),
        Err(_) => home_dir().join(".config"),
    }
    .join(env!("CARGO_PKG_NAME"))
}

pub fn state_dir() -> std::path::PathBuf {
    match std::env::var("XDG_STATE_HOME") {
        Ok(d) => std::path::PathBuf::from(d),
        Err(_) => home_dir().join(".local").join("state"),
    }
    .join(env!("CARGO_PKG_NAME"))
}

fn home_dir() -> std::path::PathBuf {
    std::env::var_os("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

pub fn log_dir() -> std::path::PathBuf {
    state_dir().join("log")
}

pub fn log_dir_mkpath() -> std::io::Result<std::path::PathBuf> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn default_config_path() -> std::path::PathBuf {
    config_dir().join("config.json")
}

/// Regions a trust stack can be launched in from the onboarding URL.
pub const RECOGNIZED_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-north-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "sa-east-1",
];

/// Permission tier passed to the trust stack as `PermissionLevel`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionLevel {
    #[default]
    AdministratorAccess,
    PowerUserAccess,
    ReadOnlyAccess,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::AdministratorAccess => "AdministratorAccess",
            PermissionLevel::PowerUserAccess => "PowerUserAccess",
            PermissionLevel::ReadOnlyAccess => "ReadOnlyAccess",
        }
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<PermissionLevel, crate::Error> {
        match s {
            "AdministratorAccess" => Ok(PermissionLevel::AdministratorAccess),
            "PowerUserAccess" => Ok(PermissionLevel::PowerUserAccess),
            "ReadOnlyAccess" => Ok(PermissionLevel::ReadOnlyAccess),
            _ => Err(crate::Error::ConfigError(format!(
                "unknown permission_level: {s}"
            ))),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub config_path: Option<std::path::PathBuf>,

    #[serde(default)]
    pub provider: crate::integration::Provider,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub permission_level: PermissionLevel,
    #[serde(default = "default_console_url")]
    pub console_url: url::Url,
    #[serde(default = "default_template_url")]
    pub template_url: url::Url,
    #[serde(default = "default_stack_name_prefix")]
    pub stack_name_prefix: String,
    /// ARN of the platform principal the customer's role trusts.
    pub trusted_principal_arn: Option<String>,
    #[serde(default = "default_admin_policy_arn")]
    pub admin_policy_arn: String,
    #[serde(default = "default_session_duration_secs")]
    pub session_duration_secs: i32,
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
    /// Include provider diagnostics in role assumption errors returned to callers.
    #[serde(default)]
    pub debug_errors: bool,
    pub data_dir: Option<std::path::PathBuf>,
    #[serde(skip_serializing)]
    pub api_token: Option<secrecy::SecretString>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("config_path", &self.config_path)
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("permission_level", &self.permission_level)
            .field("template_url", &self.template_url.as_str())
            .field("trusted_principal_arn", &self.trusted_principal_arn)
            .finish()
    }
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

fn default_console_url() -> url::Url {
    url::Url::parse("https://console.aws.amazon.com/").unwrap()
}

fn default_template_url() -> url::Url {
    url::Url::parse("https://zop-public-templates.s3.amazonaws.com/cross-account-role.yaml")
        .unwrap()
}

fn default_stack_name_prefix() -> String {
    "zop-integration".to_owned()
}

fn default_admin_policy_arn() -> String {
    "arn:aws:iam::aws:policy/AdministratorAccess".to_owned()
}

fn default_session_duration_secs() -> i32 {
    3600
}

fn default_operation_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Config {
            config_path: None,
            provider: crate::integration::Provider::default(),
            region: default_region(),
            permission_level: PermissionLevel::default(),
            console_url: default_console_url(),
            template_url: default_template_url(),
            stack_name_prefix: default_stack_name_prefix(),
            trusted_principal_arn: None,
            admin_policy_arn: default_admin_policy_arn(),
            session_duration_secs: default_session_duration_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
            debug_errors: false,
            data_dir: None,
            api_token: None,
        }
    }
}

impl Config {
    pub async fn read_from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let data = tokio::fs::read(&path).await?;
        let mut parsed: Self = serde_json::from_slice(&data).map_err(|e| {
            crate::Error::ConfigError(format!(
                "Can't parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        parsed.config_path = Some(path.as_ref().into());
        Ok(parsed)
    }

    /// Loads the configuration from `path`, or from the default location. A missing file at
    /// the default location yields the defaults; a missing explicit path is an error.
    pub async fn load(path: Option<&std::path::Path>) -> crate::Result<Self> {
        let config = match path {
            Some(p) => Self::read_from_file(p).await?,
            None => {
                let p = default_config_path();
                if tokio::fs::try_exists(&p).await? {
                    Self::read_from_file(&p).await?
                } else {
                    tracing::debug!(path = %p.display(), "config file not found, using defaults");
                    Self::default()
                }
            }
        };
        config.validate()?;
        tracing::debug!(config = ?config, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !RECOGNIZED_REGIONS.contains(&self.region.as_str()) {
            return Err(crate::Error::ConfigError(format!(
                "region '{}' is not recognized",
                self.region
            )));
        }
        if self.stack_name_prefix.is_empty() {
            return Err(crate::Error::ConfigError(
                "stack_name_prefix must not be empty".to_owned(),
            ));
        }
        if self.admin_policy_arn.is_empty() {
            return Err(crate::Error::ConfigError(
                "admin_policy_arn must not be empty".to_owned(),
            ));
        }
        // sts:AssumeRole accepts 15 minutes up to the role's maximum (12 hours at most)
        if !(900..=43200).contains(&self.session_duration_secs) {
            return Err(crate::Error::ConfigError(format!(
                "session_duration_secs must be within 900..=43200, got {}",
                self.session_duration_secs
            )));
        }
        if self.operation_timeout_secs == 0 {
            return Err(crate::Error::ConfigError(
                "operation_timeout_secs must be positive".to_owned(),
            ));
        }
        if matches!(self.trusted_principal_arn.as_deref(), Some(a) if !a.starts_with("arn:")) {
            return Err(crate::Error::ConfigError(
                "trusted_principal_arn must be an ARN".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn try_trusted_principal_arn(&self) -> crate::Result<&str> {
        self.trusted_principal_arn.as_deref().ok_or_else(|| {
            crate::Error::ConfigError("trusted_principal_arn is not configured".to_owned())
        })
    }

    pub fn operation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn data_dir(&self) -> std::path::PathBuf {
        self.data_dir.clone().unwrap_or_else(state_dir)
    }

    /// Base SDK configuration for the platform's own identity. Retries are disabled; a failed
    /// remote call aborts the whole operation.
    pub async fn sdk_config(&self) -> aws_config::SdkConfig {
        aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::disabled())
            .timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .operation_timeout(self.operation_timeout())
                    .build(),
            )
            .load()
            .await
    }
}
