//! sts:AssumeRole into a customer account, guarded by the integration's external id.

/// Short-lived credentials scoped to the customer account. In-memory only.
#[derive(Clone, Debug)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: secrecy::SecretString,
    pub session_token: secrecy::SecretString,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

#[async_trait::async_trait]
pub trait RoleAssumer: Send + Sync {
    /// `role_identifier` is `<account-id>/<role-name>`.
    async fn assume_role(
        &self,
        role_identifier: &str,
        external_id: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials, crate::remote::Error>;
}

/// [`RoleAssumer`] backed by AWS STS, acting as the platform's own identity.
#[derive(Clone)]
pub struct StsRoleAssumer {
    sts: aws_sdk_sts::Client,
    duration_secs: i32,
}

impl std::fmt::Debug for StsRoleAssumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsRoleAssumer")
            .field("duration_secs", &self.duration_secs)
            .finish()
    }
}

impl StsRoleAssumer {
    pub fn new(sdk_config: &aws_config::SdkConfig, duration_secs: i32) -> Self {
        Self {
            sts: aws_sdk_sts::Client::new(sdk_config),
            duration_secs,
        }
    }
}

#[async_trait::async_trait]
impl RoleAssumer for StsRoleAssumer {
    #[tracing::instrument(skip(self, external_id))]
    async fn assume_role(
        &self,
        role_identifier: &str,
        external_id: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials, crate::remote::Error> {
        if external_id.is_empty() || session_name.is_empty() {
            return Err(crate::remote::Error::InvalidArgument(
                "external id and session name must not be empty".to_owned(),
                None,
            ));
        }
        let role_arn = role_arn_from_identifier(role_identifier)?;

        tracing::debug!(role_arn = role_arn, session_name = session_name, "Performing AssumeRole");

        let resp = self
            .sts
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(session_name)
            .external_id(external_id)
            .duration_seconds(self.duration_secs)
            .send()
            .await
            .map_err(|e| crate::remote::from_sdk_error("sts:AssumeRole", e))?;

        let creds = resp.credentials().ok_or_else(|| {
            crate::remote::Error::Unknown(
                format!("sts:AssumeRole returned empty credentials for '{role_arn}'"),
                None,
            )
        })?;

        let exp = creds.expiration();
        let expiration = chrono::DateTime::from_timestamp(exp.secs(), exp.subsec_nanos())
            .ok_or_else(|| {
                crate::remote::Error::Unknown(
                    format!("sts:AssumeRole returned invalid expiration: {exp}"),
                    None,
                )
            })?;

        tracing::info!(
            role_arn = role_arn,
            access_key_id = creds.access_key_id(),
            expiration = ?expiration,
            "AssumeRole completed"
        );

        Ok(TemporaryCredentials {
            access_key_id: creds.access_key_id().to_owned(),
            secret_access_key: creds.secret_access_key().into(),
            session_token: creds.session_token().into(),
            expiration,
        })
    }
}

/// Turns `<account-id>/<role-name>` into an IAM role ARN.
fn role_arn_from_identifier(role_identifier: &str) -> Result<String, crate::remote::Error> {
    let invalid = || {
        crate::remote::Error::InvalidArgument(
            format!("role identifier '{role_identifier}' is invalid"),
            None,
        )
    };
    let (account_id, role_name) = role_identifier.split_once('/').ok_or_else(invalid)?;
    if account_id.is_empty()
        || !account_id.chars().all(|c| c.is_ascii_digit())
        || role_name.is_empty()
    {
        return Err(invalid());
    }
    Ok(format!("arn:aws:iam::{account_id}:role/{role_name}"))
}
