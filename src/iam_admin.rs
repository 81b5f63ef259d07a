//! Provisioning of an administrative IAM identity inside the customer's account.
//!
//! The five IAM calls run strictly in order under the assumed-role credentials. Group and user
//! creation tolerate `EntityAlreadyExists`; every other failure aborts with the opaque
//! [`crate::Error::ProvisioningFailed`].

/// Long-lived access key for the provisioned admin user. Both halves are always present.
#[derive(Clone, Debug)]
pub struct ProvisionedCredentialPair {
    pub access_key_id: String,
    pub secret_access_key: secrecy::SecretString,
}

/// The IAM operations the provisioner needs, acting as some identity.
#[async_trait::async_trait]
pub trait IamApi: Send + Sync {
    async fn create_group(&self, group_name: &str) -> Result<(), crate::remote::Error>;
    async fn attach_group_policy(
        &self,
        group_name: &str,
        policy_arn: &str,
    ) -> Result<(), crate::remote::Error>;
    async fn create_user(&self, user_name: &str) -> Result<(), crate::remote::Error>;
    async fn add_user_to_group(
        &self,
        group_name: &str,
        user_name: &str,
    ) -> Result<(), crate::remote::Error>;
    async fn create_access_key(
        &self,
        user_name: &str,
    ) -> Result<ProvisionedCredentialPair, crate::remote::Error>;
}

/// Builds an [`IamApi`] acting as the given temporary credentials.
#[async_trait::async_trait]
pub trait IamConnector: Send + Sync {
    type Api: IamApi;
    async fn connect(&self, creds: &crate::sts_assume_role::TemporaryCredentials) -> Self::Api;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    CreateGroup,
    AttachGroupPolicy,
    CreateUser,
    AddUserToGroup,
    CreateAccessKey,
}

fn fail(step: Step, user_name: &str, group_name: &str, err: crate::remote::Error) -> crate::Error {
    tracing::error!(
        step = ?step,
        user_name = user_name,
        group_name = group_name,
        err = %err,
        "admin provisioning step failed"
    );
    crate::Error::ProvisioningFailed
}

/// Ensures `group_name` exists with `policy_arn` attached, ensures `user_name` exists and is a
/// member, then mints an access key for the user.
///
/// Each call mints a new key; repeating the whole flow accumulates keys on the user.
#[tracing::instrument(skip(iam))]
pub async fn provision_admin<I: IamApi + ?Sized>(
    iam: &I,
    user_name: &str,
    group_name: &str,
    policy_arn: &str,
) -> crate::Result<ProvisionedCredentialPair> {
    match iam.create_group(group_name).await {
        Ok(()) => tracing::info!(group_name = group_name, "group created"),
        Err(e) if e.is_already_exists() => {
            tracing::info!(group_name = group_name, "group already exists, reusing")
        }
        Err(e) => return Err(fail(Step::CreateGroup, user_name, group_name, e)),
    }

    // Attachment is idempotent on the IAM side, so it runs for pre-existing groups too
    iam.attach_group_policy(group_name, policy_arn)
        .await
        .map_err(|e| fail(Step::AttachGroupPolicy, user_name, group_name, e))?;

    match iam.create_user(user_name).await {
        Ok(()) => tracing::info!(user_name = user_name, "user created"),
        Err(e) if e.is_already_exists() => {
            tracing::info!(user_name = user_name, "user already exists, reusing")
        }
        Err(e) => return Err(fail(Step::CreateUser, user_name, group_name, e)),
    }

    iam.add_user_to_group(group_name, user_name)
        .await
        .map_err(|e| fail(Step::AddUserToGroup, user_name, group_name, e))?;

    let pair = iam
        .create_access_key(user_name)
        .await
        .map_err(|e| fail(Step::CreateAccessKey, user_name, group_name, e))?;

    tracing::info!(
        user_name = user_name,
        group_name = group_name,
        access_key_id = pair.access_key_id,
        "admin identity provisioned"
    );
    Ok(pair)
}

/// [`IamConnector`] producing SDK clients bound to the assumed-role credentials.
#[derive(Clone)]
pub struct AwsIamConnector {
    base: aws_config::SdkConfig,
}

impl std::fmt::Debug for AwsIamConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsIamConnector")
            .field("region", &self.base.region())
            .finish()
    }
}

impl AwsIamConnector {
    pub fn new(base: aws_config::SdkConfig) -> Self {
        Self { base }
    }
}

#[async_trait::async_trait]
impl IamConnector for AwsIamConnector {
    type Api = AwsIam;

    async fn connect(&self, creds: &crate::sts_assume_role::TemporaryCredentials) -> AwsIam {
        use secrecy::ExposeSecret;

        let credentials = aws_sdk_iam::config::Credentials::new(
            &creds.access_key_id,
            creds.secret_access_key.expose_secret(),
            Some(creds.session_token.expose_secret().to_owned()),
            Some(creds.expiration.into()),
            "zop-onboard-assumed-role",
        );
        let config = self
            .base
            .to_builder()
            // Disable cache to always act as the customer-account credentials
            .identity_cache(aws_config::identity::IdentityCache::no_cache())
            .credentials_provider(aws_sdk_iam::config::SharedCredentialsProvider::new(
                credentials,
            ))
            .build();
        AwsIam {
            iam: aws_sdk_iam::Client::new(&config),
        }
    }
}

pub struct AwsIam {
    iam: aws_sdk_iam::Client,
}

#[async_trait::async_trait]
impl IamApi for AwsIam {
    async fn create_group(&self, group_name: &str) -> Result<(), crate::remote::Error> {
        self.iam
            .create_group()
            .group_name(group_name)
            .send()
            .await
            .map_err(|e| crate::remote::from_sdk_error("iam:CreateGroup", e))?;
        Ok(())
    }

    async fn attach_group_policy(
        &self,
        group_name: &str,
        policy_arn: &str,
    ) -> Result<(), crate::remote::Error> {
        self.iam
            .attach_group_policy()
            .group_name(group_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| crate::remote::from_sdk_error("iam:AttachGroupPolicy", e))?;
        Ok(())
    }

    async fn create_user(&self, user_name: &str) -> Result<(), crate::remote::Error> {
        self.iam
            .create_user()
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| crate::remote::from_sdk_error("iam:CreateUser", e))?;
        Ok(())
    }

    async fn add_user_to_group(
        &self,
        group_name: &str,
        user_name: &str,
    ) -> Result<(), crate::remote::Error> {
        self.iam
            .add_user_to_group()
            .group_name(group_name)
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| crate::remote::from_sdk_error("iam:AddUserToGroup", e))?;
        Ok(())
    }

    async fn create_access_key(
        &self,
        user_name: &str,
    ) -> Result<ProvisionedCredentialPair, crate::remote::Error> {
        let resp = self
            .iam
            .create_access_key()
            .user_name(user_name)
            .send()
            .await
            .map_err(|e| crate::remote::from_sdk_error("iam:CreateAccessKey", e))?;
        let key = resp.access_key().ok_or_else(|| {
            crate::remote::Error::Unknown(
                format!("iam:CreateAccessKey returned no access key for '{user_name}'"),
                None,
            )
        })?;
        if key.access_key_id().is_empty() || key.secret_access_key().is_empty() {
            return Err(crate::remote::Error::Unknown(
                format!("iam:CreateAccessKey returned an incomplete key for '{user_name}'"),
                None,
            ));
        }
        Ok(ProvisionedCredentialPair {
            access_key_id: key.access_key_id().to_owned(),
            secret_access_key: key.secret_access_key().into(),
        })
    }
}
