//! Composes id generation, URL rendering, role assumption and admin provisioning into the two
//! public operations.

/// A freshly created integration together with the URL the customer opens to apply the trust
/// stack. Persisting the integration is the caller's job.
#[derive(Debug, Clone)]
pub struct CreatedIntegration {
    pub integration: crate::integration::Integration,
    pub onboarding_url: String,
}

pub struct Orchestrator<R, C>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
{
    config: std::sync::Arc<crate::config::Config>,
    role_assumer: R,
    iam_connector: C,
}

impl<R, C> std::fmt::Debug for Orchestrator<R, C>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish()
    }
}

impl Orchestrator<crate::sts_assume_role::StsRoleAssumer, crate::iam_admin::AwsIamConnector> {
    /// Builds an orchestrator talking to AWS as the platform's ambient identity.
    pub async fn new_with_aws(config: std::sync::Arc<crate::config::Config>) -> Self {
        let sdk_config = config.sdk_config().await;
        let role_assumer =
            crate::sts_assume_role::StsRoleAssumer::new(&sdk_config, config.session_duration_secs);
        let iam_connector = crate::iam_admin::AwsIamConnector::new(sdk_config);
        Self::new(config, role_assumer, iam_connector)
    }
}

impl<R, C> Orchestrator<R, C>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
{
    pub fn new(
        config: std::sync::Arc<crate::config::Config>,
        role_assumer: R,
        iam_connector: C,
    ) -> Self {
        Self {
            config,
            role_assumer,
            iam_connector,
        }
    }

    pub fn config(&self) -> &crate::config::Config {
        &self.config
    }

    /// Generates a new integration and its onboarding URL.
    #[tracing::instrument(skip(self))]
    pub fn create_integration(
        &self,
        provider: crate::integration::Provider,
    ) -> crate::Result<CreatedIntegration> {
        if provider != self.config.provider {
            return Err(crate::Error::UnsupportedProvider(provider.as_str().to_owned()));
        }
        self.config.try_trusted_principal_arn()?;

        let integration_id = crate::ids::new_id()?;
        let binding = crate::integration::TrustBinding::derive(&integration_id);
        let integration = crate::integration::Integration {
            integration_id,
            external_id: binding.external_id,
            template_url: self.config.template_url.clone(),
            role_name: binding.role_name,
            provider,
            created_at: chrono::Utc::now(),
        };
        let onboarding_url = self.onboarding_url(&integration)?;

        tracing::info!(integration = ?integration, "integration created");
        Ok(CreatedIntegration {
            integration,
            onboarding_url,
        })
    }

    /// Renders the onboarding URL for an existing integration.
    pub fn onboarding_url(
        &self,
        integration: &crate::integration::Integration,
    ) -> crate::Result<String> {
        Ok(crate::onboarding_url::build_onboarding_url(
            integration,
            self.config.permission_level,
            self.config.try_trusted_principal_arn()?,
            &crate::onboarding_url::ConsoleTarget::from(self.config.as_ref()),
        ))
    }

    /// Assumes the integration's role in `request.account_id` and provisions an admin identity
    /// there. The role name and external id are re-derived from the integration id.
    #[tracing::instrument(skip(self))]
    pub async fn assume_role_and_provision_admin(
        &self,
        request: &crate::integration::AssumeRoleRequest,
    ) -> crate::Result<crate::iam_admin::ProvisionedCredentialPair> {
        request.validate(self.config.provider)?;
        let binding = crate::integration::TrustBinding::derive(&request.integration_id);
        self.provision(request, &binding).await
    }

    /// Same as [`Self::assume_role_and_provision_admin`], but targets the role name and
    /// external id persisted with `integration` at creation time.
    #[tracing::instrument(skip(self))]
    pub async fn provision_for_integration(
        &self,
        integration: &crate::integration::Integration,
        request: &crate::integration::AssumeRoleRequest,
    ) -> crate::Result<crate::iam_admin::ProvisionedCredentialPair> {
        request.validate(self.config.provider)?;
        if request.integration_id != integration.integration_id {
            return Err(crate::Error::InvalidInput(format!(
                "integration_id '{}' does not match the stored integration",
                request.integration_id
            )));
        }
        if request.provider != integration.provider {
            return Err(crate::Error::UnsupportedProvider(
                request.provider.as_str().to_owned(),
            ));
        }
        let binding = integration.trust_binding();
        if binding != crate::integration::TrustBinding::derive(&integration.integration_id) {
            tracing::warn!(
                integration = ?integration,
                "stored trust binding differs from the current derivation, using the stored one"
            );
        }
        self.provision(request, &binding).await
    }

    async fn provision(
        &self,
        request: &crate::integration::AssumeRoleRequest,
        binding: &crate::integration::TrustBinding,
    ) -> crate::Result<crate::iam_admin::ProvisionedCredentialPair> {
        let (user_name, group_name) = request.user_and_group_names()?;
        let role_identifier = binding.role_identifier(&request.account_id);
        let session_name = crate::ids::session_name_for(&request.integration_id);

        let creds = self
            .role_assumer
            .assume_role(&role_identifier, &binding.external_id, &session_name)
            .await
            .map_err(|e| self.trust_error(&role_identifier, e))?;

        let iam = self.iam_connector.connect(&creds).await;
        crate::iam_admin::provision_admin(
            &iam,
            &user_name,
            &group_name,
            &self.config.admin_policy_arn,
        )
        .await
    }

    fn trust_error(&self, role_identifier: &str, err: crate::remote::Error) -> crate::Error {
        tracing::warn!(role_identifier = role_identifier, err = %err, "role assumption failed");
        let reason = match &err {
            crate::remote::Error::PermissionDenied(..) | crate::remote::Error::NotFound(..) => {
                crate::error::TrustFailureReason::AccessDenied
            }
            crate::remote::Error::Unauthenticated(..) => {
                crate::error::TrustFailureReason::PlatformUnauthenticated
            }
            crate::remote::Error::InvalidArgument(..) => {
                crate::error::TrustFailureReason::InvalidRequest
            }
            _ => crate::error::TrustFailureReason::Unknown,
        };
        crate::Error::TrustNotEstablished {
            reason,
            detail: if self.config.debug_errors {
                Some(err.message().to_owned())
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    /// [`crate::sts_assume_role::RoleAssumer`] double recording each request.
    #[derive(Debug, Clone)]
    pub struct FakeRoleAssumer {
        pub calls: std::sync::Arc<std::sync::Mutex<Vec<(String, String, String)>>>,
        pub fail_with: Option<&'static str>,
    }

    impl FakeRoleAssumer {
        pub fn ok() -> Self {
            Self {
                calls: Default::default(),
                fail_with: None,
            }
        }

        pub fn failing(code: &'static str) -> Self {
            Self {
                calls: Default::default(),
                fail_with: Some(code),
            }
        }

        pub fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl crate::sts_assume_role::RoleAssumer for FakeRoleAssumer {
        async fn assume_role(
            &self,
            role_identifier: &str,
            external_id: &str,
            session_name: &str,
        ) -> Result<crate::sts_assume_role::TemporaryCredentials, crate::remote::Error> {
            self.calls.lock().unwrap().push((
                role_identifier.to_owned(),
                external_id.to_owned(),
                session_name.to_owned(),
            ));
            if let Some(code) = self.fail_with {
                return Err(crate::remote::Error::from_code(
                    Some(code),
                    format!("User is not authorized to perform sts:AssumeRole ({code})"),
                    None,
                ));
            }
            Ok(crate::sts_assume_role::TemporaryCredentials {
                access_key_id: "ASIATEMPORARY".to_owned(),
                secret_access_key: "temporary-secret".into(),
                session_token: "temporary-token".into(),
                expiration: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        }
    }

    pub fn config() -> std::sync::Arc<crate::config::Config> {
        std::sync::Arc::new(crate::config::Config {
            trusted_principal_arn: Some("arn:aws:iam::111111111111:role/zop-platform".to_owned()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{config, FakeRoleAssumer};
    use super::*;
    use crate::iam_admin::testing::{Call, FakeIam, FakeIamConnector, Outcome};

    type TestOrchestrator = Orchestrator<FakeRoleAssumer, FakeIamConnector>;

    fn orchestrator(assumer: FakeRoleAssumer, connector: FakeIamConnector) -> TestOrchestrator {
        Orchestrator::new(config(), assumer, connector)
    }

    fn request(integration_id: &str, account_id: &str) -> crate::integration::AssumeRoleRequest {
        crate::integration::AssumeRoleRequest {
            integration_id: integration_id.to_owned(),
            account_id: account_id.to_owned(),
            ..Default::default()
        }
    }

    mod create_integration {
        use super::*;

        #[test]
        fn derives_names_from_id() {
            let o = orchestrator(FakeRoleAssumer::ok(), FakeIamConnector::default());
            let created = o
                .create_integration(crate::integration::Provider::Aws)
                .unwrap();
            let i = &created.integration;
            assert_eq!(i.external_id, format!("ext-{}", i.integration_id));
            assert_eq!(
                i.role_name,
                format!("CrossAccountAccessRole-{}", i.integration_id)
            );
            assert_eq!(i.template_url, o.config().template_url);
            assert!(created
                .onboarding_url
                .contains(&format!("param_ExternalId=ext-{}", i.integration_id)));
        }

        #[test]
        fn url_round_trips() {
            let o = orchestrator(FakeRoleAssumer::ok(), FakeIamConnector::default());
            let created = o
                .create_integration(crate::integration::Provider::Aws)
                .unwrap();
            let params =
                crate::onboarding_url::parse_quickcreate_params(&created.onboarding_url).unwrap();
            let get = |k: &str| {
                params
                    .iter()
                    .find(|(key, _)| key == k)
                    .map(|(_, v)| v.clone())
                    .unwrap()
            };
            assert_eq!(get("templateURL"), created.integration.template_url.as_str());
            assert_eq!(get("param_IntegrationId"), created.integration.integration_id);
            assert_eq!(get("param_ExternalId"), created.integration.external_id);
        }

        #[test]
        fn unique_ids() {
            let o = orchestrator(FakeRoleAssumer::ok(), FakeIamConnector::default());
            let mut seen = std::collections::HashSet::new();
            for _ in 0..10_000 {
                let created = o
                    .create_integration(crate::integration::Provider::Aws)
                    .unwrap();
                assert!(seen.insert(created.integration.integration_id));
            }
        }

        #[test]
        fn missing_trusted_principal() {
            let o = Orchestrator::new(
                std::sync::Arc::new(crate::config::Config::default()),
                FakeRoleAssumer::ok(),
                FakeIamConnector::default(),
            );
            assert!(matches!(
                o.create_integration(crate::integration::Provider::Aws),
                Err(crate::Error::ConfigError(_))
            ));
        }
    }

    mod assume_role_and_provision_admin {
        use super::*;

        #[tokio::test]
        async fn end_to_end() {
            let assumer = FakeRoleAssumer::ok();
            let connector = FakeIamConnector::default();
            let o = orchestrator(assumer.clone(), connector.clone());

            let pair = o
                .assume_role_and_provision_admin(&request("abc123", "999999999999"))
                .await
                .unwrap();
            assert!(!pair.access_key_id.is_empty());
            {
                use secrecy::ExposeSecret;
                assert!(!pair.secret_access_key.expose_secret().is_empty());
            }

            assert_eq!(
                assumer.calls(),
                vec![(
                    "999999999999/CrossAccountAccessRole-abc123".to_owned(),
                    "ext-abc123".to_owned(),
                    "session-abc123".to_owned(),
                )]
            );
            assert_eq!(connector.connect_count(), 1);
            let calls = connector.iam.calls();
            assert_eq!(calls.len(), 5);
            assert!(matches!(&calls[0], Call::CreateGroup(g) if g.starts_with("ZopAdminGroup-")));
            assert!(matches!(&calls[2], Call::CreateUser(u) if u.starts_with("Zop-Admin-")));
        }

        #[tokio::test]
        async fn empty_account_id() {
            let assumer = FakeRoleAssumer::ok();
            let o = orchestrator(assumer.clone(), FakeIamConnector::default());
            let r = o
                .assume_role_and_provision_admin(&request("abc123", ""))
                .await;
            assert!(matches!(r, Err(crate::Error::InvalidInput(_))));
            assert!(assumer.calls().is_empty());
        }

        #[tokio::test]
        async fn malformed_account_id() {
            let assumer = FakeRoleAssumer::ok();
            let o = orchestrator(assumer.clone(), FakeIamConnector::default());
            let r = o
                .assume_role_and_provision_admin(&request("abc123", "999/evil"))
                .await;
            assert!(matches!(r, Err(crate::Error::InvalidInput(_))));
            assert!(assumer.calls().is_empty());
        }

        #[tokio::test]
        async fn empty_integration_id() {
            let assumer = FakeRoleAssumer::ok();
            let o = orchestrator(assumer.clone(), FakeIamConnector::default());
            let r = o
                .assume_role_and_provision_admin(&request("", "999999999999"))
                .await;
            assert!(matches!(r, Err(crate::Error::InvalidInput(_))));
            assert!(assumer.calls().is_empty());
        }

        #[tokio::test]
        async fn role_assumption_fails() {
            let connector = FakeIamConnector::default();
            let o = orchestrator(FakeRoleAssumer::failing("AccessDenied"), connector.clone());
            let r = o
                .assume_role_and_provision_admin(&request("abc123", "999999999999"))
                .await;
            assert!(matches!(
                r,
                Err(crate::Error::TrustNotEstablished {
                    reason: crate::error::TrustFailureReason::AccessDenied,
                    detail: None,
                })
            ));
            assert_eq!(connector.connect_count(), 0);
            assert!(connector.iam.calls().is_empty());
        }

        #[tokio::test]
        async fn role_assumption_detail_in_debug_mode() {
            let config = std::sync::Arc::new(crate::config::Config {
                debug_errors: true,
                ..(*config()).clone()
            });
            let o = Orchestrator::new(
                config,
                FakeRoleAssumer::failing("AccessDenied"),
                FakeIamConnector::default(),
            );
            let r = o
                .assume_role_and_provision_admin(&request("abc123", "999999999999"))
                .await;
            match r {
                Err(crate::Error::TrustNotEstablished {
                    detail: Some(d), ..
                }) => assert!(d.contains("sts:AssumeRole")),
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[tokio::test]
        async fn group_already_exists() {
            let connector = FakeIamConnector {
                iam: FakeIam {
                    create_group: Outcome::AlreadyExists,
                    ..Default::default()
                },
                ..Default::default()
            };
            let o = orchestrator(FakeRoleAssumer::ok(), connector.clone());
            let pair = o
                .assume_role_and_provision_admin(&request("abc123", "999999999999"))
                .await
                .unwrap();
            assert_eq!(pair.access_key_id, "AKIAPROVISIONED");
            assert_eq!(connector.iam.calls().len(), 5);
        }

        #[tokio::test]
        async fn access_key_fails() {
            let connector = FakeIamConnector {
                iam: FakeIam {
                    create_access_key: Outcome::Fail,
                    ..Default::default()
                },
                ..Default::default()
            };
            let o = orchestrator(FakeRoleAssumer::ok(), connector);
            let r = o
                .assume_role_and_provision_admin(&request("abc123", "999999999999"))
                .await;
            assert!(matches!(r, Err(crate::Error::ProvisioningFailed)));
        }

        #[tokio::test]
        async fn caller_supplied_names() {
            let connector = FakeIamConnector::default();
            let o = orchestrator(FakeRoleAssumer::ok(), connector.clone());
            let req = crate::integration::AssumeRoleRequest {
                user_name: Some("alice".to_owned()),
                group_name: Some("admins".to_owned()),
                ..request("abc123", "999999999999")
            };
            o.assume_role_and_provision_admin(&req).await.unwrap();
            assert_eq!(
                connector.iam.calls()[3],
                Call::AddUserToGroup("admins".to_owned(), "alice".to_owned())
            );
        }
    }

    mod provision_for_integration {
        use super::*;

        #[tokio::test]
        async fn uses_stored_binding() {
            let assumer = FakeRoleAssumer::ok();
            let o = orchestrator(assumer.clone(), FakeIamConnector::default());
            let mut integration = o
                .create_integration(crate::integration::Provider::Aws)
                .unwrap()
                .integration;
            integration.external_id = "ext-legacy-value".to_owned();
            let id = integration.integration_id.clone();

            o.provision_for_integration(&integration, &request(&id, "999999999999"))
                .await
                .unwrap();
            let calls = assumer.calls();
            assert_eq!(calls[0].0, format!("999999999999/CrossAccountAccessRole-{id}"));
            assert_eq!(calls[0].1, "ext-legacy-value");
        }

        #[tokio::test]
        async fn mismatched_id() {
            let assumer = FakeRoleAssumer::ok();
            let o = orchestrator(assumer.clone(), FakeIamConnector::default());
            let integration = o
                .create_integration(crate::integration::Provider::Aws)
                .unwrap()
                .integration;
            let r = o
                .provision_for_integration(&integration, &request("other", "999999999999"))
                .await;
            assert!(matches!(r, Err(crate::Error::InvalidInput(_))));
            assert!(assumer.calls().is_empty());
        }
    }
}
