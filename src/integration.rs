#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Aws,
}

impl Provider {
    pub const ALL: &'static [Provider] = &[Provider::Aws];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<Provider, crate::Error> {
        Provider::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| crate::Error::UnsupportedProvider(s.to_owned()))
    }
}

/// A customer's pending or established cross-account trust relationship.
///
/// Created once by the orchestrator, then persisted and read back by id. Never mutated.
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Integration {
    pub integration_id: String,
    /// Checked by STS during role assumption. Treat as a secret.
    pub external_id: String,
    pub template_url: url::Url,
    pub role_name: String,
    pub provider: Provider,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl std::fmt::Debug for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration")
            .field("integration_id", &self.integration_id)
            .field("role_name", &self.role_name)
            .field("provider", &self.provider)
            .field("template_url", &self.template_url.as_str())
            .finish()
    }
}

impl Integration {
    pub fn trust_binding(&self) -> TrustBinding {
        TrustBinding {
            role_name: self.role_name.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

/// The role name and external id the Role Assumer targets for one integration.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustBinding {
    pub role_name: String,
    pub external_id: String,
}

impl std::fmt::Debug for TrustBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustBinding")
            .field("role_name", &self.role_name)
            .finish()
    }
}

impl TrustBinding {
    /// Re-derives the binding from an integration id, using the same functions as creation.
    pub fn derive(integration_id: &str) -> TrustBinding {
        TrustBinding {
            role_name: crate::ids::role_name_for(integration_id),
            external_id: crate::ids::external_id_for(integration_id),
        }
    }

    /// `<account-id>/<role-name>`
    pub fn role_identifier(&self, account_id: &str) -> String {
        format!("{}/{}", account_id, self.role_name)
    }
}

/// Number of digits in an AWS account id.
pub const ACCOUNT_ID_LEN: usize = 12;

/// Caller-supplied request to provision an admin identity. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct AssumeRoleRequest {
    pub integration_id: String,
    pub account_id: String,
    pub provider: Provider,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
}

impl AssumeRoleRequest {
    pub fn validate(&self, supported: Provider) -> crate::Result<()> {
        if self.integration_id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "integration_id is required".to_owned(),
            ));
        }
        if self.account_id.is_empty() {
            return Err(crate::Error::InvalidInput("account_id is required".to_owned()));
        }
        if self.account_id.len() != ACCOUNT_ID_LEN
            || !self.account_id.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(crate::Error::InvalidInput(format!(
                "account_id must be exactly {ACCOUNT_ID_LEN} digits"
            )));
        }
        if self.provider != supported {
            return Err(crate::Error::UnsupportedProvider(
                self.provider.as_str().to_owned(),
            ));
        }
        Ok(())
    }

    /// Caller-supplied names, or freshly generated ones when absent or empty.
    pub fn user_and_group_names(&self) -> crate::Result<(String, String)> {
        let user_name = match self.user_name.as_deref() {
            Some(n) if !n.is_empty() => n.to_owned(),
            _ => crate::ids::default_user_name()?,
        };
        let group_name = match self.group_name.as_deref() {
            Some(n) if !n.is_empty() => n.to_owned(),
            _ => crate::ids::default_group_name()?,
        };
        Ok((user_name, group_name))
    }
}
