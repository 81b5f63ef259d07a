//! One-click CloudFormation "quick create stack" URL for the customer's trust stack.
//!
//! Rendering is best-effort and infallible: odd inputs yield a URL whose stack creation fails
//! in the console. The security boundary is the external id checked by STS, not this URL.

/// Console location and naming inputs that do not vary per integration.
#[derive(Debug, Clone)]
pub struct ConsoleTarget<'a> {
    pub console_url: &'a url::Url,
    pub region: &'a str,
    pub stack_name_prefix: &'a str,
}

impl<'a> From<&'a crate::config::Config> for ConsoleTarget<'a> {
    fn from(config: &'a crate::config::Config) -> ConsoleTarget<'a> {
        ConsoleTarget {
            console_url: &config.console_url,
            region: &config.region,
            stack_name_prefix: &config.stack_name_prefix,
        }
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Renders the quick-create URL. Query parameters are emitted in a fixed order, each value
/// percent-encoded on its own.
pub fn build_onboarding_url(
    integration: &crate::integration::Integration,
    permission_level: crate::config::PermissionLevel,
    trusted_principal_arn: &str,
    target: &ConsoleTarget<'_>,
) -> String {
    let stack_name =
        crate::ids::stack_name_for(target.stack_name_prefix, &integration.integration_id);
    let params: [(&str, &str); 6] = [
        ("templateURL", integration.template_url.as_str()),
        ("stackName", &stack_name),
        ("param_IntegrationId", &integration.integration_id),
        ("param_ExternalId", &integration.external_id),
        ("param_TrustedPrincipalArn", trusted_principal_arn),
        ("param_PermissionLevel", permission_level.as_str()),
    ];
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let base = target.console_url.as_str().trim_end_matches('/');
    format!(
        "{base}/cloudformation/home?region={region}#/stacks/quickcreate?{query}",
        region = encode(target.region),
    )
}

/// Extracts the quick-create parameters back out of a rendered URL, in order.
pub fn parse_quickcreate_params(onboarding_url: &str) -> crate::Result<Vec<(String, String)>> {
    let url = url::Url::parse(onboarding_url)?;
    let fragment = url.fragment().unwrap_or_default();
    let Some((_, query)) = fragment.split_once('?') else {
        return Err(crate::Error::InvalidInput(
            "onboarding URL has no quick-create parameters".to_owned(),
        ));
    };
    Ok(url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integration() -> crate::integration::Integration {
        crate::integration::Integration {
            integration_id: "abc123".to_owned(),
            external_id: crate::ids::external_id_for("abc123"),
            template_url: url::Url::parse(
                "https://templates.example.com/cross-account-role.yaml?versionId=a&b=c",
            )
            .unwrap(),
            role_name: crate::ids::role_name_for("abc123"),
            provider: crate::integration::Provider::Aws,
            created_at: chrono::Utc::now(),
        }
    }

    fn render(integration: &crate::integration::Integration) -> String {
        let config = crate::config::Config::default();
        build_onboarding_url(
            integration,
            crate::config::PermissionLevel::AdministratorAccess,
            "arn:aws:iam::111111111111:role/zop-platform",
            &ConsoleTarget::from(&config),
        )
    }

    #[test]
    fn shape() {
        let url = render(&integration());
        assert!(url.starts_with(
            "https://console.aws.amazon.com/cloudformation/home?region=us-east-1#/stacks/quickcreate?templateURL="
        ));
        assert!(url.contains("&stackName=zop-integration-abc123&"));
        assert!(url.contains("&param_ExternalId=ext-abc123&"));
        assert!(url.ends_with("&param_PermissionLevel=AdministratorAccess"));
    }

    #[test]
    fn values_are_encoded_independently() {
        let url = render(&integration());
        assert!(url.contains(
            "templateURL=https%3A%2F%2Ftemplates.example.com%2Fcross-account-role.yaml%3FversionId%3Da%26b%3Dc&"
        ));
        assert!(url.contains(
            "param_TrustedPrincipalArn=arn%3Aaws%3Aiam%3A%3A111111111111%3Arole%2Fzop-platform&"
        ));
    }

    #[test]
    fn round_trip() {
        let i = integration();
        let params = parse_quickcreate_params(&render(&i)).unwrap();
        let keys: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "templateURL",
                "stackName",
                "param_IntegrationId",
                "param_ExternalId",
                "param_TrustedPrincipalArn",
                "param_PermissionLevel",
            ]
        );
        assert_eq!(params[0].1, i.template_url.as_str());
        assert_eq!(params[2].1, i.integration_id);
        assert_eq!(params[3].1, i.external_id);
    }

    #[test]
    fn deterministic() {
        let i = integration();
        assert_eq!(render(&i), render(&i));
    }

    #[test]
    fn odd_integration_id_still_renders() {
        let mut i = integration();
        i.integration_id = "a b&c=d".to_owned();
        let params = parse_quickcreate_params(&render(&i)).unwrap();
        assert_eq!(params[1].1, "zop-integration-a b&c=d");
        assert_eq!(params[2].1, "a b&c=d");
    }

    #[test]
    fn parse_without_fragment() {
        assert!(parse_quickcreate_params("https://console.aws.amazon.com/").is_err());
    }
}
