#[derive(clap::Args, Debug)]
pub struct ProvisionAdminArgs {
    /// Integration created by `create-integration`.
    integration_id: String,

    /// AWS account ID of the customer account where the trust stack was applied.
    #[arg(long)]
    account_id: String,

    /// Cloud provider of the customer account. Defaults to the configured provider.
    #[arg(long)]
    provider: Option<String>,

    /// IAM user name to provision. Defaults to Zop-Admin-<random>.
    #[arg(long)]
    user_name: Option<String>,

    /// IAM group name to provision. Defaults to ZopAdminGroup-<random>.
    #[arg(long)]
    group_name: Option<String>,
}

#[tokio::main]
pub async fn run(
    global: &crate::cmd::GlobalArgs,
    args: &ProvisionAdminArgs,
) -> Result<(), anyhow::Error> {
    use crate::store::IntegrationStore;

    let config = global.load_config().await?;
    let request = crate::integration::AssumeRoleRequest {
        integration_id: args.integration_id.clone(),
        account_id: args.account_id.clone(),
        provider: match args.provider.as_deref() {
            Some(p) => p.parse()?,
            None => config.provider,
        },
        user_name: args.user_name.clone(),
        group_name: args.group_name.clone(),
    };

    let integration = crate::cmd::file_store(&config)
        .load(&args.integration_id)
        .await?;
    let orchestrator = crate::orchestrator::Orchestrator::new_with_aws(config).await;

    match orchestrator
        .provision_for_integration(&integration, &request)
        .await
    {
        Ok(pair) => {
            serde_json::to_writer_pretty(
                std::io::stdout(),
                &crate::server::ProvisionedCredentialsResponse::from(&pair),
            )?;
            println!();
            Ok(())
        }
        Err(e @ crate::Error::TrustNotEstablished { .. }) => {
            tracing::debug!(err = ?e, args = ?args, "Failed to assume the integration role");
            let product = env!("CARGO_PKG_NAME");
            let account_id = &args.account_id;
            let role_name = &integration.role_name;
            eprintln!(
                "{}",
                indoc::formatdoc! {"
                    :: {product} :: Could not assume {role_name} in {account_id}: {e}
                    :: {product} :: Make sure the trust stack from the onboarding URL has been created in that account
                "}
            );
            Err(crate::Error::FailureButSilentlyExit.into())
        }
        Err(e) => Err(e.into()),
    }
}
