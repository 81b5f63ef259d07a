#[derive(clap::Args, Debug)]
pub struct ShowIntegrationArgs {
    integration_id: String,
}

#[tokio::main]
pub async fn run(
    global: &crate::cmd::GlobalArgs,
    args: &ShowIntegrationArgs,
) -> Result<(), anyhow::Error> {
    use crate::store::IntegrationStore;

    let config = global.load_config().await?;
    let integration = crate::cmd::file_store(&config)
        .load(&args.integration_id)
        .await?;
    let onboarding_url = crate::onboarding_url::build_onboarding_url(
        &integration,
        config.permission_level,
        config.try_trusted_principal_arn()?,
        &crate::onboarding_url::ConsoleTarget::from(config.as_ref()),
    );
    serde_json::to_writer_pretty(
        std::io::stdout(),
        &crate::server::IntegrationResponse {
            integration,
            onboarding_url,
        },
    )?;
    println!();
    Ok(())
}
