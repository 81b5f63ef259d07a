#[derive(clap::Args, Debug)]
pub struct CreateIntegrationArgs {
    /// Cloud provider of the customer account. Defaults to the configured provider.
    #[arg(long)]
    provider: Option<String>,
}

#[tokio::main]
pub async fn run(
    global: &crate::cmd::GlobalArgs,
    args: &CreateIntegrationArgs,
) -> Result<(), anyhow::Error> {
    use crate::store::IntegrationStore;

    let config = global.load_config().await?;
    let provider = match args.provider.as_deref() {
        Some(p) => p.parse()?,
        None => config.provider,
    };

    let store = crate::cmd::file_store(&config);
    let orchestrator = crate::orchestrator::Orchestrator::new_with_aws(config).await;
    let created = orchestrator.create_integration(provider)?;
    store.save(&created.integration).await?;

    let product = env!("CARGO_PKG_NAME");
    let id = &created.integration.integration_id;
    eprintln!(
        "{}",
        indoc::formatdoc! {"
            :: {product} :: Integration {id} created
            :: {product} :: Open the onboarding_url in the customer's AWS console to create the trust stack, then run
            :: {product} ::   $ {product} provision-admin {id} --account-id <ACCOUNT_ID>
        "}
    );
    serde_json::to_writer_pretty(
        std::io::stdout(),
        &crate::server::IntegrationResponse {
            integration: created.integration,
            onboarding_url: created.onboarding_url,
        },
    )?;
    println!();
    Ok(())
}
