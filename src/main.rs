#[derive(clap::Parser)]
#[clap(author, version, long_about = None)]
#[clap(about = "Cross-account AWS onboarding: trust stack URLs and admin provisioning")]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(flatten)]
    global: zop_onboard::cmd::GlobalArgs,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Serve the HTTP API.
    Serve(zop_onboard::cmd::serve::ServeArgs),
    /// Create an integration and print its onboarding URL.
    CreateIntegration(zop_onboard::cmd::create_integration::CreateIntegrationArgs),
    /// Assume the integration role and provision an admin IAM user in the customer account.
    ProvisionAdmin(zop_onboard::cmd::provision_admin::ProvisionAdminArgs),
    /// Show a stored integration and its onboarding URL.
    ShowIntegration(zop_onboard::cmd::show_integration::ShowIntegrationArgs),
}

fn main() -> Result<std::process::ExitCode, anyhow::Error> {
    use clap::Parser;
    let cli = Cli::parse();

    let log_to_file = matches!(&cli.command, Commands::Serve(args) if args.log_to_file);
    let _guard = enable_tracing(log_to_file)?;

    let retval = match &cli.command {
        Commands::Serve(args) => zop_onboard::cmd::serve::run(&cli.global, args),
        Commands::CreateIntegration(args) => {
            zop_onboard::cmd::create_integration::run(&cli.global, args)
        }
        Commands::ProvisionAdmin(args) => zop_onboard::cmd::provision_admin::run(&cli.global, args),
        Commands::ShowIntegration(args) => {
            zop_onboard::cmd::show_integration::run(&cli.global, args)
        }
    };
    match retval {
        Ok(_) => Ok(std::process::ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<zop_onboard::Error>() {
            Some(zop_onboard::Error::FailureButSilentlyExit) => Ok(std::process::ExitCode::FAILURE),
            _ => Err(e),
        },
    }
}

fn enable_tracing(
    log_to_file: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, anyhow::Error> {
    let filter = match std::env::var("ZOP_ONBOARD_LOG") {
        Ok(l) => tracing_subscriber::EnvFilter::new(l),
        Err(_) => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("zop_onboard=info")),
    };

    if log_to_file {
        let appender = tracing_appender::rolling::daily(
            zop_onboard::config::log_dir_mkpath()?,
            format!("{}.log", env!("CARGO_PKG_NAME")),
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
        return Ok(Some(guard));
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(None)
}
