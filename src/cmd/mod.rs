pub mod create_integration;
pub mod provision_admin;
pub mod serve;
pub mod show_integration;

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the configuration file ($XDG_CONFIG_HOME/zop-onboard/config.json by default).
    #[arg(long, global = true, env = "ZOP_ONBOARD_CONFIG")]
    pub config: Option<std::path::PathBuf>,
}

impl GlobalArgs {
    pub async fn load_config(&self) -> crate::Result<std::sync::Arc<crate::config::Config>> {
        Ok(std::sync::Arc::new(
            crate::config::Config::load(self.config.as_deref()).await?,
        ))
    }
}

pub(crate) fn file_store(config: &crate::config::Config) -> crate::store::FileIntegrationStore {
    crate::store::FileIntegrationStore::new(config.data_dir())
}
