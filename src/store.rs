//! Persistence port for integrations, with file-backed and in-memory adapters.

#[async_trait::async_trait]
pub trait IntegrationStore: Send + Sync {
    /// Stores a new integration. Integrations are immutable; saving an existing id fails.
    async fn save(&self, integration: &crate::integration::Integration) -> crate::Result<()>;
    async fn load(&self, integration_id: &str) -> crate::Result<crate::integration::Integration>;
}

/// Ids become file names, so only a conservative character set is accepted.
fn validate_id(integration_id: &str) -> crate::Result<()> {
    if integration_id.is_empty()
        || integration_id.len() > 128
        || !integration_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(crate::Error::InvalidInput(format!(
            "integration id '{integration_id}' is invalid"
        )));
    }
    Ok(())
}

/// One JSON file per integration under `<data_dir>/integrations/`.
#[derive(Debug, Clone)]
pub struct FileIntegrationStore {
    dir: std::path::PathBuf,
}

impl FileIntegrationStore {
    pub fn new(data_dir: impl AsRef<std::path::Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("integrations"),
        }
    }

    fn path_for(&self, integration_id: &str) -> crate::Result<std::path::PathBuf> {
        validate_id(integration_id)?;
        Ok(self.dir.join(format!("{integration_id}.json")))
    }
}

#[async_trait::async_trait]
impl IntegrationStore for FileIntegrationStore {
    async fn save(&self, integration: &crate::integration::Integration) -> crate::Result<()> {
        use tokio::io::AsyncWriteExt;

        let path = self.path_for(&integration.integration_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tracing::debug!(path = %path.display(), integration = ?integration, "saving integration");

        let data = serde_json::to_string_pretty(integration)?;
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(crate::Error::InvalidInput(format!(
                    "integration '{}' already exists",
                    integration.integration_id
                )));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn load(&self, integration_id: &str) -> crate::Result<crate::integration::Integration> {
        let path = self.path_for(integration_id)?;
        let data = match tokio::fs::read(&path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(crate::Error::IntegrationNotFound(integration_id.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        let parsed: crate::integration::Integration = serde_json::from_slice(&data)?;
        if parsed.integration_id != integration_id {
            tracing::error!(path = %path.display(), "integration file holds a different id");
            return Err(crate::Error::IntegrationNotFound(integration_id.to_owned()));
        }
        Ok(parsed)
    }
}

#[derive(Clone, Default)]
pub struct MemoryIntegrationStore {
    items: std::sync::Arc<
        std::sync::RwLock<std::collections::HashMap<String, crate::integration::Integration>>,
    >,
}

impl std::fmt::Debug for MemoryIntegrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIntegrationStore").finish()
    }
}

impl MemoryIntegrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IntegrationStore for MemoryIntegrationStore {
    async fn save(&self, integration: &crate::integration::Integration) -> crate::Result<()> {
        validate_id(&integration.integration_id)?;
        let mut items = self.items.write().unwrap();
        if items.contains_key(&integration.integration_id) {
            return Err(crate::Error::InvalidInput(format!(
                "integration '{}' already exists",
                integration.integration_id
            )));
        }
        items.insert(integration.integration_id.clone(), integration.clone());
        Ok(())
    }

    async fn load(&self, integration_id: &str) -> crate::Result<crate::integration::Integration> {
        let items = self.items.read().unwrap();
        items
            .get(integration_id)
            .cloned()
            .ok_or_else(|| crate::Error::IntegrationNotFound(integration_id.to_owned()))
    }
}
