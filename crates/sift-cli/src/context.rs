use anyhow::Context;
use sift_config::SiftConfig;
use sift_db::SiftService;

/// Shared resources opened once per invocation.
pub struct AppContext {
    pub service: SiftService,
    pub config: SiftConfig,
}

impl AppContext {
    /// Load layered config (including `.env`) and open the configured store.
    pub async fn init() -> anyhow::Result<Self> {
        let config = SiftConfig::load_with_dotenv().context("failed to load sift configuration")?;
        let service = SiftService::from_config(&config.store)
            .await
            .with_context(|| format!("failed to open store at {}", config.store.path))?;
        Ok(Self { service, config })
    }
}
