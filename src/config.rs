use crate::model::ResolutionLimits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub limits: ResolutionLimits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// JSON file holding an array of schemas; the demo registry is used when unset
    pub path: Option<String>,
}

impl AppConfig {
    /// Load configuration from defaults, an optional `content-query` file and
    /// `CQ__`-prefixed environment variables, in that order
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(config::File::with_name("content-query").required(false));

        // e.g. CQ__LIMITS__MAX_DEPTH=4 or CQ__REGISTRY__PATH=schemas.json
        config = config.add_source(
            config::Environment::with_prefix("CQ")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.limits
            .validate()
            .map_err(|reason| anyhow::anyhow!("Invalid resolution limits: {}", reason))
    }
}
