use anyhow::{Context, bail};
use log::LevelFilter;
use navetane_core::standings::QualificationPolicy;
use navetane_core::store::StoreConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REFRESH_SECS: u64 = 60;
const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration, read from `NAVETANE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub full_screen: bool,
    pub log_level: LevelFilter,
    pub store: StoreConfig,
    pub qualification: QualificationPolicy,
    pub refresh_every: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: LevelFilter::Error,
            store: StoreConfig::Memory,
            qualification: QualificationPolicy::default(),
            refresh_every: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `NAVETANE_STORE_URL` wins over `NAVETANE_STORE_FILE`; with neither the
    /// store is an empty in-memory one.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let mut settings = Settings::default();

        if let Some(url) = var("NAVETANE_STORE_URL") {
            settings.store = StoreConfig::Http {
                base_url: url,
                token: var("NAVETANE_STORE_TOKEN"),
                timeout: STORE_TIMEOUT,
            };
        } else if let Some(path) = var("NAVETANE_STORE_FILE") {
            settings.store = StoreConfig::File(PathBuf::from(path));
        }

        if let Some(count) = var("NAVETANE_QUALIFIED_DEFAULT") {
            let count: usize = count
                .parse()
                .with_context(|| format!("NAVETANE_QUALIFIED_DEFAULT must be a number, got {count:?}"))?;
            settings.qualification = settings.qualification.with_default(count);
        }

        if let Some(level) = var("NAVETANE_LOG") {
            settings.log_level = LevelFilter::from_str(&level)
                .with_context(|| format!("NAVETANE_LOG is not a log level: {level:?}"))?;
        }

        if let Some(secs) = var("NAVETANE_REFRESH_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("NAVETANE_REFRESH_SECS must be a number, got {secs:?}"))?;
            if secs == 0 {
                bail!("NAVETANE_REFRESH_SECS must be at least 1");
            }
            settings.refresh_every = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    pub fn store_label(&self) -> String {
        match &self.store {
            StoreConfig::Http { base_url, .. } => base_url.clone(),
            StoreConfig::File(path) => path.display().to_string(),
            StoreConfig::Memory => "memory".to_owned(),
        }
    }
}
