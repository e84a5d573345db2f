use crate::error::{IconError, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DATABASE_NAME: &str = "YouyeyeIconDB";
pub const DEFAULT_COLLECTION_NAME: &str = "history";
pub const DEFAULT_PRODUCT_NAME: &str = "youyeye";
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub base_dir: Option<PathBuf>,
    pub database_name: String,
    pub collection_name: String,
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub product_name: String,
    pub batch_size: usize,
    pub gemini: GeminiConfig,
    pub history: HistoryConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        let model = env::var("GEMINI_MODEL").unwrap_or(defaults.model);
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url);
        let timeout_secs = env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        GeminiConfig {
            api_key,
            model,
            base_url,
            timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            base_dir: None,
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let base_dir = env::var("ICON_HISTORY_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        HistoryConfig {
            base_dir,
            ..Self::default()
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_names(
        mut self,
        database_name: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        self.database_name = database_name.into();
        self.collection_name = collection_name.into();
        self
    }

    /// Explicit directory first, then the platform data directory.
    /// `None` means the host offers no place to persist history.
    pub fn resolve_base_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.base_dir {
            return Some(dir.clone());
        }
        dirs::data_dir().map(|mut dir| {
            dir.push("icon-studio");
            dir
        })
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            gemini: GeminiConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let product_name = env::var("ICON_PRODUCT_NAME")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string());
        let batch_size = env::var("ICON_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        StudioConfig {
            product_name,
            batch_size,
            gemini: GeminiConfig::from_env(),
            history: HistoryConfig::from_env(),
        }
    }

    pub fn with_product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = product_name.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_history(mut self, config: HistoryConfig) -> Self {
        self.history = config;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IconError::ConfigError(
                "batch size must be at least 1".into(),
            ));
        }
        if self.product_name.trim().is_empty() {
            return Err(IconError::ConfigError("product name is required".into()));
        }
        if self.history.database_name.trim().is_empty()
            || self.history.collection_name.trim().is_empty()
        {
            return Err(IconError::ConfigError(
                "history database and collection names are required".into(),
            ));
        }
        Ok(())
    }
}
