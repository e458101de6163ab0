use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Context};

use crate::crawler::models::{ListingVariant, Pairing};

pub const DEFAULT_BASE_URL: &str = "https://www.moviepilot.de";

pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// May be empty; resolved interactively before the run starts.
    pub target_user: String,
    pub variant: ListingVariant,
    pub pairing: Pairing,
    pub output_path: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("target_user", &self.target_user)
            .field("variant", &self.variant)
            .field("pairing", &self.pairing)
            .field("output_path", &self.output_path)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).unwrap_or_default();

        let variant = match lookup("EXPORT_VARIANT").filter(|v| !v.trim().is_empty()) {
            Some(v) => v
                .parse::<ListingVariant>()
                .map_err(|e| anyhow!(e))
                .context("invalid EXPORT_VARIANT")?,
            None => ListingVariant::default(),
        };

        let pairing = match lookup("EXPORT_PAIRING").filter(|v| !v.trim().is_empty()) {
            Some(v) => v
                .parse::<Pairing>()
                .map_err(|e| anyhow!(e))
                .context("invalid EXPORT_PAIRING")?,
            None => Pairing::default(),
        };

        let base_url = lookup("MOVIEPILOT_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            base_url,
            username: var("MOVIEPILOT_USERNAME"),
            password: var("MOVIEPILOT_PASSWORD"),
            target_user: var("MOVIEPILOT_TARGET_USER"),
            variant,
            pairing,
            output_path: lookup("EXPORT_OUTPUT")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Explicit `EXPORT_OUTPUT`, otherwise `<cwd>/<user>.csv`.
    pub fn output_path_for(&self, user: &str) -> anyhow::Result<PathBuf> {
        match &self.output_path {
            Some(path) => Ok(path.clone()),
            None => {
                let cwd = env::current_dir().context("failed to resolve working directory")?;
                Ok(cwd.join(format!("{user}.csv")))
            }
        }
    }
}
