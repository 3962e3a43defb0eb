use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Deserialize)]
pub struct Config {
    pub office: OfficeSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub tracking: TrackingSection,
}

#[derive(Deserialize)]
pub struct OfficeSection {
    /// Office code a manifest header must carry before any insert is allowed.
    pub expected_code: String,
}

#[derive(Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "manifest.db".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Deserialize)]
pub struct TrackingSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://pid.posindonesia.co.id/lacak/admin/detail_lacak_banyak.php".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
