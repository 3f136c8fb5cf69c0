use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::sync::{Account, AccountRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalendarConfig {
    /// Account type the calendar directory is filtered to.
    pub account_type: Option<String>,
    pub default_title: Option<String>,
    pub default_duration_minutes: Option<i64>,
    /// IANA timezone identifier events are created with.
    pub timezone: Option<String>,
}

/// One account known to the (stand-in) account subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    pub account_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar: CalendarConfig {
                account_type: Some("com.google".to_string()),
                default_title: Some("My Calendar Event".to_string()),
                default_duration_minutes: Some(60),
                timezone: Some("UTC".to_string()),
            },
            accounts: vec![AccountConfig {
                name: "demo@example.com".to_string(),
                account_type: "com.google".to_string(),
            }],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save()?;
            return Ok(default_config);
        }

        // Read and parse config file
        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")
    }

    pub fn account_type(&self) -> &str {
        self.calendar.account_type.as_deref().unwrap_or("com.google")
    }

    pub fn default_title(&self) -> &str {
        self.calendar.default_title.as_deref().unwrap_or("My Calendar Event")
    }

    pub fn default_duration_minutes(&self) -> i64 {
        self.calendar.default_duration_minutes.unwrap_or(60)
    }

    pub fn timezone(&self) -> &str {
        self.calendar.timezone.as_deref().unwrap_or("UTC")
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|a| Account { name: a.name.clone(), account_type: a.account_type.clone() })
            .collect()
    }
}

fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "calprobe", "calprobe")
        .context("Failed to determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Config-backed implementation of the account lookup seam.
pub struct ConfigAccounts {
    accounts: Vec<Account>,
}

impl ConfigAccounts {
    pub fn from_config(config: &Config) -> Self {
        ConfigAccounts { accounts: config.accounts() }
    }
}

impl AccountRegistry for ConfigAccounts {
    fn accounts_by_type(&self, account_type: &str) -> Vec<Account> {
        self.accounts.iter().filter(|a| a.account_type == account_type).cloned().collect()
    }
}
