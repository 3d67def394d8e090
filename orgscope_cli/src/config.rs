use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use orgscope_core::{CoreConfig, RestClientConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable prefix; `__` separates nested keys
const ENV_PREFIX: &str = "ORGSCOPE_";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub org: OrgConfig,

    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the org lives and how to authenticate against it
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OrgConfig {
    pub instance_url: String,
    pub access_token: String,
    pub api_version: String,
    pub timeout_seconds: u64,
    /// Pool identity; empty means the instance URL
    pub identity: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            access_token: String::new(),
            api_version: "v59.0".to_string(),
            timeout_seconds: 120,
            identity: String::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

impl OrgConfig {
    /// Both the instance URL and an access token are set
    pub fn is_configured(&self) -> bool {
        !self.instance_url.trim().is_empty() && !self.access_token.trim().is_empty()
    }

    /// Identity under which connections to this org are pooled
    pub fn identity(&self) -> &str {
        if self.identity.trim().is_empty() {
            self.instance_url.trim_end_matches('/')
        } else {
            &self.identity
        }
    }

    pub fn client_config(&self) -> RestClientConfig {
        RestClientConfig {
            instance_url: self.instance_url.clone(),
            access_token: self.access_token.clone(),
            api_version: self.api_version.clone(),
            timeout_secs: self.timeout_seconds,
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        config
            .core
            .validate()
            .context("Invalid core configuration")?;
        Ok(config)
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let value = self.load_as_toml()?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation) in the config file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.validate_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            anyhow::bail!("Invalid key: '{}'", key);
        }
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| anyhow::anyhow!("Empty key"))?;

        let mut current = &mut config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), self.parse_config_value(key, value)?);

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;

        Ok(())
    }

    /// List all configuration values, sorted by key
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = self.load_as_toml()?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    fn load_as_toml(&self) -> Result<toml::Value> {
        let toml_string = toml::to_string(&self.load()?)?;
        Ok(toml::from_str(&toml_string)?)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {} // Skip arrays and other complex types
        }
    }

    /// Validate a configuration value
    fn validate_config_value(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "org.instance_url" => {
                if !(value.starts_with("https://") || value.starts_with("http://")) {
                    anyhow::bail!("instance_url must start with https:// or http://");
                }
            }
            "org.api_version" => {
                let valid = value
                    .strip_prefix('v')
                    .is_some_and(|v| v.parse::<f64>().is_ok());
                if !valid {
                    anyhow::bail!("api_version must look like v59.0");
                }
            }
            "org.timeout_seconds"
            | "core.pool.max_connections"
            | "core.pool.max_age_secs"
            | "core.pool.max_idle_secs"
            | "core.cache.max_entries_per_category"
            | "core.cache.default_ttl_secs"
            | "core.usage.report_limit"
            | "core.usage.email_template_limit"
            | "core.usage.progress_every" => {
                let number: u64 = value
                    .parse()
                    .with_context(|| format!("{key} must be a positive integer"))?;
                if number == 0 {
                    anyhow::bail!("{} must be greater than 0", key);
                }
            }
            "output.default_format" => {
                if !matches!(value, "text" | "json") {
                    anyhow::bail!("default_format must be 'text' or 'json'");
                }
            }
            "output.color_enabled" | "output.progress_enabled" => {
                let _: bool = value.parse().context("Value must be 'true' or 'false'")?;
            }
            _ => {} // No validation for unknown keys
        }
        Ok(())
    }

    /// Parse a value to the appropriate TOML type
    fn parse_config_value(&self, key: &str, value: &str) -> Result<toml::Value> {
        match key {
            // Tokens and versions stay strings even when they look numeric
            k if k.starts_with("org.") && k != "org.timeout_seconds" => {
                Ok(toml::Value::String(value.to_string()))
            }
            k if k.ends_with("_secs")
                || k.ends_with("_seconds")
                || k.ends_with("_limit")
                || k.ends_with("_every")
                || k.contains(".max_") =>
            {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            k if k.ends_with("_enabled") => {
                let bool_val: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(bool_val))
            }
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else if let Ok(f) = value.parse::<f64>() {
                    Ok(toml::Value::Float(f))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}

/// Mask secrets before a value is shown on screen
pub fn display_value(key: &str, value: &str) -> String {
    if key.ends_with("access_token") && !value.is_empty() {
        let start = value.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
        format!("****{}", &value[start..])
    } else {
        value.to_string()
    }
}

/// Load the configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_identity_defaults_to_instance_url() {
        let org = OrgConfig {
            instance_url: "https://acme.my.example.com/".into(),
            ..OrgConfig::default()
        };
        assert_eq!(org.identity(), "https://acme.my.example.com");

        let named = OrgConfig {
            identity: "prod".into(),
            ..org
        };
        assert_eq!(named.identity(), "prod");
    }

    #[test]
    fn test_client_config_mapping() {
        let org = OrgConfig {
            instance_url: "https://acme.example.com".into(),
            access_token: "00Dxx!token".into(),
            ..OrgConfig::default()
        };
        let client = org.client_config();
        assert_eq!(client.api_version, "v59.0");
        assert_eq!(client.timeout_secs, 120);
        assert!(org.is_configured());
        assert!(!OrgConfig::default().is_configured());
    }

    #[test]
    fn test_display_value_masks_tokens() {
        assert_eq!(display_value("org.access_token", "00Dxx!abcd1234"), "****1234");
        assert_eq!(display_value("org.access_token", ""), "");
        assert_eq!(display_value("org.api_version", "v59.0"), "v59.0");
    }
}
