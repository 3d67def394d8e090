//! Configuration manager tests against files in temporary directories

use orgscope_cli::config::{ConfigManager, display_value};
use std::fs;
use tempfile::TempDir;

fn manager(dir: &TempDir) -> ConfigManager {
    ConfigManager::with_path(dir.path().join("orgscope").join("config.toml"))
}

#[cfg(test)]
mod set_get_tests {
    use super::*;

    #[test]
    fn test_set_creates_file_and_get_reads_it_back() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        assert!(!manager.get_config_path().exists());

        manager.set("org.instance_url", "https://acme.example.com").unwrap();

        assert!(manager.get_config_path().exists());
        assert_eq!(manager.get("org.instance_url").unwrap(), "https://acme.example.com");
    }

    #[test]
    fn test_numeric_looking_token_stays_a_string() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        manager.set("org.access_token", "12345").unwrap();

        let written = fs::read_to_string(manager.get_config_path()).unwrap();
        assert!(written.contains("access_token = \"12345\""));
        assert_eq!(manager.get("org.access_token").unwrap(), "12345");
    }

    #[test]
    fn test_core_settings_are_typed() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        manager.set("core.pool.max_connections", "3").unwrap();
        manager.set("core.cache.default_ttl_secs", "60").unwrap();
        manager.set("output.color_enabled", "false").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.core.pool.max_connections, 3);
        assert_eq!(config.core.cache.default_ttl_secs, 60);
        assert!(!config.output.color_enabled);
    }

    #[test]
    fn test_existing_values_survive_updates() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        manager.set("org.instance_url", "https://acme.example.com").unwrap();
        manager.set("org.identity", "prod").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.org.instance_url, "https://acme.example.com");
        assert_eq!(config.org.identity(), "prod");
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let err = manager.get("org.nothing_here").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_invalid_values_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        assert!(manager.set("org.instance_url", "acme.example.com").is_err());
        assert!(manager.set("org.api_version", "59.0").is_err());
        assert!(manager.set("core.pool.max_connections", "0").is_err());
        assert!(manager.set("core.usage.report_limit", "many").is_err());
        assert!(manager.set("output.default_format", "xml").is_err());
        assert!(manager.set("output.progress_enabled", "yes").is_err());

        assert!(!manager.get_config_path().exists());
    }

    #[test]
    fn test_invalid_core_file_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let path = manager.get_config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[core.pool]\nmax_connections = 0\n").unwrap();

        assert!(manager.load().is_err());
    }
}

#[cfg(test)]
mod list_tests {
    use super::*;

    #[test]
    fn test_list_includes_defaults_sorted() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let items = manager.list().unwrap();

        assert!(items.contains(&("core.pool.max_connections".to_string(), "10".to_string())));
        assert!(items.contains(&("org.api_version".to_string(), "v59.0".to_string())));
        assert!(items.contains(&("output.default_format".to_string(), "text".to_string())));
        let keys: Vec<&String> = items.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_listed_token_is_masked_for_display() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        manager.set("org.access_token", "00Dxx!abcdefgh").unwrap();

        let (key, value) = manager
            .list()
            .unwrap()
            .into_iter()
            .find(|(k, _)| k == "org.access_token")
            .unwrap();
        assert_eq!(display_value(&key, &value), "****efgh");
    }
}
