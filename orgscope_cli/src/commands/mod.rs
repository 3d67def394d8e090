//! Subcommands that talk to an org
//!
//! Each command builds an [`OrgScope`] from the loaded configuration, runs
//! one library operation through the connection pool and hands the result
//! to the selected formatter.

pub mod diagnose;
pub mod usage;

use crate::config::{AppConfig, OrgConfig};
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, OutputFormatter, create_formatter};
use indicatif::{ProgressBar, ProgressStyle};
use orgscope_core::{OrgScope, QueryClient, RestClient};
use std::sync::Arc;
use std::time::Duration;

/// How results are presented
#[derive(Debug, Clone, Copy)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub use_color: bool,
    pub show_progress: bool,
}

impl OutputSettings {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        create_formatter(self.format, self.use_color)
    }
}

/// The org section, or a misuse error telling the user how to set it up
pub fn require_org(config: &AppConfig) -> CliResult<&OrgConfig> {
    if config.org.is_configured() {
        Ok(&config.org)
    } else {
        Err(CliError::not_configured())
    }
}

/// Library context built from the `[core]` section
pub fn build_scope(config: &AppConfig) -> CliResult<OrgScope> {
    Ok(OrgScope::new(config.core.clone())?)
}

/// Factory the pool calls when it has no reusable session for the org
pub fn client_factory(
    org: &OrgConfig,
) -> impl FnOnce() -> orgscope_core::Result<Arc<dyn QueryClient>> + use<> {
    let client_config = org.client_config();
    move || {
        let client = RestClient::new(&client_config)?;
        Ok(Arc::new(client) as Arc<dyn QueryClient>)
    }
}

/// Spinner on stderr while a long call runs; `None` when progress is off
pub fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Print the operation's outcome, or report its failure
///
/// JSON output always gets an envelope on stdout, failures included, so
/// scripts never have to parse stderr.
pub fn emit<T>(
    settings: &OutputSettings,
    result: orgscope_core::Result<T>,
    render: impl FnOnce(&dyn OutputFormatter, &T) -> anyhow::Result<String>,
) -> CliResult<T> {
    let formatter = settings.formatter();
    match result {
        Ok(value) => {
            println!("{}", render(formatter.as_ref(), &value)?);
            Ok(value)
        }
        Err(error) => {
            if let Some(document) = formatter.format_failure(&error)? {
                println!("{document}");
            }
            Err(CliError::from(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_org_rejects_missing_token() {
        let mut config = AppConfig::default();
        config.org.instance_url = "https://acme.example.com".into();
        assert!(require_org(&config).is_err());

        config.org.access_token = "token".into();
        assert!(require_org(&config).is_ok());
    }

    #[test]
    fn test_disabled_spinner_is_none() {
        assert!(spinner(false, "working").is_none());
    }
}
