//! What the attached terminal can show
//!
//! Colors go to stdout with the report; the spinner draws on stderr so
//! `orgscope usage --format json | jq` still gets one while the org is read.

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdout};

/// Variables whose presence means a build runner, not a person, is watching
const CI_MARKERS: &[&str] = &["CI", "BUILD_NUMBER", "TF_BUILD", "TEAMCITY_VERSION"];

/// Snapshot of the process's streams and terminal environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalCaps {
    pub stdout_tty: bool,
    pub stderr_tty: bool,
    /// `NO_COLOR` is set (any value)
    pub no_color: bool,
    pub ci: bool,
    /// `TERM`, when set
    pub term: Option<String>,
}

impl TerminalCaps {
    /// Read the capabilities of the current process
    pub fn detect() -> Self {
        Self {
            stdout_tty: stdout().is_terminal(),
            stderr_tty: stderr().is_terminal(),
            no_color: env::var_os("NO_COLOR").is_some(),
            ci: CI_MARKERS.iter().any(|var| env::var_os(var).is_some()),
            term: env::var("TERM").ok(),
        }
    }

    fn understands_escapes(&self) -> bool {
        match self.term.as_deref() {
            Some("dumb") => false,
            Some(_) => true,
            // Windows consoles take ANSI codes without TERM
            None => cfg!(windows),
        }
    }

    /// Whether reports on stdout should be colored
    pub fn use_color(&self) -> bool {
        self.stdout_tty && !self.no_color && !self.ci && self.understands_escapes()
    }

    /// Whether a spinner may be drawn on stderr
    pub fn show_spinner(&self) -> bool {
        self.stderr_tty && !self.ci && self.understands_escapes()
    }
}
