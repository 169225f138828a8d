//! CLI argument definitions for the tutor binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tutor_core::types::Credentials;

/// Tutor: analyze PDFs and YouTube videos, ask grounded questions, and build
/// chapter study plans.
#[derive(Parser, Debug)]
#[command(name = "tutor", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the analysis backend.
    #[arg(long = "api-base")]
    pub api_base: Option<String>,

    /// Bearer token sent with every request.
    #[arg(long = "token")]
    pub token: Option<String>,

    /// CSRF token sent with every request.
    #[arg(long = "csrf")]
    pub csrf: Option<String>,

    /// Data directory for the local history database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Serve chapter history from the local SQLite store.
    #[arg(long = "offline")]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Analyze a PDF or YouTube video, then ask questions about it.
    Scan {
        #[command(subcommand)]
        source: ScanSource,
    },
    /// Generate a chapter outline for a topic.
    Chapters { topic: String, level: String },
    /// Fetch videos and websites for one chapter.
    Resources {
        topic: String,
        level: String,
        chapter: String,
    },
    /// Generate chapters, expand all of them, and save the run to history.
    Snapshot { topic: String, level: String },
    /// Browse saved chapter runs.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// List previously analyzed documents and videos.
    Documents,
    /// Build a multiple-choice quiz from a chapter's videos.
    Quiz {
        topic: String,
        level: String,
        chapter: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ScanSource {
    Pdf { file: PathBuf },
    Youtube { url: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HistoryAction {
    List,
    /// Show a saved run; with a chapter name, show its stored resources.
    Show { id: String, chapter: Option<String> },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TUTOR_CONFIG env var > ~/.tutor/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TUTOR_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --api-base flag > TUTOR_API_BASE env var > config file value.
    pub fn resolve_base_url(&self, config_base: &str) -> String {
        if let Some(ref url) = self.api_base {
            return url.clone();
        }
        match std::env::var("TUTOR_API_BASE") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => config_base.to_string(),
        }
    }

    /// Tokens from flags, then TUTOR_TOKEN / TUTOR_CSRF. Missing tokens are
    /// simply not sent.
    pub fn resolve_credentials(&self) -> Credentials {
        Credentials {
            bearer_token: self.token.clone().or_else(|| non_blank_env("TUTOR_TOKEN")),
            csrf_token: self.csrf.clone().or_else(|| non_blank_env("TUTOR_CSRF")),
        }
    }

    /// Returns `None` if not overridden (use config default).
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    pub fn resolve_offline(&self, config_offline: bool) -> bool {
        self.offline || config_offline
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".tutor").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".tutor").join("config.toml");
    }
    PathBuf::from("config.toml")
}
