//! Engine configuration (`ot-sync.toml`).
//!
//! Every section is optional; a missing file means all defaults.
//!
//! ```toml
//! [walk]
//! max_commits = 100000
//!
//! [merge]
//! dump_graph = false
//!
//! [log]
//! format = "pretty"
//! filter = "info"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Graph traversal limits.
    #[serde(default)]
    pub walk: WalkConfig,

    /// Merge diagnostics.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Subscriber settings for [`crate::telemetry::init`].
    #[serde(default)]
    pub log: LogConfig,
}

/// Graph traversal limits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkConfig {
    /// Upper bound on commits a single walk may load. Exceeding it fails the
    /// walk as an incomplete graph. Unbounded when absent.
    #[serde(default)]
    pub max_commits: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Log the loaded graph in DOT format at debug level before merging.
    #[serde(default)]
    pub dump_graph: bool,
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

/// Output format of the stderr log layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// `EnvFilter` directives used when `RUST_LOG` is unset
    /// (default: `"info"`).
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Why an engine configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: cannot read engine config: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bad TOML, an unknown key, or a value the engine cannot run with.
    #[error("{}: {message}", location(path.as_deref(), *line))]
    Invalid {
        path: Option<PathBuf>,
        line: Option<usize>,
        message: String,
    },
}

impl ConfigError {
    /// The file being loaded, if the config came from one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } => Some(path),
            Self::Invalid { path, .. } => path.as_deref(),
        }
    }

    fn at(mut self, file: &Path) -> Self {
        if let Self::Invalid { path, .. } = &mut self {
            *path = Some(file.to_owned());
        }
        self
    }
}

fn location(path: Option<&Path>, line: Option<usize>) -> String {
    let source = path.map_or_else(|| "engine config".to_owned(), |p| p.display().to_string());
    match line {
        Some(line) => format!("{source} line {line}"),
        None => source,
    }
}

impl EngineConfig {
    /// Read `path`; a missing file means the defaults.
    ///
    /// # Errors
    /// [`ConfigError::Read`] if the file exists but cannot be read, otherwise
    /// whatever [`EngineConfig::parse`] reports, tagged with `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).map_err(|e| e.at(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// # Errors
    /// [`ConfigError::Invalid`] for malformed TOML, unknown keys, or a zero
    /// `walk.max_commits`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Invalid {
            path: None,
            line: e
                .span()
                .map(|span| text[..span.start].matches('\n').count() + 1),
            message: e.message().to_owned(),
        })?;
        if config.walk.max_commits == Some(0) {
            return Err(ConfigError::Invalid {
                path: None,
                line: None,
                message: "walk.max_commits must allow at least one commit".to_owned(),
            });
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
