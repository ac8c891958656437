//! Settings loading for sheetsort.
//!
//! [`SorterSettings`] bundles the core [`SortConfig`] with the options the
//! command line front end needs. Settings come from, in order:
//!
//! 1. `$SHEETSORT_CONFIG_PATH` (TOML or JSON file),
//! 2. `$SHEETSORT_CONFIG_JSON` (inline JSON),
//! 3. the first default file that exists (`sheetsort.toml`,
//!    `sheetsort.json`, `config/sheetsort.toml`, `config/sheetsort.json`),
//! 4. built-in defaults.

use std::collections::BTreeMap;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use sheetsort_core::{ColumnType, SortConfig};
use tracing::debug;

/// Environment variable naming a settings file.
pub const CONFIG_PATH_ENV: &str = "SHEETSORT_CONFIG_PATH";
/// Environment variable holding inline JSON settings.
pub const CONFIG_JSON_ENV: &str = "SHEETSORT_CONFIG_JSON";

/// Source that produced the settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SorterSettingsSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Top-level sorter settings. Every field has a default, so a settings file
/// only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SorterSettings {
    /// Ordering and executor behaviour: undo registration, what happens to a
    /// running sort when another is requested, and the progress label.
    pub sort: SortConfig,
    /// Field separator used when reading and writing delimited rows.
    pub tsv_delimiter: char,
    /// Declared types by column name. Columns not listed are `any`, which
    /// compares cells as text.
    pub column_types: BTreeMap<String, ColumnType>,
}

impl Default for SorterSettings {
    fn default() -> Self {
        Self {
            sort: SortConfig::default(),
            tsv_delimiter: '\t',
            column_types: BTreeMap::new(),
        }
    }
}

impl SorterSettings {
    /// Load settings using the environment, default files and defaults, in
    /// that order. Returns where the settings came from.
    pub fn load_from_env() -> anyhow::Result<(Self, SorterSettingsSource)> {
        if let Ok(path_str) = env::var(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SorterSettingsSource::EnvPath(path)));
        }

        if let Ok(raw) = env::var(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed =
                Self::parse_json(&raw).with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, SorterSettingsSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SorterSettingsSource::File(path)));
        }

        Ok((Self::default(), SorterSettingsSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read sorter settings from {}", path.display()))?;

        debug!(
            target: "sheetsort::config",
            path = %path.display(),
            bytes = contents.len(),
            "loading sorter settings"
        );

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents)
                .with_context(|| format!("invalid sorter settings {}", path.display())),
            Some("toml") | Some("tml") => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid sorter settings {}: {}", path.display(), err)),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    /// Parse settings of unknown format: TOML first, then JSON.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse sorter settings {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid sorter settings json: {err}"))
    }

    /// Declared type of `column`, `any` when the settings do not name it.
    pub fn column_type(&self, column: &str) -> ColumnType {
        self.column_types.get(column).copied().unwrap_or_default()
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "sheetsort.toml",
            "sheetsort.json",
            "config/sheetsort.toml",
            "config/sheetsort.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }
}
