//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/landalloc/landalloc.toml`
//! 3. Local config: `./landalloc.toml`, or the file given with `--config`
//! 4. Environment variables: `LANDALLOC_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{Diagnostics, ModelContext};

/// Time axis of the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    /// Calendar year of period 0
    pub start_year: i32,
    /// Years per period
    pub timestep: u32,
    /// Number of model periods
    pub period_count: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let ctx = ModelContext::default();
        Self {
            start_year: ctx.start_year(),
            timestep: ctx.timestep(),
            period_count: ctx.period_count(),
        }
    }
}

/// How loudly unsatisfiable requests are reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub warn_on_missing: bool,
    pub warn_on_duplicate: bool,
}

/// Partial settings as read from a single file; absent keys keep the
/// value of the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    model: RawModel,
    #[serde(default)]
    diagnostics: RawDiagnostics,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawModel {
    start_year: Option<i32>,
    timestep: Option<u32>,
    period_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawDiagnostics {
    warn_on_missing: Option<bool>,
    warn_on_duplicate: Option<bool>,
}

/// Unified configuration for landalloc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub diagnostics: DiagnosticsSettings,
}

/// Get the XDG config directory for landalloc.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "landalloc").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("landalloc.toml"))
}

/// Local config picked up from the working directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from("landalloc.toml")
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load settings through all layers.
    ///
    /// An explicitly given `local_config` must exist; the implicit
    /// `./landalloc.toml` is optional.
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        match local_config {
            Some(path) => current = current.merge_with(&load_raw_settings(path)?),
            None => {
                let path = local_config_path();
                if path.exists() {
                    current = current.merge_with(&load_raw_settings(&path)?);
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        Ok(current)
    }

    /// Load a single file over the compiled defaults, ignoring the global
    /// layer and the environment.
    pub fn load_file(path: &Path) -> Result<Self, ApplicationError> {
        Ok(Self::default().merge_with(&load_raw_settings(path)?))
    }

    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let model = &overlay.model;
        let diagnostics = &overlay.diagnostics;
        Self {
            model: ModelSettings {
                start_year: model.start_year.unwrap_or(self.model.start_year),
                timestep: model.timestep.unwrap_or(self.model.timestep),
                period_count: model.period_count.unwrap_or(self.model.period_count),
            },
            diagnostics: DiagnosticsSettings {
                warn_on_missing: diagnostics
                    .warn_on_missing
                    .unwrap_or(self.diagnostics.warn_on_missing),
                warn_on_duplicate: diagnostics
                    .warn_on_duplicate
                    .unwrap_or(self.diagnostics.warn_on_duplicate),
            },
        }
    }

    /// Apply LANDALLOC_* environment variables as explicit overrides,
    /// e.g. `LANDALLOC_MODEL__PERIOD_COUNT=4`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("LANDALLOC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<i32>("model.start_year") {
            settings.model.start_year = val;
        }
        if let Ok(val) = config.get::<u32>("model.timestep") {
            settings.model.timestep = val;
        }
        if let Ok(val) = config.get::<usize>("model.period_count") {
            settings.model.period_count = val;
        }
        if let Ok(val) = config.get_bool("diagnostics.warn_on_missing") {
            settings.diagnostics.warn_on_missing = val;
        }
        if let Ok(val) = config.get_bool("diagnostics.warn_on_duplicate") {
            settings.diagnostics.warn_on_duplicate = val;
        }

        Ok(settings)
    }

    /// Validated time axis.
    pub fn context(&self) -> Result<ModelContext, ApplicationError> {
        Ok(ModelContext::new(
            self.model.start_year,
            self.model.timestep,
            self.model.period_count,
        )?)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            warn_on_missing: self.diagnostics.warn_on_missing,
            warn_on_duplicate: self.diagnostics.warn_on_duplicate,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# landalloc configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/landalloc/landalloc.toml
#   Local:  ./landalloc.toml or the file passed with --config
#   Env:    LANDALLOC_* environment variables, e.g. LANDALLOC_MODEL__TIMESTEP=5

[model]
# Calendar year of period 0
# start_year = 1990

# Years per period; productivity changes compound over this many years
# timestep = 15

# Number of model periods
# period_count = 9

[diagnostics]
# Warn when calibration data or rates name an item the tree does not have
# warn_on_missing = false

# Warn when a child is dropped because its name already exists in the tree
# warn_on_duplicate = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_building_context_then_matches_model_defaults() {
        let settings = Settings::default();

        let ctx = settings.context().expect("valid context");

        assert_eq!(ctx.start_year(), 1990);
        assert_eq!(ctx.timestep(), 15);
        assert_eq!(ctx.period_count(), 9);
        assert!(!settings.diagnostics().warn_on_missing);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_lower_layer_values() {
        let base = Settings::default();
        let overlay: RawSettings = toml::from_str(
            r#"
[model]
timestep = 5

[diagnostics]
warn_on_duplicate = true
"#,
        )
        .expect("parse overlay");

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.model.timestep, 5);
        assert_eq!(merged.model.start_year, 1990);
        assert_eq!(merged.model.period_count, 9);
        assert!(merged.diagnostics.warn_on_duplicate);
        assert!(!merged.diagnostics.warn_on_missing);
    }

    #[test]
    fn given_zero_periods_when_building_context_then_fails() {
        let mut settings = Settings::default();
        settings.model.period_count = 0;

        let result = settings.context();

        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }

    #[test]
    fn given_template_when_parsed_then_yields_defaults() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");

        let settings = Settings::default().merge_with(&raw);

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips_through_file_loader() {
        let mut settings = Settings::default();
        settings.model.period_count = 3;
        settings.diagnostics.warn_on_missing = true;

        let text = settings.to_toml().expect("serialize");
        let raw: RawSettings = toml::from_str(&text).expect("parse");

        assert_eq!(Settings::default().merge_with(&raw), settings);
    }
}
