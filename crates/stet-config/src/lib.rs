//! TOML configuration for stet.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stet_types::{BorderGlyphs, ConfigError};

/// The default initial gap buffer capacity (64 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 1 << 16;

/// Resolved configuration for a stet session.
#[derive(Debug, Clone)]
pub struct StetConfig {
    pub border: bool,
    pub buffer_capacity: usize,
    pub glyphs: BorderGlyphs,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub glyphs: GlyphOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub border: Option<bool>,
    pub buffer_capacity: Option<usize>,
}

/// Border glyph overrides from the `[glyphs]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlyphOverrides {
    pub top: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
    pub right: Option<String>,
    pub overflow_top: Option<String>,
    pub overflow_bottom: Option<String>,
    pub overflow_left: Option<String>,
    pub overflow_right: Option<String>,
}

/// Apply file overrides on top of `glyphs`, validating each one.
fn merge_glyphs(
    mut glyphs: BorderGlyphs,
    overrides: GlyphOverrides,
) -> Result<BorderGlyphs, ConfigError> {
    let rows = [
        ("glyphs.top", overrides.top, &mut glyphs.top),
        ("glyphs.bottom", overrides.bottom, &mut glyphs.bottom),
        ("glyphs.overflow_top", overrides.overflow_top, &mut glyphs.overflow_top),
        (
            "glyphs.overflow_bottom",
            overrides.overflow_bottom,
            &mut glyphs.overflow_bottom,
        ),
    ];
    for (key, value, slot) in rows {
        if let Some(v) = value {
            validate_row_glyph(key, &v)?;
            *slot = v;
        }
    }

    let columns = [
        ("glyphs.left", overrides.left, &mut glyphs.left),
        ("glyphs.right", overrides.right, &mut glyphs.right),
        (
            "glyphs.overflow_left",
            overrides.overflow_left,
            &mut glyphs.overflow_left,
        ),
        (
            "glyphs.overflow_right",
            overrides.overflow_right,
            &mut glyphs.overflow_right,
        ),
    ];
    for (key, value, slot) in columns {
        if let Some(v) = value {
            validate_column_glyph(key, &v)?;
            *slot = v;
        }
    }

    Ok(glyphs)
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub border: Option<bool>,
}

impl StetConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables (`STET_BORDER`)
    /// 3. Config file (~/.stet/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let env_border = match std::env::var("STET_BORDER") {
            Ok(v) => Some(parse_bool("STET_BORDER", &v)?),
            Err(_) => None,
        };
        Self::load_from(config_dir(), env_border, overrides)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(
        config_dir: PathBuf,
        env_border: Option<bool>,
        overrides: CliOverrides,
    ) -> Result<Self, ConfigError> {
        let settings = load_settings_file(&config_dir.join("config.toml"))?;

        let border = overrides
            .border
            .or(env_border)
            .or(settings.display.border)
            .unwrap_or(false);

        let buffer_capacity = settings
            .display
            .buffer_capacity
            .unwrap_or(DEFAULT_BUFFER_CAPACITY);
        if buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "display.buffer_capacity".into(),
                message: "must be greater than zero".into(),
            });
        }

        let glyphs = merge_glyphs(BorderGlyphs::default(), settings.glyphs)?;

        Ok(StetConfig {
            border,
            buffer_capacity,
            glyphs,
        })
    }
}

/// Get the stet config directory path (~/.stet/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STET_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stet")
}

/// Load and parse a TOML settings file. A missing file yields defaults.
fn load_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        Err(e) => {
            tracing::debug!("No config at {}: {}", path.display(), e);
            Ok(SettingsFile::default())
        }
    }
}

/// Parse a boolean flag value as found in environment variables.
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn validate_row_glyph(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.chars().any(char::is_control) {
        return Err(ConfigError::InvalidValue {
            key: key.into(),
            message: "must be non-empty printable text".into(),
        });
    }
    Ok(())
}

fn validate_column_glyph(key: &str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Ok(()),
        _ => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: "must be exactly one printable character".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) {
        std::fs::write(dir.path().join("config.toml"), body).unwrap();
    }

    #[test]
    fn test_default_settings() {
        let settings = SettingsFile::default();
        assert!(settings.display.border.is_none());
        assert!(settings.glyphs.top.is_none());
    }

    #[test]
    fn test_settings_toml_parse() {
        let toml_str = r#"
[display]
border = true
buffer_capacity = 4096

[glyphs]
overflow_left = "<"
overflow_top = "^^^^"
"#;
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.display.border, Some(true));
        assert_eq!(settings.display.buffer_capacity, Some(4096));
        assert_eq!(settings.glyphs.overflow_left.as_deref(), Some("<"));
        assert_eq!(settings.glyphs.overflow_top.as_deref(), Some("^^^^"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config =
            StetConfig::load_from(dir.path().to_path_buf(), None, CliOverrides::default())
                .unwrap();
        assert!(!config.border);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.glyphs, BorderGlyphs::default());
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[display]\nborder = true\n");

        let from_file =
            StetConfig::load_from(dir.path().to_path_buf(), None, CliOverrides::default())
                .unwrap();
        assert!(from_file.border);

        let from_env = StetConfig::load_from(
            dir.path().to_path_buf(),
            Some(false),
            CliOverrides::default(),
        )
        .unwrap();
        assert!(!from_env.border);

        let from_cli = StetConfig::load_from(
            dir.path().to_path_buf(),
            Some(false),
            CliOverrides { border: Some(true) },
        )
        .unwrap();
        assert!(from_cli.border);
    }

    #[test]
    fn test_glyph_overrides_merge_with_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[glyphs]\noverflow_right = \">\"\n");
        let config =
            StetConfig::load_from(dir.path().to_path_buf(), None, CliOverrides::default())
                .unwrap();
        assert_eq!(config.glyphs.overflow_right, ">");
        assert_eq!(config.glyphs.left, "~");
    }

    #[test]
    fn test_wide_column_glyph_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[glyphs]\nleft = \"<<\"\n");
        let err =
            StetConfig::load_from(dir.path().to_path_buf(), None, CliOverrides::default())
                .unwrap_err();
        assert!(err.to_string().contains("glyphs.left"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[display\nborder = ");
        let err =
            StetConfig::load_from(dir.path().to_path_buf(), None, CliOverrides::default())
                .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[display]\nbuffer_capacity = 0\n");
        assert!(
            StetConfig::load_from(dir.path().to_path_buf(), None, CliOverrides::default())
                .is_err()
        );
    }

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool("STET_BORDER", "yes").unwrap());
        assert!(parse_bool("STET_BORDER", "TRUE").unwrap());
        assert!(!parse_bool("STET_BORDER", "0").unwrap());
        assert!(parse_bool("STET_BORDER", "maybe").is_err());
    }
}
