//! Store configuration, loadable from TOML, JSON or YAML

use std::path::PathBuf;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::io::{self, WriteOptions};
use crate::mode::{FileType, TextEncoding};
use crate::{Error, NormalizedPath, Operation, Result};

/// Content mode as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    #[default]
    Text,
    Binary,
}

/// Settings needed to open a [`LocalFileStore`](crate::LocalFileStore).
///
/// ```toml
/// root = "/var/lib/pipeline/normalize"
/// mode = "text"
/// encoding = "utf-8"
/// create_if_missing = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub mode: ContentMode,
    /// Only meaningful in text mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<TextEncoding>,
    #[serde(default)]
    pub create_if_missing: bool,
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

fn default_fsync() -> bool {
    WriteOptions::default().fsync
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mode: ContentMode::default(),
            encoding: None,
            create_if_missing: false,
            fsync: default_fsync(),
        }
    }

    pub fn file_type(&self) -> FileType {
        match self.mode {
            ContentMode::Text => FileType::Text(self.encoding.unwrap_or_default()),
            ContentMode::Binary => FileType::Binary,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions { fsync: self.fsync }
    }

    /// Load a configuration file, format chosen by extension.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        load_document(path)
    }

    /// Save the configuration atomically, format chosen by extension.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        save_document(path, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    fn detect(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        match extension.to_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

/// Deserialize a TOML, JSON or YAML document.
///
/// - `.toml` -> TOML
/// - `.json` -> JSON
/// - `.yaml`, `.yml` -> YAML
pub fn load_document<T: DeserializeOwned>(path: &NormalizedPath) -> Result<T> {
    let format = ConfigFormat::detect(path)?;
    let content = std::fs::read_to_string(path.to_native())
        .map_err(|e| Error::from_io(Operation::ReadConfig, path.to_native(), e))?;

    let parse_error = |message: String| Error::ConfigParse {
        path: path.to_native(),
        format: format.name().into(),
        message,
    };

    match format {
        ConfigFormat::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        ConfigFormat::Json => {
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
    }
}

/// Serialize `value` and write it atomically next to its final location.
pub fn save_document<T: Serialize>(path: &NormalizedPath, value: &T) -> Result<()> {
    let format = ConfigFormat::detect(path)?;

    let serialize_error = |message: String| Error::ConfigSerialize {
        path: path.to_native(),
        format: format.name().into(),
        message,
    };

    let content = match format {
        ConfigFormat::Toml => {
            toml::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
        }
        ConfigFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
        }
        ConfigFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string()))?
        }
    };

    let target = NormalizedPath::new(
        std::path::absolute(path.to_native())
            .map_err(|e| Error::io(Operation::Save, path.to_native(), e))?,
    );
    let (Some(dir), Some(name)) = (target.parent(), target.file_name()) else {
        return Err(Error::InvalidPath {
            path: target.to_string(),
            reason: "config path has no file name".into(),
        });
    };

    io::save_atomic(
        &dir,
        name,
        content.as_str(),
        FileType::default(),
        WriteOptions::default(),
    )
    .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_mode_ignores_encoding() {
        let config = StoreConfig {
            mode: ContentMode::Binary,
            encoding: Some(TextEncoding::Utf16Le),
            ..StoreConfig::new("/data")
        };
        assert_eq!(config.file_type(), FileType::Binary);
    }

    #[test]
    fn text_mode_defaults_to_utf8() {
        assert_eq!(
            StoreConfig::new("/data").file_type(),
            FileType::Text(TextEncoding::Utf8)
        );
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: StoreConfig = toml::from_str(r#"root = "/data""#).unwrap();
        assert_eq!(config, StoreConfig::new("/data"));
        assert!(config.fsync);
    }
}
