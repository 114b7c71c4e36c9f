use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::normalize_string::NormalizeString;

pub mod float_ext;
pub mod log_setup;
pub mod normalize_string;

pub const EPSILON: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum FileExtensionError {
    #[error("Failed to get file extension")]
    MissingFileExtension,
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(String),
}

pub type FileFormatResult<T> = Result<T, FileExtensionError>;

#[derive(Debug, thiserror::Error)]
pub enum SerdeFormatError {
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

pub type SerdeFormatResult<T> = Result<T, SerdeFormatError>;

pub fn get_file_extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|os_str| os_str.to_str())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerdeFormat {
    Yaml,
    Json,
}

impl SerdeFormat {
    pub fn from_file_name(file_name: &str) -> FileFormatResult<Self> {
        let extension = get_file_extension(file_name)
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or(FileExtensionError::MissingFileExtension)?;

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(FileExtensionError::UnsupportedFileExtension(
                file_name.to_string(),
            )),
        }
    }
}

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}

pub fn serialize<T: Serialize>(value: &T, format: SerdeFormat) -> String {
    match format {
        SerdeFormat::Yaml => serde_yml::to_string(value).unwrap(),
        SerdeFormat::Json => serde_json::to_string_pretty(value).unwrap(),
    }
    .normalize()
}

pub fn deserialize<T: DeserializeOwned + 'static>(
    serialized: &str,
    format: SerdeFormat,
) -> SerdeFormatResult<T> {
    match format {
        SerdeFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        SerdeFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_file_name() -> anyhow::Result<()> {
        assert_eq!(SerdeFormat::from_file_name("map.yml")?, SerdeFormat::Yaml);
        assert_eq!(SerdeFormat::from_file_name("map.yaml")?, SerdeFormat::Yaml);
        assert_eq!(SerdeFormat::from_file_name("map.json")?, SerdeFormat::Json);
        assert!(SerdeFormat::from_file_name("map.toml").is_err());
        assert!(SerdeFormat::from_file_name("map").is_err());

        Ok(())
    }

    #[test]
    fn serialize_round_trip() -> anyhow::Result<()> {
        let value = vec![1.5f64, -2.0, 0.0];

        for format in [SerdeFormat::Yaml, SerdeFormat::Json] {
            let text = serialize(&value, format);
            let back: Vec<f64> = deserialize(&text, format)?;
            assert_eq!(back, value);
        }

        Ok(())
    }
}
