use std::path::PathBuf;
use thiserror::Error;

use crate::key::Key;

#[derive(Debug, Error)]
pub enum TrackfigError {
    #[error("Duplicate key '{key}'")]
    DuplicateKey { key: Key },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: Key, reason: String },

    #[error("Unsupported value type {type_name} for '{key}'")]
    UnsupportedType { key: Key, type_name: &'static str },

    #[error("Invalid value for '{key}': {}", .reasons.join("; "))]
    InvalidValue { key: Key, reasons: Vec<String> },

    #[error("Cannot read '{key}': {source}")]
    Coercion { key: Key, source: CoercionError },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Value handle belongs to a different config")]
    ForeignHandle,

    #[error("Cannot resolve '{key}': {reason}")]
    KeyResolution { key: Key, reason: String },

    #[error("Unknown config format '{0}'")]
    UnknownFormat(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to access {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No platform config directory is available")]
    NoPlatformDir,
}

/// Why a fragment could not be converted into the shape a template demands.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} does not fit in {target}")]
    NumericOverflow { value: String, target: &'static str },

    #[error("'{value}' is not a constant of {enum_type}")]
    UnknownEnumConstant {
        value: String,
        enum_type: &'static str,
    },

    #[error("no type wrapper registered for {type_name}")]
    UnsupportedType { type_name: &'static str },

    #[error("at {position}: {source}")]
    Element {
        position: String,
        source: Box<CoercionError>,
    },
}

impl CoercionError {
    pub(crate) fn at(position: impl ToString, source: CoercionError) -> Self {
        CoercionError::Element {
            position: position.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_lists_every_reason() {
        let err = TrackfigError::InvalidValue {
            key: Key::from(["gui", "scale"]),
            reasons: vec!["too small".into(), "not even".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("gui.scale"));
        assert!(msg.contains("too small; not even"));
    }

    #[test]
    fn unknown_format_names_the_format() {
        let err = TrackfigError::UnknownFormat("yaml".into());
        assert_eq!(err.to_string(), "Unknown config format 'yaml'");
    }

    #[test]
    fn duplicate_key_shows_dotted_path() {
        let err = TrackfigError::DuplicateKey {
            key: Key::from(["gui", "accent"]),
        };
        assert_eq!(err.to_string(), "Duplicate key 'gui.accent'");
    }

    #[test]
    fn nested_element_error_shows_path() {
        let inner = CoercionError::TypeMismatch {
            expected: "integer",
            found: "string",
        };
        let err = CoercionError::at("[2]", CoercionError::at("ports", inner));
        assert_eq!(err.to_string(), "at [2]: at ports: expected integer, found string");
    }

    #[test]
    fn coercion_wraps_key() {
        let err = TrackfigError::Coercion {
            key: Key::from("mode"),
            source: CoercionError::UnknownEnumConstant {
                value: "turbo".into(),
                enum_type: "Mode",
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("mode"));
        assert!(msg.contains("turbo"));
    }
}
