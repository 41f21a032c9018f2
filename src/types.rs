use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::codec::{Codec, JsonCodec, JsoncCodec, TomlCodec};
use crate::error::TrackfigError;

/// Base directory config families are stored under. Each family gets its
/// own subdirectory below it.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveLocation {
    /// The user's config directory as `directories` reports it.
    Platform,
    /// A directory joined onto the user's home, such as `Home(".games")`.
    Home(&'static str),
    /// Whatever directory the process was started in.
    Cwd,
    /// This directory, used as given.
    Path(PathBuf),
}

/// Where configs live and which codecs can read and write them.
///
/// `toml` and `json` are registered out of the box, with `toml` as the
/// default format. Further codecs are added with [`with_codec`](Self::with_codec).
///
/// A global format set with [`global_format`](Self::global_format) wins over
/// whatever format a config asks for.
#[derive(Clone)]
pub struct ConfigEnvironment {
    location: SaveLocation,
    default_format: String,
    global_format: Option<String>,
    codecs: IndexMap<String, Arc<dyn Codec>>,
}

impl ConfigEnvironment {
    pub fn new(location: SaveLocation) -> Self {
        Self {
            location,
            default_format: TomlCodec.format().to_string(),
            global_format: None,
            codecs: IndexMap::new(),
        }
        .with_codec(TomlCodec)
        .with_codec(JsonCodec)
        .with_codec(JsoncCodec)
    }

    /// Register `codec` under its format name, replacing any codec of the same name.
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.insert(codec.format().to_string(), Arc::new(codec));
        self
    }

    pub fn default_format(mut self, format: &str) -> Self {
        self.default_format = format.to_string();
        self
    }

    /// Force every config built in this environment onto `format`.
    pub fn global_format(mut self, format: &str) -> Self {
        self.global_format = Some(format.to_string());
        self
    }

    pub fn location(&self) -> &SaveLocation {
        &self.location
    }

    /// The codec for `format`, or for the default format when `None`. The
    /// global format, when set, replaces both.
    pub fn codec(&self, format: Option<&str>) -> Result<Arc<dyn Codec>, TrackfigError> {
        let format = self
            .global_format
            .as_deref()
            .or(format)
            .unwrap_or(&self.default_format);
        self.codecs
            .get(format)
            .cloned()
            .ok_or_else(|| TrackfigError::UnknownFormat(format.to_string()))
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }
}

impl fmt::Debug for ConfigEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEnvironment")
            .field("location", &self.location)
            .field("default_format", &self.default_format)
            .field("global_format", &self.global_format)
            .field("formats", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}
