use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::{self, Config, ConfigCallback, Persistence};
use crate::constraint::Constraint;
use crate::error::TrackfigError;
use crate::file;
use crate::inherit;
use crate::key::Key;
use crate::marshal::{ConfigTypeWrapper, ConfigValue, TypeWrappers};
use crate::metadata::{
    ALIASES, Aliases, CHANGE_WARNING, COMMENTS, ChangeWarning, Comments, DISPLAY_NAME,
    DISPLAY_NAME_CONVENTION, MetadataMap, MetadataType, MetadataValue, NAME_CONVENTION,
    SERIAL_NAME,
};
use crate::naming::NamingScheme;
use crate::tracked::{ErasedValue, TrackedValue, ValueCallback, ValueHandle};
use crate::tree::Trie;
use crate::types::ConfigEnvironment;

/// Builder for declaring a config's schema.
///
/// Settings are declared with [`value()`](Self::value) and grouped with
/// [`section()`](Self::section); each declaration returns a typed handle used
/// to read and write the value later. Config-wide options are consuming
/// setters:
///
/// - **Metadata**: [`comment()`](Self::comment),
///   [`name_convention()`](Self::name_convention), [`metadata()`](Self::metadata)
///   attach to the root and, when inherited, reach every node.
/// - **Persistence**: [`format()`](Self::format) picks the codec and
///   [`save_path()`](Self::save_path) a subdirectory under the family
///   directory. Both only matter for [`build_in()`](Self::build_in).
///
/// ```ignore
/// let mut builder = Config::builder("myapp", "client")
///     .name_convention(NamingScheme::SnakeCase);
/// let port = builder.value("port", TrackedValue::builder(8080u16))?;
/// let config = builder.build_in(&ConfigEnvironment::new(SaveLocation::Platform))?;
/// ```
pub struct ConfigBuilder {
    family: String,
    id: String,
    config_id: u64,
    format: Option<String>,
    save_path: Option<PathBuf>,
    trie: Trie,
    values: Vec<Box<dyn ErasedValue>>,
    callbacks: Vec<ConfigCallback>,
    wrappers: TypeWrappers,
}

impl ConfigBuilder {
    pub fn new(family: &str, id: &str) -> Self {
        Self {
            family: family.to_string(),
            id: id.to_string(),
            config_id: config::next_config_id(),
            format: None,
            save_path: None,
            trie: Trie::new(MetadataMap::new()),
            values: Vec::new(),
            callbacks: Vec::new(),
            wrappers: TypeWrappers::new(),
        }
    }

    /// Codec name used by [`build_in()`](Self::build_in) (default: the
    /// environment's default format).
    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Subdirectory between the family directory and the file.
    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    pub fn metadata<T: MetadataValue>(mut self, ty: &MetadataType<T>, value: T) -> Self {
        self.trie.root.metadata.insert(ty, value);
        self
    }

    /// Add a comment line written at the top of the file.
    pub fn comment(mut self, line: &str) -> Self {
        self.trie
            .root
            .metadata
            .get_or_insert_with(&COMMENTS, Comments::default)
            .push(line);
        self
    }

    pub fn name_convention(self, scheme: NamingScheme) -> Self {
        self.metadata(&NAME_CONVENTION, scheme)
    }

    pub fn display_name_convention(self, scheme: NamingScheme) -> Self {
        self.metadata(&DISPLAY_NAME_CONVENTION, scheme)
    }

    /// Run `callback` after any value changes.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Config) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Register how `V` is marshalled for [`Wrapped<V>`](crate::Wrapped) values.
    pub fn type_wrapper<V, W>(mut self, wrapper: W) -> Self
    where
        V: 'static,
        W: ConfigTypeWrapper<V>,
    {
        self.wrappers.register::<V, W>(wrapper);
        self
    }

    /// Declare a value at `key`, relative to the root.
    pub fn value<T: ConfigValue>(
        &mut self,
        key: impl Into<Key>,
        value: TrackedValueBuilder<T>,
    ) -> Result<ValueHandle<T>, TrackfigError> {
        insert_value(
            &mut self.trie,
            &mut self.values,
            self.config_id,
            key.into(),
            value,
        )
    }

    /// Declare values inside the section `name`.
    ///
    /// Declaring a section again reopens it; metadata set the second time
    /// replaces earlier entries of the same type.
    pub fn section<R>(
        &mut self,
        name: impl Into<Key>,
        declare: impl FnOnce(&mut SectionBuilder<'_>) -> Result<R, TrackfigError>,
    ) -> Result<R, TrackfigError> {
        open_section(
            &mut self.trie,
            &mut self.values,
            self.config_id,
            name.into(),
            declare,
        )
    }

    /// Finish an in-memory config. Nothing is read or written.
    pub fn build(self) -> Result<Config, TrackfigError> {
        let ConfigBuilder {
            family,
            id,
            config_id,
            mut trie,
            mut values,
            callbacks,
            wrappers,
            ..
        } = self;

        for value in &values {
            value.check_supported(&wrappers)?;
        }
        inherit::propagate(&mut trie.root, &mut values);

        debug!(family = %family, id = %id, values = values.len(), "built config");
        Ok(Config::from_parts(
            family, id, config_id, trie, values, callbacks, wrappers,
        ))
    }

    /// Build, then load from and persist to the config's file in `env`.
    ///
    /// The file lives at `{dir}/{family}/{save_path}/{id}.{ext}`. A missing
    /// file leaves the defaults in place. The file is written back right away,
    /// so it always reflects the current schema.
    pub fn build_in(self, env: &ConfigEnvironment) -> Result<Config, TrackfigError> {
        let codec = env.codec(self.format.as_deref())?;
        let dir = file::resolve_location(env.location())?;
        let path = file::config_path(
            &dir,
            &self.family,
            self.save_path.as_deref(),
            &self.id,
            codec.file_extension(),
        );

        let mut config = self.build()?;
        match file::read_document(&path)? {
            Some(text) => {
                let doc = codec.parse(&text)?;
                let loaded = config.load_document(&doc);
                debug!(path = %path.display(), loaded, "read config file");
            }
            None => debug!(path = %path.display(), "no config file yet, using defaults"),
        }

        config.attach(Persistence { path, codec });
        config.save()?;
        Ok(config)
    }
}

fn insert_value<T: ConfigValue>(
    trie: &mut Trie,
    values: &mut Vec<Box<dyn ErasedValue>>,
    config_id: u64,
    key: Key,
    value: TrackedValueBuilder<T>,
) -> Result<ValueHandle<T>, TrackfigError> {
    let index = values.len();
    let tracked = value.build(key.clone())?;
    trie.put_value(&key, index)?;
    values.push(Box::new(tracked));
    Ok(ValueHandle::new(config_id, index))
}

fn open_section<R>(
    trie: &mut Trie,
    values: &mut Vec<Box<dyn ErasedValue>>,
    config_id: u64,
    key: Key,
    declare: impl FnOnce(&mut SectionBuilder<'_>) -> Result<R, TrackfigError>,
) -> Result<R, TrackfigError> {
    trie.ensure_section(&key)?;
    let mut section = SectionBuilder {
        key: key.clone(),
        metadata: MetadataMap::new(),
        trie: &mut *trie,
        values,
        config_id,
    };
    let result = declare(&mut section)?;
    let metadata = section.metadata;
    trie.ensure_section(&key)?.metadata.merge_from(metadata);
    Ok(result)
}

/// Declares the contents of one section. Keys are relative to the section.
pub struct SectionBuilder<'b> {
    key: Key,
    metadata: MetadataMap,
    trie: &'b mut Trie,
    values: &'b mut Vec<Box<dyn ErasedValue>>,
    config_id: u64,
}

impl SectionBuilder<'_> {
    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn value<T: ConfigValue>(
        &mut self,
        key: impl Into<Key>,
        value: TrackedValueBuilder<T>,
    ) -> Result<ValueHandle<T>, TrackfigError> {
        let key = self.key.join(&key.into());
        insert_value(self.trie, self.values, self.config_id, key, value)
    }

    pub fn section<R>(
        &mut self,
        name: impl Into<Key>,
        declare: impl FnOnce(&mut SectionBuilder<'_>) -> Result<R, TrackfigError>,
    ) -> Result<R, TrackfigError> {
        let key = self.key.join(&name.into());
        open_section(self.trie, self.values, self.config_id, key, declare)
    }

    pub fn metadata<T: MetadataValue>(&mut self, ty: &MetadataType<T>, value: T) -> &mut Self {
        self.metadata.insert(ty, value);
        self
    }

    pub fn comment(&mut self, line: &str) -> &mut Self {
        self.metadata
            .get_or_insert_with(&COMMENTS, Comments::default)
            .push(line);
        self
    }

    pub fn alias(&mut self, alias: &str) -> &mut Self {
        self.metadata
            .get_or_insert_with(&ALIASES, Aliases::default)
            .push(alias);
        self
    }

    pub fn serial_name(&mut self, name: &str) -> &mut Self {
        self.metadata(&SERIAL_NAME, name.to_string())
    }

    pub fn display_name(&mut self, name: &str) -> &mut Self {
        self.metadata(&DISPLAY_NAME, name.to_string())
    }

    pub fn name_convention(&mut self, scheme: NamingScheme) -> &mut Self {
        self.metadata(&NAME_CONVENTION, scheme)
    }

    pub fn display_name_convention(&mut self, scheme: NamingScheme) -> &mut Self {
        self.metadata(&DISPLAY_NAME_CONVENTION, scheme)
    }

    pub fn change_warning(&mut self, warning: ChangeWarning) -> &mut Self {
        self.metadata(&CHANGE_WARNING, warning)
    }
}

/// Declaration of a single tracked value, passed to
/// [`ConfigBuilder::value`] or [`SectionBuilder::value`].
pub struct TrackedValueBuilder<T: ConfigValue> {
    default: T,
    constraints: Vec<Constraint<T>>,
    callbacks: Vec<ValueCallback<T>>,
    metadata: MetadataMap,
}

impl<T: ConfigValue> TrackedValue<T> {
    pub fn builder(default: T) -> TrackedValueBuilder<T> {
        TrackedValueBuilder {
            default,
            constraints: Vec::new(),
            callbacks: Vec::new(),
            metadata: MetadataMap::new(),
        }
    }
}

impl<T: ConfigValue> TrackedValueBuilder<T> {
    pub fn metadata<M: MetadataValue>(mut self, ty: &MetadataType<M>, value: M) -> Self {
        self.metadata.insert(ty, value);
        self
    }

    pub fn comment(mut self, line: &str) -> Self {
        self.metadata
            .get_or_insert_with(&COMMENTS, Comments::default)
            .push(line);
        self
    }

    /// A name this value may also be read from.
    pub fn alias(mut self, alias: &str) -> Self {
        self.metadata
            .get_or_insert_with(&ALIASES, Aliases::default)
            .push(alias);
        self
    }

    pub fn serial_name(self, name: &str) -> Self {
        self.metadata(&SERIAL_NAME, name.to_string())
    }

    pub fn display_name(self, name: &str) -> Self {
        self.metadata(&DISPLAY_NAME, name.to_string())
    }

    pub fn name_convention(self, scheme: NamingScheme) -> Self {
        self.metadata(&NAME_CONVENTION, scheme)
    }

    pub fn display_name_convention(self, scheme: NamingScheme) -> Self {
        self.metadata(&DISPLAY_NAME_CONVENTION, scheme)
    }

    pub fn change_warning(self, warning: ChangeWarning) -> Self {
        self.metadata(&CHANGE_WARNING, warning)
    }

    pub fn constraint(mut self, constraint: Constraint<T>) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Run `callback` after this value changes.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TrackedValue<T>) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    fn build(self, key: Key) -> Result<TrackedValue<T>, TrackfigError> {
        TrackedValue::new(
            key,
            self.default,
            self.constraints,
            self.callbacks,
            self.metadata,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Mode, Rgb, RgbWrapper, sample_builder};
    use crate::marshal::Wrapped;
    use crate::metadata::ChangeWarningKind;
    use crate::types::SaveLocation;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn env_in(dir: &TempDir) -> ConfigEnvironment {
        ConfigEnvironment::new(SaveLocation::Path(dir.path().to_path_buf()))
    }

    #[test]
    fn default_violating_constraint_fails_fast() {
        let mut builder = ConfigBuilder::new("app", "main");
        let err = builder
            .value(
                "port",
                TrackedValue::builder(0u16).constraint(Constraint::range(1, 65535)),
            )
            .unwrap_err();
        assert!(matches!(err, TrackfigError::InvalidValue { .. }));
    }

    #[test]
    fn duplicate_value_is_rejected() {
        let mut builder = ConfigBuilder::new("app", "main");
        builder.value("port", TrackedValue::builder(1u16)).unwrap();
        let err = builder
            .value("port", TrackedValue::builder(2u16))
            .unwrap_err();
        assert!(matches!(err, TrackfigError::DuplicateKey { .. }));
    }

    #[test]
    fn wrapped_value_needs_a_wrapper() {
        let mut builder = ConfigBuilder::new("app", "main");
        builder
            .value("accent", TrackedValue::builder(Wrapped(Rgb(0, 0, 0))))
            .unwrap();
        match builder.build().unwrap_err() {
            TrackfigError::UnsupportedType { key, type_name } => {
                assert_eq!(key, Key::from("accent"));
                assert!(type_name.contains("Wrapped"));
            }
            other => panic!("Expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn wrapper_may_be_registered_after_the_value() {
        let mut builder = ConfigBuilder::new("app", "main");
        builder
            .value("accent", TrackedValue::builder(Wrapped(Rgb(0, 0, 0))))
            .unwrap();
        let builder = builder.type_wrapper::<Rgb, _>(RgbWrapper);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn sections_nest_keys() {
        let mut builder = ConfigBuilder::new("app", "main");
        let h = builder
            .section("gui", |gui| {
                gui.section("colors", |colors| {
                    colors.value("background", TrackedValue::builder("#000".to_string()))
                })
            })
            .unwrap();
        let config = builder.build().unwrap();
        assert_eq!(
            config.tracked(&h).unwrap().key(),
            &Key::from(["gui", "colors", "background"])
        );
    }

    #[test]
    fn grandchild_inherits_closest_convention() {
        let mut builder =
            ConfigBuilder::new("app", "main").name_convention(NamingScheme::SnakeCase);
        builder
            .section("outer_section", |outer| {
                outer.name_convention(NamingScheme::LowerCamelCase);
                outer.section("inner_section", |inner| {
                    inner.value("leaf_value", TrackedValue::builder(1i32))
                })
            })
            .unwrap();
        builder.value("topLevel", TrackedValue::builder(2i32)).unwrap();
        let config = builder.build().unwrap();

        assert_eq!(
            config
                .serialized_path(&Key::from(["outer_section", "inner_section", "leaf_value"]))
                .unwrap(),
            vec!["outerSection", "innerSection", "leafValue"]
        );
        assert_eq!(
            config.serialized_path(&Key::from("topLevel")).unwrap(),
            vec!["top_level"]
        );
    }

    #[test]
    fn reopened_section_merges_metadata() {
        let mut builder = ConfigBuilder::new("app", "main");
        builder
            .section("gui", |gui| {
                gui.comment("first").serial_name("display");
                gui.value("scale", TrackedValue::builder(1.0f64))
            })
            .unwrap();
        builder
            .section("gui", |gui| {
                gui.serial_name("screen");
                gui.value("theme", TrackedValue::builder(Mode::Fast))
            })
            .unwrap();
        let config = builder.build().unwrap();

        let gui = config.node("gui").unwrap();
        assert_eq!(gui.serialized_name(), "screen");
        assert!(gui.metadata().contains(&COMMENTS));
        assert_eq!(gui.as_section().unwrap().len(), 2);
    }

    #[test]
    fn value_metadata_is_recorded() {
        let mut builder = ConfigBuilder::new("app", "main");
        let h = builder
            .value(
                "maxItems",
                TrackedValue::builder(5u32)
                    .comment("How many items to keep")
                    .display_name("Maximum items")
                    .alias("max")
                    .change_warning(ChangeWarning::new(ChangeWarningKind::RequiresRestart)),
            )
            .unwrap();
        let config = builder.build().unwrap();
        let tracked = config.tracked(&h).unwrap();
        let node = config.node("maxItems").unwrap();

        assert_eq!(node.display_name(), "Maximum items");
        assert_eq!(tracked.metadata().get(&ALIASES).unwrap().iter().collect::<Vec<_>>(), vec!["max"]);
        assert_eq!(
            tracked.metadata().get(&CHANGE_WARNING).map(|w| w.kind),
            Some(ChangeWarningKind::RequiresRestart)
        );
    }

    #[test]
    fn build_in_writes_defaults_when_no_file() {
        let dir = TempDir::new().unwrap();
        let (builder, _) = sample_builder();
        let config = builder.build_in(&env_in(&dir)).unwrap();

        let path = dir.path().join("sample").join("client.toml");
        assert_eq!(config.path(), Some(path.as_path()));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("port = 8080"));
    }

    #[test]
    fn build_in_respects_save_path_and_format() {
        let dir = TempDir::new().unwrap();
        let (builder, _) = sample_builder();
        let config = builder
            .format("json")
            .save_path("profiles/default")
            .build_in(&env_in(&dir))
            .unwrap();

        let path = dir
            .path()
            .join("sample")
            .join("profiles")
            .join("default")
            .join("client.json");
        assert_eq!(config.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn build_in_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let file_dir = dir.path().join("sample");
        fs::create_dir_all(&file_dir).unwrap();
        fs::write(file_dir.join("client.toml"), "port = 3000\n[gui]\nscale = 2.0\n").unwrap();

        let (builder, h) = sample_builder();
        let config = builder.build_in(&env_in(&dir)).unwrap();
        assert_eq!(*config.value(&h.port).unwrap(), 3000);
        assert_eq!(*config.value(&h.scale).unwrap(), 2.0);
    }

    #[test]
    fn build_in_surfaces_parse_errors() {
        let dir = TempDir::new().unwrap();
        let file_dir = dir.path().join("sample");
        fs::create_dir_all(&file_dir).unwrap();
        fs::write(file_dir.join("client.toml"), "port = = 3\n").unwrap();

        let (builder, _) = sample_builder();
        let err = builder.build_in(&env_in(&dir)).unwrap_err();
        assert!(matches!(err, TrackfigError::TomlParse(_)));
        assert_eq!(
            fs::read_to_string(file_dir.join("client.toml")).unwrap(),
            "port = = 3\n"
        );
    }

    #[test]
    fn unknown_format_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (builder, _) = sample_builder();
        let err = builder.format("yaml").build_in(&env_in(&dir)).unwrap_err();
        assert!(matches!(err, TrackfigError::UnknownFormat(f) if f == "yaml"));
    }

    #[test]
    fn set_value_with_persist_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let (builder, h) = sample_builder();
        let mut config = builder.build_in(&env_in(&dir)).unwrap();

        config.set_value(&h.port, 9999, true).unwrap();
        let content = fs::read_to_string(config.path().unwrap()).unwrap();
        assert!(content.contains("port = 9999"));

        config.set_value(&h.port, 1111, false).unwrap();
        let content = fs::read_to_string(config.path().unwrap()).unwrap();
        assert!(content.contains("port = 9999"));
    }

    #[test]
    fn overrides_are_never_saved() {
        let dir = TempDir::new().unwrap();
        let (builder, h) = sample_builder();
        let mut config = builder.build_in(&env_in(&dir)).unwrap();

        config.set_override(&h.port, 4444).unwrap();
        config.save().unwrap();
        let content = fs::read_to_string(config.path().unwrap()).unwrap();
        assert!(content.contains("port = 8080"));
        assert!(!content.contains("4444"));
    }

    #[test]
    fn values_iterate_with_type_names() {
        let (builder, _) = sample_builder();
        let config = builder.build().unwrap();
        let port = config.values().find(|v| v.key() == &Key::from("port")).unwrap();
        assert_eq!(port.type_name(), "u16");
    }
}
