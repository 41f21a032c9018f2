//! Typed, tracked configuration trees. Declare your settings once with a
//! builder, read and write them through typed handles, and let the crate keep
//! the file on disk in sync.
//!
//! ```ignore
//! let mut builder = Config::builder("myapp", "client")
//!     .name_convention(NamingScheme::SnakeCase);
//! let port = builder.value(
//!     "serverPort",
//!     TrackedValue::builder(8080u16).constraint(Constraint::range(1, 65535)),
//! )?;
//! let mut config = builder.build_in(&ConfigEnvironment::new(SaveLocation::Platform))?;
//!
//! config.set_value(&port, 9000, true)?;
//! ```
//!
//! That call reads `~/.config/myapp/client.toml` if it exists, writes it back
//! with every declared setting and its comments, and afterwards saves again
//! each time a value is set with `persist`.
//!
//! # The tree
//!
//! A [`Config`] is an ordered tree. Interior nodes are sections, declared with
//! [`ConfigBuilder::section()`]; leaves are [`TrackedValue`]s, declared with
//! [`ConfigBuilder::value()`]. Every node has a [`Key`] (its path of raw
//! component names) and a [`MetadataMap`].
//!
//! Each tracked value holds three states:
//!
//! - the **default**, fixed at declaration and checked against every
//!   constraint (a default that fails its own constraint is a build error);
//! - the **real** value, which is what gets saved;
//! - an optional **override**, which shadows the real value and is never
//!   saved.
//!
//! [`Config::value()`] returns the override when one is set, else the real
//! value.
//!
//! # Handles, not reflection
//!
//! The builder replaces field reflection: each declaration returns a
//! [`ValueHandle<T>`], a typed index into the config's value arena. Reads and
//! writes go through the handle, so the value's type is checked at compile
//! time. A handle from another config is rejected with
//! [`TrackfigError::ForeignHandle`].
//!
//! # Value types
//!
//! [`ConfigValue`] is implemented for integers, floats, `bool` and `String`.
//! Beyond those:
//!
//! - **Enums**: implement [`ConfigEnum`]. Constants are matched
//!   case-insensitively and written as their name.
//! - **Lists and maps**: [`ValueList<E>`] and [`ValueMap<E>`] carry a default
//!   element that every loaded element is coerced against.
//! - **Your own types**: implement [`ConfigSerializableObject`] and wrap the
//!   value in [`Object`].
//! - **Types you do not own**: register a [`ConfigTypeWrapper`] with
//!   [`ConfigBuilder::type_wrapper()`] and wrap the value in [`Wrapped`]. A
//!   `Wrapped` value without a registered wrapper fails the build with
//!   [`TrackfigError::UnsupportedType`].
//!
//! Integers narrow with a range check, so `300` never silently becomes a
//! `u8`. Floats truncate toward zero into integers under the same check, and
//! a NaN or infinite float is never an integer. Integers widen into floats.
//!
//! # Metadata
//!
//! Metadata is a typed map keyed by [`MetadataType`] constants. The crate
//! defines [`COMMENTS`], [`ALIASES`], [`SERIAL_NAME`], [`DISPLAY_NAME`],
//! [`NAME_CONVENTION`], [`DISPLAY_NAME_CONVENTION`] and [`CHANGE_WARNING`];
//! applications may define their own with [`MetadataType::new()`].
//!
//! Types created with [`MetadataType::inherited()`] flow down the tree when a
//! config is built. A node keeps its own entry; otherwise it adopts the
//! closest ancestor's. Setting a `snake_case` convention on the root and
//! `lowerCamelCase` on one section gives that section's whole subtree camel
//! case and everything else snake case.
//!
//! # Names on disk
//!
//! Each level of a key resolves on its own: an explicit serial name wins,
//! else the node's naming convention is applied to the raw component, else
//! the raw component is used unchanged. See [`NamingScheme`] for the
//! conventions.
//!
//! On read, every level may also use one of its aliases, so renamed settings
//! still load from old files. The canonical spelling is tried first. Writes
//! only ever use canonical names, so the next save migrates the file.
//!
//! # Loading
//!
//! A document is parsed as a whole, then every value looks itself up. One
//! malformed entry never blocks the rest: a value whose entry has the wrong
//! shape or breaks a constraint keeps its current value and the problem is
//! logged through `tracing`. A document that does not parse at all is an
//! error, and so is an I/O failure; the two are distinct variants.
//!
//! # Callbacks
//!
//! Config-wide callbacks run before the changed value's own callbacks, each
//! in registration order. Changes to the real value are not announced while
//! an override is in effect, since the effective value did not move.
//!
//! # Files and codecs
//!
//! A [`ConfigEnvironment`] names a [`SaveLocation`] and the codecs available.
//! A config's file lives at `{location}/{family}/{save_path}/{id}.{ext}`.
//!
//! - [`TomlCodec`] (default) writes comments, enum options, constraint
//!   descriptions and defaults as `#` lines above each setting.
//! - [`JsonCodec`] writes pretty-printed JSON.
//! - [`JsoncCodec`] writes JSON with the same metadata as `//` lines.
//!
//! Other formats plug in through the [`Codec`] trait and
//! [`ConfigEnvironment::with_codec()`]. [`ConfigEnvironment::global_format()`]
//! pins every config in an environment to one format.
//!
//! # Error handling
//!
//! All fallible operations return [`TrackfigError`]. Schema mistakes
//! (duplicate keys, unsupported types, invalid defaults) surface from the
//! builder before any file is touched. See the [`error`] module for the full
//! set.

pub mod error;
pub mod metadata;
pub mod naming;
pub mod types;

mod builder;
mod codec;
mod config;
mod constraint;
mod file;
mod fragment;
mod inherit;
mod key;
mod marshal;
mod resolve;
mod tracked;
mod tree;
mod values;

#[cfg(test)]
mod fixtures;

pub use builder::{ConfigBuilder, SectionBuilder, TrackedValueBuilder};
pub use codec::{Codec, JsonCodec, JsoncCodec, TomlCodec};
pub use config::{Config, ConfigCallback};
pub use constraint::Constraint;
pub use error::{CoercionError, TrackfigError};
pub use fragment::{Document, Fragment, PathLookup};
pub use key::Key;
pub use marshal::{
    ConfigEnum, ConfigSerializableObject, ConfigTypeWrapper, ConfigValue, Object, TypeWrappers,
    Wrapped,
};
pub use metadata::{
    ALIASES, Aliases, CHANGE_WARNING, COMMENTS, ChangeWarning, ChangeWarningKind, Comments,
    DISPLAY_NAME, DISPLAY_NAME_CONVENTION, MetadataMap, MetadataType, MetadataValue,
    NAME_CONVENTION, SERIAL_NAME,
};
pub use naming::NamingScheme;
pub use tracked::{TrackedValue, UntypedValue, ValueCallback, ValueHandle};
pub use tree::{NodeRef, SectionRef};
pub use types::{ConfigEnvironment, SaveLocation};
pub use values::{CompoundConfigValue, ValueList, ValueMap};
