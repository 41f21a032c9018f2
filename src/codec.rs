//! Codecs: turning documents into text and back.
//!
//! A [`Codec`] parses file contents into a [`Document`] and renders a whole
//! [`Config`] back to text. Two ship with the crate:
//!
//! - [`TomlCodec`] parses with `toml` and writes through `toml_edit`, so each
//!   node's comments, enum options, constraints and default land in the file
//!   as `#` lines above it.
//! - [`JsonCodec`] uses `serde_json` and writes pretty-printed output; JSON
//!   has no comments, so metadata is not written.
//! - [`JsoncCodec`] writes JSON with `//` comment lines carrying the same
//!   metadata the TOML codec writes. On read it accepts `//` and `/* */`
//!   comments and trailing commas.
//!
//! In every format a `null` map entry counts as absent. A `null` anywhere
//! else is a parse error.

use indexmap::{IndexMap, IndexSet};
use toml_edit::{DocumentMut, InlineTable, Item, Table, Value};

use crate::config::Config;
use crate::error::TrackfigError;
use crate::fragment::{self, Document, Fragment};
use crate::key::Key;
use crate::marshal::TypeWrappers;
use crate::metadata::{COMMENTS, MetadataMap};
use crate::tracked::UntypedValue;
use crate::tree::{NodeRef, SectionRef};

pub trait Codec: Send + Sync {
    /// Name the codec is registered under, e.g. `"toml"`.
    fn format(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<Document, TrackfigError>;

    fn write(&self, config: &Config) -> Result<String, TrackfigError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn format(&self) -> &'static str {
        "toml"
    }

    fn file_extension(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, text: &str) -> Result<Document, TrackfigError> {
        let raw: IndexMap<String, Option<Fragment>> = toml::from_str(text)?;
        Ok(fragment::strip_nulls(raw))
    }

    fn write(&self, config: &Config) -> Result<String, TrackfigError> {
        let mut doc = DocumentMut::new();
        write_section(config, config.root(), doc.as_table_mut())?;

        let body = doc.to_string();
        let header = comment_block(&comment_lines(config.metadata()));
        if header.is_empty() {
            return Ok(body.trim_start().to_string());
        }
        Ok(format!("{header}\n{}", body.trim_start()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> &'static str {
        "json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<Document, TrackfigError> {
        let raw: IndexMap<String, Option<Fragment>> = serde_json::from_str(text)?;
        Ok(fragment::strip_nulls(raw))
    }

    fn write(&self, config: &Config) -> Result<String, TrackfigError> {
        let doc = config.to_document()?;
        let mut text = serde_json::to_string_pretty(&doc)?;
        text.push('\n');
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsoncCodec;

impl Codec for JsoncCodec {
    fn format(&self) -> &'static str {
        "jsonc"
    }

    fn file_extension(&self) -> &'static str {
        "jsonc"
    }

    fn parse(&self, text: &str) -> Result<Document, TrackfigError> {
        let raw: IndexMap<String, Option<Fragment>> = serde_json::from_str(&strip_jsonc(text))?;
        Ok(fragment::strip_nulls(raw))
    }

    fn write(&self, config: &Config) -> Result<String, TrackfigError> {
        let mut out = slash_comment_block(&comment_lines(config.metadata()), "");
        write_jsonc_section(config, config.root(), 0, &mut out)?;
        out.push('\n');
        Ok(out)
    }
}

fn write_jsonc_section(
    config: &Config,
    section: SectionRef<'_>,
    depth: usize,
    out: &mut String,
) -> Result<(), TrackfigError> {
    let children: Vec<NodeRef<'_>> = section.children().collect();
    if children.is_empty() {
        out.push_str("{}");
        return Ok(());
    }

    let count = children.len();
    let pad = "  ".repeat(depth + 1);
    let mut written = IndexSet::new();
    out.push_str("{\n");
    for (i, child) in children.into_iter().enumerate() {
        let name = child.serialized_name();
        if !written.insert(name.clone()) {
            return Err(TrackfigError::KeyResolution {
                key: child.key().clone(),
                reason: format!("'{name}' is already written by another node"),
            });
        }

        let lines = match child {
            NodeRef::Section(sub) => comment_lines(sub.metadata()),
            NodeRef::Value(value) => value_comment_lines(value, config.wrappers()),
        };
        out.push_str(&slash_comment_block(&lines, &pad));
        out.push_str(&pad);
        out.push_str(&serde_json::to_string(&name)?);
        out.push_str(": ");

        match child {
            NodeRef::Section(sub) => write_jsonc_section(config, sub, depth + 1, out)?,
            NodeRef::Value(value) => {
                let fragment = value
                    .real_fragment(config.wrappers())
                    .map_err(|source| coercion(value.key(), source))?;
                // Escaped JSON never holds a raw newline, so re-indenting is safe.
                let text = serde_json::to_string_pretty(&fragment)?;
                out.push_str(&text.replace('\n', &format!("\n{pad}")));
            }
        }
        if i + 1 < count {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&"  ".repeat(depth));
    out.push('}');
    Ok(())
}

fn slash_comment_block(lines: &[String], pad: &str) -> String {
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                format!("{pad}//\n")
            } else {
                format!("{pad}// {line}\n")
            }
        })
        .collect()
}

/// Reduce JSON with comments to plain JSON: drop `//` and `/* */` comments
/// outside strings and any comma right before a closing bracket.
fn strip_jsonc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&n| n != '\n').is_some() {}
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            '}' | ']' => {
                let kept = out.trim_end().len();
                if out[..kept].ends_with(',') {
                    out.remove(kept - 1);
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn write_section(
    config: &Config,
    section: SectionRef<'_>,
    table: &mut Table,
) -> Result<(), TrackfigError> {
    for child in section.children() {
        let name = child.serialized_name();
        if table.contains_key(&name) {
            return Err(TrackfigError::KeyResolution {
                key: child.key().clone(),
                reason: format!("'{name}' is already written by another node"),
            });
        }

        match child {
            NodeRef::Section(sub) => {
                let mut sub_table = Table::new();
                write_section(config, sub, &mut sub_table)?;
                let lines = comment_lines(sub.metadata());
                if lines.is_empty() {
                    sub_table.set_implicit(true);
                } else {
                    sub_table
                        .decor_mut()
                        .set_prefix(format!("\n{}", comment_block(&lines)));
                }
                table.insert(&name, Item::Table(sub_table));
            }
            NodeRef::Value(value) => write_value(value, config.wrappers(), &name, table)?,
        }
    }
    Ok(())
}

fn write_value(
    value: &dyn UntypedValue,
    wrappers: &TypeWrappers,
    name: &str,
    table: &mut Table,
) -> Result<(), TrackfigError> {
    let written = value
        .real_fragment(wrappers)
        .map_err(|source| coercion(value.key(), source))?;
    let comments = comment_block(&value_comment_lines(value, wrappers));

    match written {
        Fragment::Map(map) => {
            let mut sub_table = map_table(&map);
            if !comments.is_empty() {
                sub_table.decor_mut().set_prefix(format!("\n{comments}"));
            }
            table.insert(name, Item::Table(sub_table));
        }
        other => {
            table.insert(name, Item::Value(toml_value(&other)));
            if !comments.is_empty()
                && let Some(mut key) = table.key_mut(name)
            {
                key.leaf_decor_mut().set_prefix(format!("\n{comments}"));
            }
        }
    }
    Ok(())
}

fn coercion(key: &Key, source: crate::error::CoercionError) -> TrackfigError {
    TrackfigError::Coercion {
        key: key.clone(),
        source,
    }
}

fn map_table(map: &Document) -> Table {
    let mut table = Table::new();
    for (key, value) in map {
        let item = match value {
            Fragment::Map(inner) => Item::Table(map_table(inner)),
            other => Item::Value(toml_value(other)),
        };
        table.insert(key, item);
    }
    table
}

fn toml_value(fragment: &Fragment) -> Value {
    match fragment {
        Fragment::Int(i) => Value::from(*i),
        Fragment::Float(x) => Value::from(*x),
        Fragment::Bool(b) => Value::from(*b),
        Fragment::String(s) => Value::from(s.as_str()),
        Fragment::List(items) => Value::Array(items.iter().map(toml_value).collect()),
        Fragment::Map(map) => {
            let mut inline = InlineTable::new();
            for (key, value) in map {
                inline.insert(key.as_str(), toml_value(value));
            }
            Value::InlineTable(inline)
        }
    }
}

fn comment_lines(metadata: &MetadataMap) -> Vec<String> {
    metadata
        .get(&COMMENTS)
        .map(|comments| {
            comments
                .iter()
                .flat_map(str::lines)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn value_comment_lines(value: &dyn UntypedValue, wrappers: &TypeWrappers) -> Vec<String> {
    let mut lines = comment_lines(value.metadata());
    if let Some(options) = value.enum_options() {
        lines.push(format!("options: {}", options.join(", ")));
    }
    lines.extend(value.constraint_descriptions());
    if !value.is_compound()
        && let Ok(default) = value.default_fragment(wrappers)
    {
        lines.push(format!("default: {default}"));
    }
    lines
}

fn comment_block(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                "#\n".to_string()
            } else {
                format!("# {line}\n")
            }
        })
        .collect()
}
