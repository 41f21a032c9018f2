//! Case conversion for serialized and display names.
//!
//! Every scheme is built on the same word tokenizer ([`words`]). The tokenizer
//! lowercases each word; the schemes then re-join the words with their own
//! separator and capitalization rule.
//!
//! | Scheme | `"theQuickBrownFox"` |
//! |--------|----------------------|
//! | [`Passthrough`](NamingScheme::Passthrough) | `theQuickBrownFox` |
//! | [`UpperCamelCase`](NamingScheme::UpperCamelCase) | `TheQuickBrownFox` |
//! | [`LowerCamelCase`](NamingScheme::LowerCamelCase) | `theQuickBrownFox` |
//! | [`KebabCase`](NamingScheme::KebabCase) | `the-quick-brown-fox` |
//! | [`SnakeCase`](NamingScheme::SnakeCase) | `the_quick_brown_fox` |
//! | [`SpaceSeparatedLowerCase`](NamingScheme::SpaceSeparatedLowerCase) | `the quick brown fox` |
//! | [`SpaceSeparatedLowerCaseInitialUpperCase`](NamingScheme::SpaceSeparatedLowerCaseInitialUpperCase) | `The quick brown fox` |
//! | [`TitleCase`](NamingScheme::TitleCase) | `The Quick Brown Fox` |

use std::fmt;
use std::sync::Arc;

/// A pure `String -> String` case conversion.
#[derive(Clone)]
pub enum NamingScheme {
    Passthrough,
    UpperCamelCase,
    LowerCamelCase,
    KebabCase,
    SnakeCase,
    SpaceSeparatedLowerCase,
    SpaceSeparatedLowerCaseInitialUpperCase,
    TitleCase,
    /// A user-supplied conversion, identified by name for debugging and equality.
    Custom {
        name: &'static str,
        convert: Arc<dyn Fn(&str) -> String + Send + Sync>,
    },
}

impl NamingScheme {
    pub fn custom<F>(name: &'static str, convert: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        NamingScheme::Custom {
            name,
            convert: Arc::new(convert),
        }
    }

    /// Apply the scheme to `input`.
    pub fn coerce(&self, input: &str) -> String {
        match self {
            NamingScheme::Passthrough => input.to_string(),
            NamingScheme::UpperCamelCase => words(input).iter().map(|w| capitalize(w)).collect(),
            NamingScheme::LowerCamelCase => words(input)
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
                .collect(),
            NamingScheme::KebabCase => words(input).join("-"),
            NamingScheme::SnakeCase => words(input).join("_"),
            NamingScheme::SpaceSeparatedLowerCase => words(input).join(" "),
            NamingScheme::SpaceSeparatedLowerCaseInitialUpperCase => words(input)
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { capitalize(w) } else { w.clone() })
                .collect::<Vec<_>>()
                .join(" "),
            NamingScheme::TitleCase => words(input)
                .iter()
                .map(|w| capitalize(w))
                .collect::<Vec<_>>()
                .join(" "),
            NamingScheme::Custom { convert, .. } => convert(input),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            NamingScheme::Passthrough => "Passthrough",
            NamingScheme::UpperCamelCase => "UpperCamelCase",
            NamingScheme::LowerCamelCase => "LowerCamelCase",
            NamingScheme::KebabCase => "KebabCase",
            NamingScheme::SnakeCase => "SnakeCase",
            NamingScheme::SpaceSeparatedLowerCase => "SpaceSeparatedLowerCase",
            NamingScheme::SpaceSeparatedLowerCaseInitialUpperCase => {
                "SpaceSeparatedLowerCaseInitialUpperCase"
            }
            NamingScheme::TitleCase => "TitleCase",
            NamingScheme::Custom { name, .. } => *name,
        }
    }
}

impl fmt::Debug for NamingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingScheme::Custom { name, .. } => write!(f, "Custom({name})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Built-in schemes compare by variant, custom ones by name.
impl PartialEq for NamingScheme {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NamingScheme::Custom { name: a, .. }, NamingScheme::Custom { name: b, .. }) => a == b,
            (NamingScheme::Custom { .. }, _) | (_, NamingScheme::Custom { .. }) => false,
            (a, b) => a.name() == b.name(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    AtBoundary,
    InUpperRun,
    InLowerOrDigit,
}

/// Split `input` into lowercase words.
///
/// `-`, `_` and space always end a word. An uppercase code point following a
/// lowercase letter or digit starts a new word. A lowercase letter following
/// an uppercase run of two or more starts a new word at the last uppercase
/// code point, so acronyms stay together: `HTTPServer` → `http`, `server`.
/// Digits never start a word of their own. Empty words are dropped.
pub fn words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut state = Scan::AtBoundary;
    let mut upper_run = 0usize;
    // byte offset in `current` where the last pushed code point starts
    let mut last_start = 0usize;

    for c in input.chars() {
        if matches!(c, '-' | '_' | ' ') {
            flush(&mut words, &mut current);
            state = Scan::AtBoundary;
            upper_run = 0;
            continue;
        }

        if c.is_uppercase() {
            if state == Scan::InLowerOrDigit {
                flush(&mut words, &mut current);
            }
            upper_run = if state == Scan::InUpperRun { upper_run + 1 } else { 1 };
            state = Scan::InUpperRun;
        } else {
            if state == Scan::InUpperRun && upper_run > 1 && c.is_lowercase() {
                let tail = current.split_off(last_start);
                flush(&mut words, &mut current);
                current = tail;
            }
            upper_run = 0;
            state = Scan::InLowerOrDigit;
        }

        last_start = current.len();
        current.extend(c.to_lowercase());
    }

    flush(&mut words, &mut current);
    words
}

fn flush(words: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
