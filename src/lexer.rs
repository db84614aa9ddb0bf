//! A module implementing line classification (tokenization) for Am scripts.
//!
//! Every script line is looked at exactly once and sorted into one of the
//! [`Line`] kinds: a `print:` line, an import directive, a native statement
//! (already split into tokens) or a line that belongs to another language runtime.

use regex::Regex;
use std::sync::OnceLock;

/// Language tag of lines executed by the interpreter itself.
pub const NATIVE_TAG: &str = "Am";

/// Literal prefix of the line-level print form.
pub const PRINT_PREFIX: &str = "print:";

/// Byte offset where the message of a `print:` line starts (prefix plus one separator).
const PRINT_MESSAGE_START: usize = PRINT_PREFIX.len() + 1;

/// Result of classifying a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Empty or all-whitespace line. Nothing to do.
    Blank,
    /// A line starting with `print:`. Holds the extracted message, possibly empty.
    Print(String),
    /// An import directive in the form `tag.import module;`.
    Import {
        /// Package manager tag, e.g. `py` or `npm`.
        tag: String,
        /// Name of the module to install.
        module: String,
    },
    /// A native statement. The language prefix, if any, is already stripped
    /// from the first token.
    Native(Vec<String>),
    /// A line tagged with a foreign language. `line` is the original, unmodified text.
    External {
        /// Language tag found before the first `:`.
        tag: String,
        /// The whole source line.
        line: String,
    },
}

fn import_regex() -> &'static Regex {
    static IMPORT: OnceLock<Regex> = OnceLock::new();
    IMPORT.get_or_init(|| {
        Regex::new(r"^(\w+)\.import (\w+);$").unwrap_or_else(|e| panic!("invalid import pattern: {e}"))
    })
}

/// Extract the message of a `print:` line.
///
/// The message starts one character after the prefix and stops one character
/// before the end of the line, which swallows a trailing terminator such as `;`.
/// Lines too short for that span, or spans that would cut a UTF-8 character,
/// yield an empty message.
fn print_message(line: &str) -> String {
    if line.len() <= PRINT_MESSAGE_START {
        return String::new();
    }
    line.get(PRINT_MESSAGE_START..line.len() - 1)
        .unwrap_or_default()
        .to_string()
}

/// Split a line on whitespace.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Split the language tag off the first token.
///
/// Returns the tag (defaulting to [`NATIVE_TAG`]) and the tokens with the
/// first one replaced by whatever followed the first `:`.
pub fn split_language_tag(mut tokens: Vec<String>) -> (String, Vec<String>) {
    let split = tokens
        .first()
        .and_then(|first| first.split_once(':'))
        .map(|(tag, rest)| (tag.to_string(), rest.to_string()));
    match split {
        Some((tag, rest)) => {
            tokens[0] = rest;
            (tag, tokens)
        }
        None => (NATIVE_TAG.to_string(), tokens),
    }
}

/// The main entry point of the classifier.
///
/// # Arguments
/// * `line` - One line of the script, without its line terminator.
///
/// # Returns
/// The [`Line`] kind together with the data the next stage needs.
pub fn classify(line: &str) -> Line {
    if line.starts_with(PRINT_PREFIX) {
        return Line::Print(print_message(line));
    }

    if let Some(caps) = import_regex().captures(line) {
        return Line::Import {
            tag: caps[1].to_string(),
            module: caps[2].to_string(),
        };
    }

    let tokens = split_into_tokens(line);
    if tokens.is_empty() {
        return Line::Blank;
    }

    let (tag, tokens) = split_language_tag(tokens);
    if tag == NATIVE_TAG {
        Line::Native(tokens)
    } else {
        Line::External {
            tag,
            line: line.to_string(),
        }
    }
}
