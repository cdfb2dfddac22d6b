//! Reversible masking of `:name` style template variables.
//!
//! Machine translation happily rewrites `:count` into `: count` or translates
//! the word itself. Before a string is sent to the sheet every variable is
//! swapped for an opaque ordinal token `[[T_i]]`; after translation the tokens
//! are put back, tolerating the whitespace and casing changes translators
//! tend to introduce inside the brackets.

use regex::Regex;
use sheetloc_core::MaskResult;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":[A-Za-z_]\w*").expect("placeholder regex"))
}

/// Token written in place of the `index`-th placeholder.
pub fn token(index: usize) -> String {
    format!("[[T_{index}]]")
}

/// Replace every placeholder left to right with `[[T_0]]`, `[[T_1]]`, ...
pub fn mask(text: &str) -> MaskResult {
    let mut placeholders = Vec::new();
    let masked_text = placeholder_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let t = token(placeholders.len());
            placeholders.push(caps[0].to_string());
            t
        })
        .into_owned();
    MaskResult {
        masked_text,
        placeholders,
    }
}

/// Put the original placeholders back. Tokens without a recorded placeholder stay as they are.
pub fn unmask(masked_text: &str, placeholders: &[String]) -> String {
    let mut out = masked_text.to_string();
    for (index, original) in placeholders.iter().enumerate() {
        let re = match Regex::new(&format!(r"(?i)\[\[\s*T_{index}\s*\]\]")) {
            Ok(re) => re,
            Err(_) => continue,
        };
        // NoExpand: placeholders are literal text, `$` must not be read as a group reference.
        out = re
            .replace_all(&out, regex::NoExpand(original.as_str()))
            .into_owned();
    }
    out
}

/// Convenience pair used by callers that keep the codec behind a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderCodec;

impl PlaceholderCodec {
    pub fn mask(&self, text: &str) -> MaskResult {
        mask(text)
    }

    pub fn unmask(&self, masked_text: &str, placeholders: &[String]) -> String {
        unmask(masked_text, placeholders)
    }
}
