//! Process-wide cache of compiled regexes.
//!
//! Pattern regexes are compiled once per distinct (source, flags) pair and
//! shared across all compiled patterns and searches.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Flags accepted on regex literals. `g` and `y` are rejected upstream.
pub(crate) const SUPPORTED_FLAGS: &str = "imsxU";

/// Compile `source` under `flags`, consulting the cache first.
pub(crate) fn compile(source: &str, flags: &str) -> Result<Regex, regex::Error> {
    let key = format!("{flags}\u{0}{source}");

    if let Ok(cache) = REGEX_CACHE.lock()
        && let Some(regex) = cache.get(&key)
    {
        return Ok(regex.clone());
    }

    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'U' => builder.swap_greed(true),
            // Unknown flags are rejected by the parser.
            _ => &mut builder,
        };
    }
    let regex = builder.build()?;

    if let Ok(mut cache) = REGEX_CACHE.lock() {
        cache.entry(key).or_insert_with(|| regex.clone());
    }
    Ok(regex)
}
