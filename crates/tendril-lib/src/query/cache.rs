//! Process-wide bounded cache of compiled pattern ASTs.
//!
//! Belongs to the façade, not the core: compiling is pure, so sharing the
//! AST across `Pattern::cached` calls is only an optimization. Eviction
//! is insertion-order (oldest entry first).

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::CompileError;
use crate::engine::FuelLimits;
use crate::parser::ast::PatNode;

use super::Pattern;

const CAPACITY: usize = 64;

static CACHE: Lazy<Mutex<IndexMap<String, Arc<PatNode>>>> =
    Lazy::new(|| Mutex::new(IndexMap::new()));

pub(crate) fn get_or_compile(source: &str) -> Result<Pattern, CompileError> {
    if let Ok(cache) = CACHE.lock()
        && let Some(ast) = cache.get(source)
    {
        return Ok(Pattern {
            source: source.to_owned(),
            ast: ast.clone(),
            limits: FuelLimits::default(),
        });
    }

    let pattern = Pattern::compile(source)?;

    if let Ok(mut cache) = CACHE.lock()
        && !cache.contains_key(source)
    {
        if cache.len() >= CAPACITY {
            cache.shift_remove_index(0);
        }
        cache.insert(source.to_owned(), pattern.ast.clone());
    }

    Ok(pattern)
}

/// Entries currently cached; test support.
#[cfg(test)]
pub(crate) fn len() -> usize {
    CACHE.lock().map(|c| c.len()).unwrap_or(0)
}

#[cfg(test)]
pub(crate) fn clear() {
    if let Ok(mut cache) = CACHE.lock() {
        cache.clear();
    }
}

#[cfg(test)]
pub(crate) fn capacity() -> usize {
    CAPACITY
}
