//! Breadcrumb navigation from an object term's value.
//!
//! `dot` descends by key pattern, `bracket` indexes a sequence, and
//! `skip` (`**`) is a pre-order descent through mappings and sequences,
//! yielding every mapping entry whose key matches at any depth. Each
//! successful navigation path is its own branch.

use tendril_core::{Path, Value};

use crate::parser::ast::{Crumb, PatNode};

use super::Machine;
use super::matcher::{MResult, miss};
use super::solution::Sol;

impl Machine {
    /// Follows `crumbs[idx..]` from `value`, invoking `k` with every
    /// path/value pair the chain reaches.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn nav_crumbs<'p>(
        &self,
        crumbs: &'p [Crumb],
        idx: usize,
        value: &Value,
        path: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(Path, &Value, Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        if idx == crumbs.len() {
            return k(path.clone(), value, sol);
        }
        match &crumbs[idx] {
            Crumb::Dot(keypat) => {
                let Value::Map(map) = value else {
                    return miss();
                };
                for (key, child) in map {
                    let flow = self.match_key(keypat, key, path, sol.clone(), &mut |s| {
                        self.nav_crumbs(crumbs, idx + 1, child, &path.child(key.clone()), s, &mut *k)
                    })?;
                    if flow.is_break() {
                        return Ok(flow);
                    }
                }
                miss()
            }
            Crumb::Index(index) => {
                let Value::Seq(items) = value else {
                    return miss();
                };
                match items.get(*index) {
                    Some(child) => {
                        self.nav_crumbs(crumbs, idx + 1, child, &path.child(*index), sol, k)
                    }
                    None => miss(),
                }
            }
            Crumb::Skip(keypat) => self.skip_descend(crumbs, idx, keypat, value, path, sol, k),
        }
    }

    /// Pre-order descent for `**`: yields every mapping entry whose key
    /// matches, at any depth, recursing through mappings and sequences.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn skip_descend<'p>(
        &self,
        crumbs: &'p [Crumb],
        idx: usize,
        keypat: &'p PatNode,
        value: &Value,
        path: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(Path, &Value, Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        self.enter()?;
        let result = (|| match value {
            Value::Map(map) => {
                for (key, child) in map {
                    let child_path = path.child(key.clone());
                    let flow = self.match_key(keypat, key, path, sol.clone(), &mut |s| {
                        self.nav_crumbs(crumbs, idx + 1, child, &child_path, s, &mut *k)
                    })?;
                    if flow.is_break() {
                        return Ok(flow);
                    }
                    let flow =
                        self.skip_descend(crumbs, idx, keypat, child, &child_path, sol.clone(), &mut *k)?;
                    if flow.is_break() {
                        return Ok(flow);
                    }
                }
                miss()
            }
            Value::Seq(items) => {
                for (index, child) in items.iter().enumerate() {
                    let flow = self.skip_descend(
                        crumbs,
                        idx,
                        keypat,
                        child,
                        &path.child(index),
                        sol.clone(),
                        &mut *k,
                    )?;
                    if flow.is_break() {
                        return Ok(flow);
                    }
                }
                miss()
            }
            _ => miss(),
        })();
        self.exit();
        result
    }
}
