//! Search modes derived from one core: anchored match, pre-order find,
//! and the slice-find entry points (`@[...]` / `%{...}`).
//!
//! Exists/first are not separate modes here; callers get them by
//! returning `ControlFlow::Break` from the emit callback.

use tendril_core::{Map, Path, Value};

use crate::parser::ast::{Pat, PatNode, SliceKind};

use super::Machine;
use super::matcher::{MResult, miss};
use super::solution::{Binding, Site, Sol};

impl Machine {
    /// Anchored match: the whole pattern against the root node. `$0`
    /// records the whole-match site.
    pub(crate) fn match_root<'p>(
        &self,
        pat: &'p PatNode,
        root: &Value,
        emit: &mut dyn FnMut(Sol<'p>) -> MResult,
    ) -> MResult {
        self.match_at(pat, root, &Path::root(), emit)
    }

    /// Pre-order find: attempt an anchored match at every subnode
    /// (root first, then sequence elements in index order, then mapping
    /// values in insertion order).
    pub(crate) fn scan<'p>(
        &self,
        pat: &'p PatNode,
        root: &Value,
        emit: &mut dyn FnMut(&Path, Sol<'p>) -> MResult,
    ) -> MResult {
        self.scan_node(pat, root, &Path::root(), emit)
    }

    fn scan_node<'p>(
        &self,
        pat: &'p PatNode,
        node: &Value,
        path: &Path,
        emit: &mut dyn FnMut(&Path, Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        self.enter()?;
        let result = (|| {
            let flow = self.match_at(pat, node, path, &mut |s| (*emit)(path, s))?;
            if flow.is_break() {
                return Ok(flow);
            }
            match node {
                Value::Seq(items) => {
                    for (index, child) in items.iter().enumerate() {
                        let flow = self.scan_node(pat, child, &path.child(index), &mut *emit)?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                    }
                }
                Value::Map(map) => {
                    for (key, child) in map {
                        let flow = self.scan_node(pat, child, &path.child(key.clone()), &mut *emit)?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                    }
                }
                _ => {}
            }
            miss()
        })();
        self.exit();
        result
    }

    fn match_at<'p>(
        &self,
        pat: &'p PatNode,
        node: &Value,
        path: &Path,
        emit: &mut dyn FnMut(Sol<'p>) -> MResult,
    ) -> MResult {
        if let Pat::Slice { kind, pat: inner } = &pat.pat {
            return self.match_slice_at(*kind, inner, node, path, emit);
        }

        let mut sol = Sol::new();
        sol.bind(
            "0",
            Binding::Scalar(node.clone()),
            Some(Site::Scalar {
                path: path.clone(),
                value: node.clone(),
            }),
        );
        self.match_pat(pat, node, path, sol, &mut |s| {
            // A guard still waiting for a variable fails the branch.
            if !s.guards_settled() {
                return miss();
            }
            (*emit)(s)
        })
    }

    /// Slice finds anchor to a container and emit one solution per
    /// matching slice; `$0` is the slice site.
    fn match_slice_at<'p>(
        &self,
        kind: SliceKind,
        inner: &'p PatNode,
        node: &Value,
        path: &Path,
        emit: &mut dyn FnMut(Sol<'p>) -> MResult,
    ) -> MResult {
        match (kind, node, &inner.pat) {
            (SliceKind::Array, Value::Seq(items), Pat::Arr(arr)) => {
                for start in 0..=items.len() {
                    let flow =
                        self.match_run(&arr.items, 0, items, start, path, Sol::new(), &mut |end,
                                                                                           mut s| {
                            let values = items[start..end].to_vec();
                            let site = Site::ArraySlice {
                                path: path.clone(),
                                start,
                                end,
                                values: values.clone(),
                            };
                            s.bind(
                                "0",
                                Binding::Slice(SliceKind::Array, Value::Seq(values)),
                                Some(site),
                            );
                            if !s.guards_settled() {
                                return miss();
                            }
                            (*emit)(s)
                        })?;
                    if flow.is_break() {
                        return Ok(flow);
                    }
                }
                miss()
            }
            (SliceKind::Object, Value::Map(map), Pat::Obj(obj)) => {
                self.match_obj_state(obj, map, path, Sol::new(), &mut |mut st| {
                    let keys: Vec<String> = st.covered.iter().cloned().collect();
                    let values: Map = keys
                        .iter()
                        .map(|key| (key.clone(), map[key.as_str()].clone()))
                        .collect();
                    let site = Site::ObjectSlice {
                        path: path.clone(),
                        keys,
                        values: values.clone(),
                    };
                    st.sol.bind(
                        "0",
                        Binding::Slice(SliceKind::Object, Value::Map(values)),
                        Some(site),
                    );
                    if !st.sol.guards_settled() {
                        return miss();
                    }
                    (*emit)(st.sol)
                })
            }
            _ => miss(),
        }
    }
}
