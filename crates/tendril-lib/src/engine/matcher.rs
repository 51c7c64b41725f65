//! `match_pat`: the single dispatch over pattern variants.

use std::ops::ControlFlow;

use tendril_core::value::num_eq;
use tendril_core::{Path, Value};

use crate::parser::ast::{Pat, PatNode, PrimKind};
use crate::regex_cache;

use super::solution::{Binding, FrameScope, Site, Sol};
use super::{Machine, MatchError};

/// A matcher call either keeps searching (`Continue`), stops because the
/// caller is satisfied (`Break`), or aborts on a hard error.
pub(crate) type MResult = Result<ControlFlow<()>, MatchError>;

/// "No solutions down this branch; keep searching elsewhere."
#[inline]
pub(crate) fn miss() -> MResult {
    Ok(ControlFlow::Continue(()))
}

impl Machine {
    /// Matches one pattern against one node, invoking `k` once per
    /// solution branch.
    pub(crate) fn match_pat<'p>(
        &self,
        pat: &'p PatNode,
        node: &Value,
        path: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        match &pat.pat {
            Pat::Any => k(sol),

            Pat::TypedAny(kind) => {
                let hit = matches!(
                    (kind, node),
                    (PrimKind::String, Value::Str(_))
                        | (PrimKind::Number, Value::Num(_))
                        | (PrimKind::Boolean, Value::Bool(_))
                );
                if hit { k(sol) } else { miss() }
            }

            Pat::Num(expected) => match node {
                Value::Num(n) if num_eq(*n, *expected) => k(sol),
                _ => miss(),
            },

            Pat::Str(expected) => match node {
                Value::Str(s) if s == expected => k(sol),
                _ => miss(),
            },

            Pat::StrCi(expected) => match node {
                Value::Str(s) if s.to_lowercase() == expected.to_lowercase() => k(sol),
                _ => miss(),
            },

            Pat::Regex(rx) => match node {
                Value::Str(s) => {
                    let Ok(regex) = regex_cache::compile(&rx.source, &rx.flags) else {
                        return miss();
                    };
                    if regex.is_match(s) { k(sol) } else { miss() }
                }
                _ => miss(),
            },

            Pat::Bool(expected) => match node {
                Value::Bool(b) if b == expected => k(sol),
                _ => miss(),
            },

            Pat::Null => match node {
                Value::Null => k(sol),
                _ => miss(),
            },

            Pat::Bind { name, pat, guard } => {
                self.match_pat(pat, node, path, sol, &mut |mut s| {
                    let site = Site::Scalar {
                        path: path.clone(),
                        value: node.clone(),
                    };
                    if !s.bind(name, Binding::Scalar(node.clone()), Some(site)) {
                        return miss();
                    }
                    let live = match guard {
                        Some(g) => s.attach_guard(g, node.clone()),
                        None => s.check_guards(),
                    };
                    if !live {
                        return miss();
                    }
                    (*k)(s)
                })
            }

            Pat::Guarded { pat, guard } => {
                self.match_pat(pat, node, path, sol, &mut |mut s| {
                    if !s.attach_guard(guard, node.clone()) {
                        return miss();
                    }
                    (*k)(s)
                })
            }

            Pat::Alt { alts, prioritized } => {
                if *prioritized {
                    for alt in alts {
                        let mut emitted = false;
                        let flow = self.match_pat(alt, node, path, sol.clone(), &mut |s| {
                            emitted = true;
                            (*k)(s)
                        })?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                        // Prioritized choice commits to the first
                        // alternative that yields any solution.
                        if emitted {
                            return miss();
                        }
                    }
                    miss()
                } else {
                    for alt in alts {
                        let flow = self.match_pat(alt, node, path, sol.clone(), &mut *k)?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                    }
                    miss()
                }
            }

            Pat::Arr(arr) => {
                let Value::Seq(items) = node else {
                    return miss();
                };
                self.enter()?;
                let mut sol = sol;
                let labelled = arr.label.is_some();
                if let Some(label) = &arr.label {
                    sol.push_frame(FrameScope::Label(label.clone()));
                }
                let result =
                    self.match_run(&arr.items, 0, items, 0, path, sol, &mut |end, mut s| {
                        if end != items.len() {
                            return miss();
                        }
                        if labelled && !s.pop_frame_bind() {
                            return miss();
                        }
                        (*k)(s)
                    });
                self.exit();
                result
            }

            Pat::Obj(obj) => {
                let Value::Map(map) = node else {
                    return miss();
                };
                self.enter()?;
                let result = self.match_obj(obj, map, path, sol, k);
                self.exit();
                result
            }

            Pat::Flow {
                pat,
                bucket,
                kind,
                label,
            } => self.match_pat(pat, node, path, sol, &mut |mut s| {
                if !s.flow_into(bucket, *kind, label.as_deref(), node.clone()) {
                    return miss();
                }
                (*k)(s)
            }),

            Pat::Collect {
                pat,
                key,
                value,
                bucket,
                kind,
                label,
            } => self.match_pat(pat, node, path, sol, &mut |mut s| {
                let Some(collected) = s.get(value).map(|b| b.value().clone()) else {
                    return miss();
                };
                let key_entry = match key {
                    Some(name) => match s.get(name).map(|b| b.value().clone()) {
                        Some(Value::Str(text)) => Some(text),
                        _ => return miss(),
                    },
                    None => None,
                };
                if !s.collect_into(bucket, *kind, label, key_entry, collected) {
                    return miss();
                }
                (*k)(s)
            }),

            // Position-restricted constructs; the validator keeps these
            // out of scalar position, and the sequence matcher handles
            // them in element position.
            Pat::Quant { .. }
            | Pat::Spread { .. }
            | Pat::Group(_)
            | Pat::Look { .. }
            | Pat::GroupBind { .. }
            | Pat::RootKey
            | Pat::Slice { .. } => miss(),
        }
    }
}
