//! Object matching: a term conjunction over one mapping.
//!
//! Every term sees the same input object. Each clause iterates its
//! candidate keys, sorting them into a *slice* (value matched) and a
//! *bad* set (key described, value mismatched); the count quantifier
//! judges the slice, and `each` (strong) additionally demands an empty
//! bad set. Covered keys accumulate across terms and drive the remnant
//! rule at the closing brace.
//!
//! Bindings made during one key's iteration (key pattern, breadcrumbs,
//! and value alike) are scoped to that iteration and rolled back before
//! the next key; they persist into the solution only when the clause
//! matched exactly one key. Names bound before the clause still constrain
//! every iteration, which is what makes `{ a: $x, b: $x }` an equality
//! constraint.

use std::collections::HashSet;
use std::ops::ControlFlow;

use indexmap::IndexSet;

use tendril_core::{Map, Path, Value};

use crate::parser::ast::{Clause, Counted, Crumb, ObjPat, Pat, PatNode, Remnant, SliceKind, Term, TermNode};
use crate::regex_cache;

use super::Machine;
use super::matcher::{MResult, miss};
use super::solution::{Binding, FrameScope, Site, Sol};

/// Branch state while matching one object pattern.
#[derive(Clone)]
pub(crate) struct ObjState<'p> {
    pub(crate) sol: Sol<'p>,
    pub(crate) covered: IndexSet<String>,
}

/// Branch state while one clause iterates its candidate keys.
#[derive(Clone)]
struct ClauseIter<'p> {
    sol: Sol<'p>,
    slice: Vec<String>,
    bad: usize,
    /// The full solution of the first matched key, bindings unstripped.
    witness: Option<Sol<'p>>,
}

fn effective_count(clause: &Clause) -> Counted {
    match clause.count {
        Some(count) => count,
        None if clause.optional => Counted::ZERO_OR_MORE,
        None => Counted::ONE_OR_MORE,
    }
}

fn literal_key(pat: &PatNode) -> Option<&str> {
    match &pat.pat {
        Pat::Str(s) => Some(s),
        _ => None,
    }
}

impl Machine {
    pub(crate) fn match_obj<'p>(
        &self,
        obj: &'p ObjPat,
        map: &Map,
        path: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(Sol<'p>) -> MResult,
    ) -> MResult {
        self.match_obj_state(obj, map, path, sol, &mut |st| (*k)(st.sol))
    }

    /// Object matching exposing the covered-key set; the slice-find entry
    /// point needs it to record the `$0` site.
    pub(crate) fn match_obj_state<'p>(
        &self,
        obj: &'p ObjPat,
        map: &Map,
        path: &Path,
        mut sol: Sol<'p>,
        k: &mut dyn FnMut(ObjState<'p>) -> MResult,
    ) -> MResult {
        let labelled = obj.label.is_some();
        if let Some(label) = &obj.label {
            sol.push_frame(FrameScope::Label(label.clone()));
        }

        let st = ObjState {
            sol,
            covered: IndexSet::new(),
        };
        self.match_terms(&obj.terms, 0, map, path, obj.label.as_deref(), st, &mut |st| {
            let remnant_keys: Vec<String> = map
                .keys()
                .filter(|key| !st.covered.contains(*key))
                .cloned()
                .collect();

            let admits = match &obj.remnant {
                Remnant::Closed | Remnant::AssertEmpty => remnant_keys.is_empty(),
                Remnant::NonEmpty => !remnant_keys.is_empty(),
                Remnant::Any | Remnant::Named(_) => true,
                Remnant::Count(count) => count.admits(remnant_keys.len()),
            };
            if !admits {
                return miss();
            }

            let mut st = st;
            if let Remnant::Named(name) = &obj.remnant {
                let values: Map = remnant_keys
                    .iter()
                    .map(|key| (key.clone(), map[key.as_str()].clone()))
                    .collect();
                let site = Site::ObjectSlice {
                    path: path.clone(),
                    keys: remnant_keys.clone(),
                    values: values.clone(),
                };
                if !st.sol.bind(
                    name,
                    Binding::Slice(SliceKind::Object, Value::Map(values)),
                    Some(site),
                ) {
                    return miss();
                }
                if !st.sol.check_guards() {
                    return miss();
                }
            }

            if labelled && !st.sol.pop_frame_bind() {
                return miss();
            }
            (*k)(st)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn match_terms<'p>(
        &self,
        terms: &'p [TermNode],
        idx: usize,
        map: &Map,
        path: &Path,
        label: Option<&'p str>,
        st: ObjState<'p>,
        k: &mut dyn FnMut(ObjState<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        if idx == terms.len() {
            return k(st);
        }
        self.match_term(&terms[idx], map, path, label, st, &mut |st2| {
            self.match_terms(terms, idx + 1, map, path, label, st2, &mut *k)
        })
    }

    fn match_term<'p>(
        &self,
        term: &'p TermNode,
        map: &Map,
        path: &Path,
        label: Option<&'p str>,
        st: ObjState<'p>,
        k: &mut dyn FnMut(ObjState<'p>) -> MResult,
    ) -> MResult {
        match &term.term {
            Term::Clause(clause) => self.match_clause(clause, map, path, label, st, k),

            Term::Group(terms) => self.match_terms(terms, 0, map, path, label, st, k),

            Term::GroupBind { name, terms } => {
                let before = st.covered.clone();
                self.match_terms(terms, 0, map, path, label, st, &mut |mut st2| {
                    // The group's slice is whatever its children covered.
                    let keys: Vec<String> = map
                        .keys()
                        .filter(|key| st2.covered.contains(*key) && !before.contains(*key))
                        .cloned()
                        .collect();
                    let values: Map = keys
                        .iter()
                        .map(|key| (key.clone(), map[key.as_str()].clone()))
                        .collect();
                    let site = Site::ObjectSlice {
                        path: path.clone(),
                        keys,
                        values: values.clone(),
                    };
                    if !st2.sol.bind(
                        name,
                        Binding::Slice(SliceKind::Object, Value::Map(values)),
                        Some(site),
                    ) {
                        return miss();
                    }
                    if !st2.sol.check_guards() {
                        return miss();
                    }
                    (*k)(st2)
                })
            }

            Term::Look { negated, terms } => {
                if *negated {
                    let mut found = false;
                    self.match_terms(terms, 0, map, path, label, st.clone(), &mut |_| {
                        found = true;
                        Ok(ControlFlow::Break(()))
                    })?;
                    if found { miss() } else { (*k)(st) }
                } else {
                    // Non-consuming: bindings flow on, covered keys do not.
                    let covered = st.covered.clone();
                    self.match_terms(terms, 0, map, path, label, st, &mut |st2| {
                        (*k)(ObjState {
                            sol: st2.sol,
                            covered: covered.clone(),
                        })
                    })
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn match_clause<'p>(
        &self,
        clause: &'p Clause,
        map: &Map,
        path: &Path,
        label: Option<&'p str>,
        st: ObjState<'p>,
        k: &mut dyn FnMut(ObjState<'p>) -> MResult,
    ) -> MResult {
        let ObjState { mut sol, covered } = st;
        sol.push_frame(FrameScope::Term);

        if matches!(clause.key.pat, Pat::RootKey) {
            let entries: Vec<String> = map.keys().cloned().collect();
            let iter = ClauseIter {
                sol,
                slice: Vec::new(),
                bad: 0,
                witness: None,
            };
            return self.descent_step(clause, &entries, 0, map, path, label, iter, &mut |iter| {
                finish_clause(clause, iter, &covered, &mut *k)
            });
        }

        let candidates: Vec<String> = match literal_key(&clause.key) {
            Some(name) => {
                if map.contains_key(name) {
                    vec![name.to_owned()]
                } else {
                    Vec::new()
                }
            }
            // Non-literal keys only see keys no earlier term covered.
            None => map
                .keys()
                .filter(|key| !covered.contains(*key))
                .cloned()
                .collect(),
        };

        let iter = ClauseIter {
            sol,
            slice: Vec::new(),
            bad: 0,
            witness: None,
        };
        self.clause_step(clause, &candidates, 0, map, path, label, iter, &mut |iter| {
            finish_clause(clause, iter, &covered, &mut *k)
        })
    }

    /// Processes `keys[i..]` for one clause, threading the iteration state.
    #[allow(clippy::too_many_arguments)]
    fn clause_step<'p>(
        &self,
        clause: &'p Clause,
        keys: &[String],
        i: usize,
        map: &Map,
        path: &Path,
        label: Option<&'p str>,
        iter: ClauseIter<'p>,
        k: &mut dyn FnMut(ClauseIter<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        if i == keys.len() {
            return k(iter);
        }
        let key = &keys[i];
        let value = map.get(key).expect("candidate key exists");

        // Key probe: does this term describe the key at all?
        let mut key_sols: Vec<Sol<'p>> = Vec::new();
        self.match_key(&clause.key, key, path, iter.sol.clone(), &mut |s| {
            key_sols.push(s);
            Ok(ControlFlow::Continue(()))
        })?;

        if key_sols.is_empty() {
            // Not described: neither slice nor bad.
            return self.clause_step(clause, keys, i + 1, map, path, label, iter, k);
        }

        let pre: HashSet<String> = iter.sol.bound_names().into_iter().collect();
        let child = path.child(key.clone());

        // Follow breadcrumbs, then match the value; collect every branch.
        let mut outcomes: Vec<Sol<'p>> = Vec::new();
        for ksol in key_sols {
            let mut ksol = ksol;
            ksol.set_observed(key, label);
            self.nav_crumbs(&clause.crumbs, 0, value, &child, ksol, &mut |p, v, s| {
                self.match_pat(&clause.value, v, &p, s, &mut |s2| {
                    outcomes.push(s2);
                    Ok(ControlFlow::Continue(()))
                })
            })?;
        }

        if outcomes.is_empty() {
            // Described but mismatched.
            let next = ClauseIter {
                bad: iter.bad + 1,
                ..iter
            };
            return self.clause_step(clause, keys, i + 1, map, path, label, next, k);
        }

        let first_match = iter.slice.is_empty();
        let mut slice = iter.slice.clone();
        slice.push(key.clone());

        for full in outcomes {
            let mut threaded = full.clone();
            threaded.retain_names(&pre);
            let next = ClauseIter {
                sol: threaded,
                slice: slice.clone(),
                bad: iter.bad,
                witness: if first_match { Some(full) } else { None },
            };
            let flow = self.clause_step(clause, keys, i + 1, map, path, label, next, &mut *k)?;
            if flow.is_break() {
                return Ok(flow);
            }
        }
        miss()
    }

    /// Deep-descent variant (`**key: V`): top-level entries are probed by
    /// descending through their values instead of by key name.
    #[allow(clippy::too_many_arguments)]
    fn descent_step<'p>(
        &self,
        clause: &'p Clause,
        entries: &[String],
        i: usize,
        map: &Map,
        path: &Path,
        label: Option<&'p str>,
        iter: ClauseIter<'p>,
        k: &mut dyn FnMut(ClauseIter<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        if i == entries.len() {
            return k(iter);
        }
        let entry = &entries[i];
        let value = map.get(entry).expect("entry key exists");
        let child = path.child(entry.clone());

        let Some(Crumb::Skip(keypat)) = clause.crumbs.first() else {
            // The parser always puts a Skip first after a RootKey head.
            return k(iter);
        };

        let pre: HashSet<String> = iter.sol.bound_names().into_iter().collect();
        let mut had_target = false;
        let mut outcomes: Vec<Sol<'p>> = Vec::new();

        {
            let mut on_target = |p: Path, v: &Value, mut s: Sol<'p>| -> MResult {
                had_target = true;
                s.set_observed(entry, label);
                self.match_pat(&clause.value, v, &p, s, &mut |s2| {
                    outcomes.push(s2);
                    Ok(ControlFlow::Continue(()))
                })
            };

            // The entry itself can be the descent target...
            self.match_key(keypat, entry, path, iter.sol.clone(), &mut |s| {
                self.nav_crumbs(&clause.crumbs, 1, value, &child, s, &mut on_target)
            })?;
            // ...and so can anything beneath it.
            self.skip_descend(&clause.crumbs, 0, keypat, value, &child, iter.sol.clone(), &mut on_target)?;
        }

        if !had_target {
            return self.descent_step(clause, entries, i + 1, map, path, label, iter, k);
        }
        if outcomes.is_empty() {
            let next = ClauseIter {
                bad: iter.bad + 1,
                ..iter
            };
            return self.descent_step(clause, entries, i + 1, map, path, label, next, k);
        }

        let first_match = iter.slice.is_empty();
        let mut slice = iter.slice.clone();
        slice.push(entry.clone());

        for full in outcomes {
            let mut threaded = full.clone();
            threaded.retain_names(&pre);
            let next = ClauseIter {
                sol: threaded,
                slice: slice.clone(),
                bad: iter.bad,
                witness: if first_match { Some(full) } else { None },
            };
            let flow = self.descent_step(clause, entries, i + 1, map, path, label, next, &mut *k)?;
            if flow.is_break() {
                return Ok(flow);
            }
        }
        miss()
    }

    /// Matches a key pattern against a key string. Binds record [`Site::Key`]
    /// sites so edits can rename keys in place.
    pub(crate) fn match_key<'p>(
        &self,
        pat: &'p PatNode,
        key: &str,
        obj_path: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        match &pat.pat {
            Pat::Any => k(sol),
            Pat::TypedAny(crate::parser::ast::PrimKind::String) => k(sol),
            Pat::Str(s) => {
                if s == key {
                    k(sol)
                } else {
                    miss()
                }
            }
            Pat::StrCi(s) => {
                if s.to_lowercase() == key.to_lowercase() {
                    k(sol)
                } else {
                    miss()
                }
            }
            Pat::Regex(rx) => {
                let Ok(regex) = regex_cache::compile(&rx.source, &rx.flags) else {
                    return miss();
                };
                if regex.is_match(key) { k(sol) } else { miss() }
            }
            Pat::Bind { name, pat, guard } => {
                self.match_key(pat, key, obj_path, sol, &mut |mut s| {
                    let site = Site::Key {
                        path: obj_path.clone(),
                        key: key.to_owned(),
                    };
                    if !s.bind(name, Binding::Scalar(Value::Str(key.to_owned())), Some(site)) {
                        return miss();
                    }
                    let live = match guard {
                        Some(g) => s.attach_guard(g, Value::Str(key.to_owned())),
                        None => s.check_guards(),
                    };
                    if !live {
                        return miss();
                    }
                    (*k)(s)
                })
            }
            Pat::Guarded { pat, guard } => {
                self.match_key(pat, key, obj_path, sol, &mut |mut s| {
                    if !s.attach_guard(guard, Value::Str(key.to_owned())) {
                        return miss();
                    }
                    (*k)(s)
                })
            }
            Pat::Alt { alts, prioritized } => {
                if *prioritized {
                    for alt in alts {
                        let mut emitted = false;
                        let flow = self.match_key(alt, key, obj_path, sol.clone(), &mut |s| {
                            emitted = true;
                            (*k)(s)
                        })?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                        if emitted {
                            return miss();
                        }
                    }
                    miss()
                } else {
                    for alt in alts {
                        let flow = self.match_key(alt, key, obj_path, sol.clone(), &mut *k)?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                    }
                    miss()
                }
            }
            // Numbers, booleans, containers, quantifiers: never a key.
            _ => miss(),
        }
    }
}

/// Shared clause epilogue: count and strong checks, witness promotion,
/// term-frame finalization, covered-key accounting.
fn finish_clause<'p>(
    clause: &Clause,
    mut iter: ClauseIter<'p>,
    covered: &IndexSet<String>,
    k: &mut dyn FnMut(ObjState<'p>) -> MResult,
) -> MResult {
    if !effective_count(clause).admits(iter.slice.len()) {
        return miss();
    }
    if clause.strong && iter.bad > 0 {
        return miss();
    }

    let mut sol = if iter.slice.len() == 1 {
        iter.witness.take().expect("witness recorded for the single match")
    } else {
        iter.sol
    };
    if !sol.pop_frame_bind() {
        return miss();
    }

    let mut covered = covered.clone();
    covered.extend(iter.slice.iter().cloned());
    k(ObjState { sol, covered })
}
