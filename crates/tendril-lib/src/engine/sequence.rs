//! Sequence matching: the element-list state machine and the three
//! quantifier disciplines.
//!
//! Quantifiers expand explicit frontier levels: `levels[r]` holds the
//! `(position, solution)` states reachable after `r` repetitions. Greedy
//! continues longest-first, lazy shortest-first, possessive only from the
//! deepest level. A repetition that consumes nothing marks its state
//! *saturated*: it can pad out any remaining minimum, but never expands
//! again, so zero-width loops terminate.

use std::ops::ControlFlow;

use tendril_core::{Path, Value};

use crate::parser::ast::{Counted, Pat, PatNode, QuantMode};

use super::Machine;
use super::matcher::{MResult, miss};
use super::solution::{Binding, Site, Sol};

/// One quantifier frontier state.
#[derive(Clone)]
struct QState<'p> {
    pos: usize,
    sol: Sol<'p>,
    saturated: bool,
}

impl Machine {
    /// Matches `items[idx..]` against `nodes[at..]`, emitting the end
    /// position of every complete run.
    pub(crate) fn match_run<'p>(
        &self,
        items: &'p [PatNode],
        idx: usize,
        nodes: &[Value],
        at: usize,
        base: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(usize, Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        if idx == items.len() {
            return k(at, sol);
        }
        let elem = &items[idx];
        self.match_element(elem, nodes, at, base, sol, &mut |end, s| {
            self.match_run(items, idx + 1, nodes, end, base, s, &mut *k)
        })
    }

    /// Matches one element starting at `nodes[at]`, emitting every end
    /// position it can reach.
    pub(crate) fn match_element<'p>(
        &self,
        elem: &'p PatNode,
        nodes: &[Value],
        at: usize,
        base: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(usize, Sol<'p>) -> MResult,
    ) -> MResult {
        self.step()?;
        match &elem.pat {
            Pat::Spread { count } => {
                let available = nodes.len() - at;
                let min = count.map_or(0, |c| c.min as usize);
                let max = count
                    .and_then(|c| c.max)
                    .map_or(available, |m| m as usize)
                    .min(available);
                if min > available {
                    return miss();
                }
                // Natural order: shortest consumption first.
                for n in min..=max {
                    let flow = (*k)(at + n, sol.clone())?;
                    if flow.is_break() {
                        return Ok(flow);
                    }
                }
                miss()
            }

            Pat::Quant { pat, count, mode } => {
                self.match_quant(pat, *count, *mode, nodes, at, base, sol, k)
            }

            Pat::Group(items) => self.match_run(items, 0, nodes, at, base, sol, k),

            Pat::Look { negated, pat } => {
                if *negated {
                    let mut found = false;
                    self.match_element(pat, nodes, at, base, sol.clone(), &mut |_, _| {
                        found = true;
                        Ok(ControlFlow::Break(()))
                    })?;
                    if found { miss() } else { (*k)(at, sol) }
                } else {
                    // Recognize without consuming; bindings stay visible.
                    self.match_element(pat, nodes, at, base, sol, &mut |_, s| (*k)(at, s))
                }
            }

            Pat::GroupBind { name, kind, pat } => {
                self.match_element(pat, nodes, at, base, sol, &mut |end, mut s| {
                    let values: Vec<Value> = nodes[at..end].to_vec();
                    let site = Site::ArraySlice {
                        path: base.clone(),
                        start: at,
                        end,
                        values: values.clone(),
                    };
                    if !s.bind(name, Binding::Slice(*kind, Value::Seq(values)), Some(site)) {
                        return miss();
                    }
                    if !s.check_guards() {
                        return miss();
                    }
                    (*k)(end, s)
                })
            }

            Pat::Alt { alts, prioritized } => {
                if *prioritized {
                    for alt in alts {
                        let mut emitted = false;
                        let flow =
                            self.match_element(alt, nodes, at, base, sol.clone(), &mut |e, s| {
                                emitted = true;
                                (*k)(e, s)
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
                        let flow = self.match_element(alt, nodes, at, base, sol.clone(), &mut *k)?;
                        if flow.is_break() {
                            return Ok(flow);
                        }
                    }
                    miss()
                }
            }

            Pat::Flow {
                pat,
                bucket,
                kind,
                label,
            } => self.match_element(pat, nodes, at, base, sol, &mut |end, mut s| {
                // A one-node run flows the node; a longer run flows the slice.
                let value = if end == at + 1 {
                    nodes[at].clone()
                } else {
                    Value::Seq(nodes[at..end].to_vec())
                };
                if !s.flow_into(bucket, *kind, label.as_deref(), value) {
                    return miss();
                }
                (*k)(end, s)
            }),

            Pat::Collect {
                pat,
                key,
                value,
                bucket,
                kind,
                label,
            } => self.match_element(pat, nodes, at, base, sol, &mut |end, mut s| {
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
                (*k)(end, s)
            }),

            _ => {
                // A single-node pattern consumes exactly one element.
                if at >= nodes.len() {
                    return miss();
                }
                let child = base.child(at);
                self.match_pat(elem, &nodes[at], &child, sol, &mut |s| (*k)(at + 1, s))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn match_quant<'p>(
        &self,
        sub: &'p PatNode,
        count: Counted,
        mode: QuantMode,
        nodes: &[Value],
        at: usize,
        base: &Path,
        sol: Sol<'p>,
        k: &mut dyn FnMut(usize, Sol<'p>) -> MResult,
    ) -> MResult {
        let min = count.min as usize;
        let max = count.max.map_or(usize::MAX, |m| m as usize);

        let mut levels: Vec<Vec<QState<'p>>> = vec![vec![QState {
            pos: at,
            sol,
            saturated: false,
        }]];

        // Expand the frontier one repetition at a time.
        while levels.len() - 1 < max {
            let current: Vec<QState<'p>> = levels
                .last()
                .expect("at least one level")
                .iter()
                .filter(|s| !s.saturated)
                .cloned()
                .collect();
            if current.is_empty() {
                break;
            }
            let mut next: Vec<QState<'p>> = Vec::new();
            for state in &current {
                self.match_element(sub, nodes, state.pos, base, state.sol.clone(), &mut |end, s| {
                    next.push(QState {
                        pos: end,
                        sol: s,
                        saturated: end == state.pos,
                    });
                    Ok(ControlFlow::Continue(()))
                })?;
            }
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        let eligible = |r: usize, state: &QState<'p>| r >= min || state.saturated;

        match mode {
            QuantMode::Greedy => {
                for r in (0..levels.len()).rev() {
                    for state in &levels[r] {
                        if eligible(r, state) {
                            let flow = (*k)(state.pos, state.sol.clone())?;
                            if flow.is_break() {
                                return Ok(flow);
                            }
                        }
                    }
                }
                miss()
            }
            QuantMode::Lazy => {
                for (r, level) in levels.iter().enumerate() {
                    for state in level {
                        if eligible(r, state) {
                            let flow = (*k)(state.pos, state.sol.clone())?;
                            if flow.is_break() {
                                return Ok(flow);
                            }
                        }
                    }
                }
                miss()
            }
            QuantMode::Possessive => {
                // Commit to the maximum expansion; shorter frontiers are
                // never retried.
                let deepest = levels.len() - 1;
                for (r, level) in levels.iter().enumerate() {
                    for state in level {
                        let terminal = r == deepest || state.saturated;
                        if terminal && eligible(r, state) {
                            let flow = (*k)(state.pos, state.sol.clone())?;
                            if flow.is_break() {
                                return Ok(flow);
                            }
                        }
                    }
                }
                miss()
            }
        }
    }
}
