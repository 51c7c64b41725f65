//! The public façade: compiled patterns, anchored and scanning matchers,
//! occurrence sets, and solution views.

mod cache;

#[cfg(test)]
mod cache_tests;
#[cfg(test)]
mod query_tests;

use std::ops::ControlFlow;
use std::sync::Arc;

use indexmap::IndexMap;

use tendril_core::{Path, Value};

use crate::edit::{EditOptions, EditPlan, EditReport, apply_edits, collect_edits};
use crate::engine::solution::SiteKey;
use crate::engine::{Binding, FuelLimits, Machine, MatchError, Site, Sol};
use crate::parser::ast::PatNode;
use crate::{CompileError, EditError};

/// A compiled pattern: the opaque handle the rest of the API hangs off.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    ast: Arc<PatNode>,
    limits: FuelLimits,
}

/// Compile-time options.
pub struct PatternBuilder {
    source: String,
    limits: FuelLimits,
}

impl PatternBuilder {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            limits: FuelLimits::default(),
        }
    }

    /// Bound the search step budget.
    pub fn exec_fuel(mut self, fuel: u64) -> Self {
        self.limits = self.limits.exec_fuel(fuel);
        self
    }

    /// Bound structural recursion depth.
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.limits = self.limits.recursion_limit(limit);
        self
    }

    pub fn compile(self) -> Result<Pattern, CompileError> {
        let ast = crate::parser::compile(&self.source)?;
        Ok(Pattern {
            source: self.source,
            ast: Arc::new(ast),
            limits: self.limits,
        })
    }
}

impl Pattern {
    /// Compiles a pattern with default limits.
    pub fn compile(source: &str) -> Result<Pattern, CompileError> {
        PatternBuilder::new(source).compile()
    }

    pub fn builder(source: &str) -> PatternBuilder {
        PatternBuilder::new(source)
    }

    /// Compiles through the process-wide bounded AST cache.
    pub fn cached(source: &str) -> Result<Pattern, CompileError> {
        cache::get_or_compile(source)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Anchored matching: the whole pattern against the root node.
    pub fn on<'a, 'd>(&'a self, data: &'d Value) -> Anchored<'a, 'd> {
        Anchored {
            pattern: self,
            data,
        }
    }

    /// Scanning matching: visit every subnode in pre-order and attempt an
    /// anchored match at each.
    pub fn find(&self, data: &Value) -> Result<Found, MatchError> {
        let machine = Machine::new(self.limits);
        let mut grouped: IndexMap<SiteKey, Occurrence> = IndexMap::new();
        machine.scan(&self.ast, data, &mut |path, sol| {
            group_solution(&mut grouped, path, &sol);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(Found {
            occurrences: grouped.into_values().collect(),
            fuel_spent: machine.fuel_spent(),
        })
    }

    /// Does any subnode match? Short-circuits at the first solution.
    pub fn exists(&self, data: &Value) -> Result<bool, MatchError> {
        let machine = Machine::new(self.limits);
        let mut found = false;
        machine.scan(&self.ast, data, &mut |_, _| {
            found = true;
            Ok(ControlFlow::Break(()))
        })?;
        Ok(found)
    }

    /// The first occurrence in pre-order, with only its first solution.
    pub fn first(&self, data: &Value) -> Result<Option<Occurrence>, MatchError> {
        let machine = Machine::new(self.limits);
        let mut hit: Option<Occurrence> = None;
        machine.scan(&self.ast, data, &mut |path, sol| {
            let mut grouped = IndexMap::new();
            group_solution(&mut grouped, path, &sol);
            hit = grouped.into_values().next();
            Ok(ControlFlow::Break(()))
        })?;
        Ok(hit)
    }

    /// Anchored in-place edit: solve against `data`, then apply the plan
    /// to it.
    pub fn mutate(
        &self,
        data: &mut Value,
        plan: &EditPlan,
        mut options: EditOptions,
    ) -> Result<EditReport, EditError> {
        let solutions = self.on(data).solutions()?;
        let groups: Vec<&[Solution]> = vec![&solutions];
        let (edits, conflicts) = collect_edits(plan, &groups, &mut options)?;
        let (applied, cas_failures) = apply_edits(data, edits, &mut options);
        Ok(EditReport {
            applied,
            conflicts,
            cas_failures,
        })
    }

    fn machine(&self) -> Machine {
        Machine::new(self.limits)
    }
}

fn group_solution(grouped: &mut IndexMap<SiteKey, Occurrence>, path: &Path, sol: &Sol<'_>) {
    let solution = Solution::from_sol(sol);
    let Some(site) = solution.site_zero() else {
        return;
    };
    let key = site.key();
    match grouped.get_mut(&key) {
        Some(occurrence) => occurrence.solutions.push(solution),
        None => {
            let value = solution
                .binding("0")
                .map(|b| b.value().clone())
                .unwrap_or(Value::Null);
            grouped.insert(
                key,
                Occurrence {
                    path: path.clone(),
                    value,
                    solutions: vec![solution],
                },
            );
        }
    }
}

/// Anchored matcher over one value.
pub struct Anchored<'a, 'd> {
    pattern: &'a Pattern,
    data: &'d Value,
}

impl Anchored<'_, '_> {
    /// Does the pattern match at the root? Short-circuits.
    pub fn test(&self) -> Result<bool, MatchError> {
        let machine = self.pattern.machine();
        let mut found = false;
        machine.match_root(&self.pattern.ast, self.data, &mut |_| {
            found = true;
            Ok(ControlFlow::Break(()))
        })?;
        Ok(found)
    }

    /// The first solution, if any.
    pub fn solve(&self) -> Result<Option<Solution>, MatchError> {
        let machine = self.pattern.machine();
        let mut first: Option<Solution> = None;
        machine.match_root(&self.pattern.ast, self.data, &mut |sol| {
            first = Some(Solution::from_sol(&sol));
            Ok(ControlFlow::Break(()))
        })?;
        Ok(first)
    }

    /// Every solution, in deterministic emission order.
    pub fn solutions(&self) -> Result<Vec<Solution>, MatchError> {
        let machine = self.pattern.machine();
        let mut out = Vec::new();
        machine.match_root(&self.pattern.ast, self.data, &mut |sol| {
            out.push(Solution::from_sol(&sol));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(out)
    }

    /// Replaces the whole match (`$0`) in a copy of the data.
    pub fn replace(&self, value: impl Into<Value>) -> Result<Value, EditError> {
        let plan = EditPlan::new().set("0", value);
        Ok(self.edit(&plan, EditOptions::new())?.0)
    }

    /// Applies an edit plan to a copy of the data.
    pub fn edit(
        &self,
        plan: &EditPlan,
        mut options: EditOptions,
    ) -> Result<(Value, EditReport), EditError> {
        let solutions = self.solutions()?;
        let groups: Vec<&[Solution]> = vec![&solutions];
        let (edits, conflicts) = collect_edits(plan, &groups, &mut options)?;
        let mut root = self.data.clone();
        let (applied, cas_failures) = apply_edits(&mut root, edits, &mut options);
        Ok((
            root,
            EditReport {
                applied,
                conflicts,
                cas_failures,
            },
        ))
    }
}

/// The result of a scan: occurrences in pre-order, detached from the data.
pub struct Found {
    occurrences: Vec<Occurrence>,
    fuel_spent: u64,
}

impl Found {
    pub fn count(&self) -> usize {
        self.occurrences.len()
    }

    pub fn has_match(&self) -> bool {
        !self.occurrences.is_empty()
    }

    /// Occurrence paths, in pre-order.
    pub fn paths(&self) -> Vec<Path> {
        self.occurrences.iter().map(|o| o.path.clone()).collect()
    }

    pub fn first(&self) -> Option<&Occurrence> {
        self.occurrences.first()
    }

    pub fn take(mut self, n: usize) -> Found {
        self.occurrences.truncate(n);
        self
    }

    pub fn filter(mut self, mut f: impl FnMut(&Occurrence) -> bool) -> Found {
        self.occurrences.retain(|o| f(o));
        self
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn iter(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter()
    }

    pub fn solutions(&self) -> impl Iterator<Item = &Solution> {
        self.occurrences.iter().flat_map(|o| o.solutions.iter())
    }

    /// Distinct values observed for one binding, across all solutions.
    pub fn unique_bindings(&self, name: &str) -> Vec<&Value> {
        let mut out: Vec<&Value> = Vec::new();
        for solution in self.solutions() {
            if let Some(value) = solution.get(name)
                && !out.iter().any(|seen| seen.deep_eq(value))
            {
                out.push(value);
            }
        }
        out
    }

    /// Search steps this scan consumed.
    pub fn fuel_spent(&self) -> u64 {
        self.fuel_spent
    }

    /// Replaces every occurrence's whole match in a copy of `root`.
    pub fn replace_all(&self, root: &Value, value: impl Into<Value>) -> Result<Value, EditError> {
        let plan = EditPlan::new().set("0", value);
        Ok(self.edit_all(root, &plan, EditOptions::new())?.0)
    }

    /// Replaces every whole match with a computed value (one call per
    /// occurrence).
    pub fn replace_all_with(
        &self,
        root: &Value,
        f: impl Fn(&Solution) -> Value + 'static,
    ) -> Result<Value, EditError> {
        let plan = EditPlan::new().set_with("0", f);
        let options = EditOptions::new().per(crate::edit::PerMode::Occurrence);
        Ok(self.edit_all(root, &plan, options)?.0)
    }

    /// Applies an edit plan across all occurrences to a copy of `root`.
    pub fn edit_all(
        &self,
        root: &Value,
        plan: &EditPlan,
        options: EditOptions,
    ) -> Result<(Value, EditReport), EditError> {
        let mut root = root.clone();
        let report = self.edit_all_in(&mut root, plan, options)?;
        Ok((root, report))
    }

    /// Applies an edit plan in place. Compare-and-set protects against
    /// the data having drifted since the scan.
    pub fn edit_all_in(
        &self,
        root: &mut Value,
        plan: &EditPlan,
        mut options: EditOptions,
    ) -> Result<EditReport, EditError> {
        let groups: Vec<&[Solution]> = self
            .occurrences
            .iter()
            .map(|o| o.solutions.as_slice())
            .collect();
        let (edits, conflicts) = collect_edits(plan, &groups, &mut options)?;
        let (applied, cas_failures) = apply_edits(root, edits, &mut options);
        Ok(EditReport {
            applied,
            conflicts,
            cas_failures,
        })
    }
}

/// One match site: a path plus the solutions found there.
pub struct Occurrence {
    path: Path,
    value: Value,
    solutions: Vec<Solution>,
}

impl Occurrence {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The matched value as observed at scan time.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Replaces this occurrence's whole match in a copy of `root`.
    pub fn replace(&self, root: &Value, value: impl Into<Value>) -> Result<Value, EditError> {
        let plan = EditPlan::new().set("0", value);
        Ok(self.edit(root, &plan, EditOptions::new())?.0)
    }

    /// Applies an edit plan using only this occurrence's solutions.
    pub fn edit(
        &self,
        root: &Value,
        plan: &EditPlan,
        mut options: EditOptions,
    ) -> Result<(Value, EditReport), EditError> {
        let groups: Vec<&[Solution]> = vec![self.solutions.as_slice()];
        let (edits, conflicts) = collect_edits(plan, &groups, &mut options)?;
        let mut root = root.clone();
        let (applied, cas_failures) = apply_edits(&mut root, edits, &mut options);
        Ok((
            root,
            EditReport {
                applied,
                conflicts,
                cas_failures,
            },
        ))
    }
}

/// One successful search branch, detached from the engine: bindings plus
/// the sites that produced them.
#[derive(Clone, Debug)]
pub struct Solution {
    env: IndexMap<String, Binding>,
    sites: IndexMap<String, Vec<Site>>,
}

impl Solution {
    pub(crate) fn from_sol(sol: &Sol<'_>) -> Self {
        Solution {
            env: sol.env.clone(),
            sites: sol.sites.clone(),
        }
    }

    /// The value bound to `name` (leading sigil accepted).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.binding(name).map(Binding::value)
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.env.get(strip_sigil(name))
    }

    /// User bindings, in bind order; the internal whole-match binding is
    /// omitted.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.env
            .iter()
            .filter(|(name, _)| name.as_str() != "0")
            .map(|(name, binding)| (name.as_str(), binding))
    }

    /// The sites recorded for one binding.
    pub fn sites(&self, name: &str) -> &[Site] {
        self.sites
            .get(strip_sigil(name))
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn site_zero(&self) -> Option<&Site> {
        self.sites.get("0").and_then(|sites| sites.first())
    }
}

fn strip_sigil(name: &str) -> &str {
    name.strip_prefix(['$', '@', '%']).unwrap_or(name)
}
