//! Plan normalization: user replacements to a deduplicated edit list.

use indexmap::IndexMap;

use tendril_core::Value;

use crate::EditError;
use crate::engine::Site;
use crate::engine::solution::SiteKey;
use crate::query::Solution;

/// A replacement for one binding: a literal value, or a function of the
/// solution's public bindings.
pub enum Replacement {
    Value(Value),
    With(Box<dyn Fn(&Solution) -> Value>),
}

/// Maps binding names (leading `$`/`@`/`%` sigils accepted and stripped)
/// to replacements.
#[derive(Default)]
pub struct EditPlan {
    entries: IndexMap<String, Replacement>,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.entries
            .insert(strip_sigil(name).to_owned(), Replacement::Value(value.into()));
        self
    }

    pub fn set_with(mut self, name: &str, f: impl Fn(&Solution) -> Value + 'static) -> Self {
        self.entries
            .insert(strip_sigil(name).to_owned(), Replacement::With(Box::new(f)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &Replacement)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn strip_sigil(name: &str) -> &str {
    name.strip_prefix(['$', '@', '%']).unwrap_or(name)
}

/// Replacement-computation granularity for closure replacements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PerMode {
    /// Once per solution; every site of that solution gets the value.
    #[default]
    Site,
    /// Once per occurrence, fed its first solution.
    Occurrence,
}

/// Two solutions prescribed different values for one site.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub site: Site,
    pub first: Value,
    pub second: Value,
}

/// What to do about a conflict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictAction {
    /// Keep the edit planned first (default).
    #[default]
    KeepFirst,
    /// Replace it with the newly planned value.
    KeepNew,
    /// Drop the site from the edit list entirely.
    Drop,
}

/// The recorded value no longer lives at the site.
#[derive(Debug, Clone)]
pub struct CasFailure {
    pub site: Site,
    pub expected: Value,
    /// What is there now; `None` when the path no longer resolves.
    pub actual: Option<Value>,
    pub attempted: Value,
}

/// What to do about a CAS failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CasAction {
    /// Record the failure and leave the site unchanged (default).
    #[default]
    Skip,
    /// Overwrite anyway.
    Force,
}

/// Options controlling planning and application.
#[derive(Default)]
pub struct EditOptions {
    pub per: PerMode,
    pub(crate) on_conflict: Option<Box<dyn FnMut(&Conflict) -> ConflictAction>>,
    pub(crate) on_cas_failure: Option<Box<dyn FnMut(&CasFailure) -> CasAction>>,
}

impl EditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per(mut self, per: PerMode) -> Self {
        self.per = per;
        self
    }

    pub fn on_conflict(mut self, f: impl FnMut(&Conflict) -> ConflictAction + 'static) -> Self {
        self.on_conflict = Some(Box::new(f));
        self
    }

    pub fn on_cas_failure(mut self, f: impl FnMut(&CasFailure) -> CasAction + 'static) -> Self {
        self.on_cas_failure = Some(Box::new(f));
        self
    }
}

/// What an edit operation did.
#[derive(Debug, Default, Clone)]
pub struct EditReport {
    pub applied: usize,
    pub conflicts: Vec<Conflict>,
    pub cas_failures: Vec<CasFailure>,
}

/// One planned edit.
#[derive(Debug, Clone)]
pub(crate) struct Edit {
    pub site: Site,
    pub value: Value,
}

/// Checks a replacement value against the site kind.
fn check_shape(name: &str, site: &Site, value: &Value) -> Result<(), EditError> {
    let expected = match site {
        Site::Scalar { .. } => return Ok(()),
        Site::Key { .. } => {
            if matches!(value, Value::Str(_)) {
                return Ok(());
            }
            "a string (key rename)"
        }
        Site::ArraySlice { .. } => {
            if matches!(value, Value::Seq(_)) {
                return Ok(());
            }
            "a sequence (array slice)"
        }
        Site::ObjectSlice { .. } => {
            if matches!(value, Value::Map(_)) {
                return Ok(());
            }
            "a mapping (object slice)"
        }
    };
    Err(EditError::ShapeMismatch {
        name: name.to_owned(),
        expected,
        actual: value.kind(),
    })
}

/// Converts sites from `groups` (one entry per occurrence) into a
/// deduplicated edit list.
pub(crate) fn collect_edits(
    plan: &EditPlan,
    groups: &[&[Solution]],
    options: &mut EditOptions,
) -> Result<(Vec<Edit>, Vec<Conflict>), EditError> {
    let mut chosen: IndexMap<SiteKey, Edit> = IndexMap::new();
    let mut conflicts = Vec::new();

    for group in groups {
        for (name, replacement) in plan.entries() {
            // Occurrence granularity computes the value once per group.
            let occurrence_value = match (options.per, replacement) {
                (PerMode::Occurrence, Replacement::With(f)) => group.first().map(f),
                _ => None,
            };

            for solution in *group {
                let value = match replacement {
                    Replacement::Value(v) => v.clone(),
                    Replacement::With(f) => match &occurrence_value {
                        Some(v) => v.clone(),
                        None => f(solution),
                    },
                };

                for site in solution.sites(name) {
                    check_shape(name, site, &value)?;
                    let key = site.key();
                    match chosen.get_mut(&key) {
                        None => {
                            chosen.insert(
                                key,
                                Edit {
                                    site: site.clone(),
                                    value: value.clone(),
                                },
                            );
                        }
                        Some(existing) if existing.value.deep_eq(&value) => {}
                        Some(existing) => {
                            let conflict = Conflict {
                                site: site.clone(),
                                first: existing.value.clone(),
                                second: value.clone(),
                            };
                            let action = match options.on_conflict.as_mut() {
                                Some(f) => f(&conflict),
                                None => ConflictAction::KeepFirst,
                            };
                            conflicts.push(conflict);
                            match action {
                                ConflictAction::KeepFirst => {}
                                ConflictAction::KeepNew => existing.value = value.clone(),
                                ConflictAction::Drop => {
                                    chosen.shift_remove(&key);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    Ok((chosen.into_values().collect(), conflicts))
}
