//! Edit application with compare-and-set semantics.
//!
//! Order of application: scalar overwrites and key renames (deepest path
//! first, so child edits land before a parent overwrite), then
//! object-slice swaps, then array splices (per array, left-to-right with
//! a running offset), and a root replacement last.

use tendril_core::{Map, Path, Value};

use crate::engine::Site;

use super::plan::{CasAction, CasFailure, Edit, EditOptions};

pub(crate) fn apply_edits(
    root: &mut Value,
    edits: Vec<Edit>,
    options: &mut EditOptions,
) -> (usize, Vec<CasFailure>) {
    let mut scalars: Vec<Edit> = Vec::new();
    let mut renames: Vec<Edit> = Vec::new();
    let mut swaps: Vec<Edit> = Vec::new();
    let mut splices: Vec<Edit> = Vec::new();
    let mut root_edit: Option<Edit> = None;

    for edit in edits {
        match &edit.site {
            Site::Scalar { path, .. } if path.is_root() => root_edit = Some(edit),
            Site::Scalar { .. } => scalars.push(edit),
            Site::Key { .. } => renames.push(edit),
            Site::ObjectSlice { .. } => swaps.push(edit),
            Site::ArraySlice { .. } => splices.push(edit),
        }
    }

    scalars.sort_by(|a, b| {
        b.site
            .path()
            .len()
            .cmp(&a.site.path().len())
            .then_with(|| a.site.path().cmp(b.site.path()))
    });
    renames.sort_by(|a, b| b.site.path().len().cmp(&a.site.path().len()));
    // Left-to-right order within each array keeps splice offsets simple.
    splices.sort_by(|a, b| {
        let (pa, sa) = splice_key(&a.site);
        let (pb, sb) = splice_key(&b.site);
        pa.cmp(pb).then(sa.cmp(&sb))
    });

    let mut applied = 0;
    let mut failures = Vec::new();

    for edit in scalars {
        apply_scalar(root, edit, options, &mut applied, &mut failures);
    }
    for edit in renames {
        apply_rename(root, edit, options, &mut applied, &mut failures);
    }
    for edit in swaps {
        apply_swap(root, edit, options, &mut applied, &mut failures);
    }
    apply_splices(root, splices, options, &mut applied, &mut failures);
    if let Some(edit) = root_edit {
        apply_scalar(root, edit, options, &mut applied, &mut failures);
    }

    (applied, failures)
}

fn splice_key(site: &Site) -> (&Path, usize) {
    match site {
        Site::ArraySlice { path, start, .. } => (path, *start),
        _ => unreachable!("splice_key on non-slice site"),
    }
}

fn decide(options: &mut EditOptions, failure: &CasFailure) -> CasAction {
    match options.on_cas_failure.as_mut() {
        Some(f) => f(failure),
        None => CasAction::Skip,
    }
}

fn apply_scalar(
    root: &mut Value,
    edit: Edit,
    options: &mut EditOptions,
    applied: &mut usize,
    failures: &mut Vec<CasFailure>,
) {
    let Site::Scalar { path, value: expected } = &edit.site else {
        unreachable!("scalar apply on non-scalar site");
    };
    match path.get_mut(root) {
        Some(slot) if slot.deep_eq(expected) => {
            *slot = edit.value;
            *applied += 1;
        }
        Some(slot) => {
            let failure = CasFailure {
                site: edit.site.clone(),
                expected: expected.clone(),
                actual: Some(slot.clone()),
                attempted: edit.value.clone(),
            };
            if decide(options, &failure) == CasAction::Force {
                *path.get_mut(root).expect("path resolved above") = edit.value;
                *applied += 1;
            }
            failures.push(failure);
        }
        None => {
            failures.push(CasFailure {
                site: edit.site.clone(),
                expected: expected.clone(),
                actual: None,
                attempted: edit.value,
            });
        }
    }
}

fn apply_rename(
    root: &mut Value,
    edit: Edit,
    options: &mut EditOptions,
    applied: &mut usize,
    failures: &mut Vec<CasFailure>,
) {
    let Site::Key { path, key } = &edit.site else {
        unreachable!("rename apply on non-key site");
    };
    let Value::Str(new_name) = &edit.value else {
        unreachable!("rename value shape-checked to a string");
    };

    let map = match path.get_mut(root) {
        Some(Value::Map(map)) => map,
        _ => {
            failures.push(CasFailure {
                site: edit.site.clone(),
                expected: Value::Str(key.clone()),
                actual: None,
                attempted: edit.value.clone(),
            });
            return;
        }
    };

    if new_name == key {
        *applied += 1;
        return;
    }

    // CAS: the captured key must still exist, and the target name must be
    // free.
    let sound = map.contains_key(key) && !map.contains_key(new_name);
    if !sound {
        let failure = CasFailure {
            site: edit.site.clone(),
            expected: Value::Str(key.clone()),
            actual: map.get(key).cloned(),
            attempted: edit.value.clone(),
        };
        if decide(options, &failure) != CasAction::Force {
            failures.push(failure);
            return;
        }
        failures.push(failure);
        if !map.contains_key(key) {
            return;
        }
    }

    // Rebuild to rename in place, preserving key order.
    let renamed: Map = map
        .drain(..)
        .map(|(k, v)| {
            if k == *key {
                (new_name.clone(), v)
            } else {
                (k, v)
            }
        })
        .collect();
    *map = renamed;
    *applied += 1;
}

fn apply_swap(
    root: &mut Value,
    edit: Edit,
    options: &mut EditOptions,
    applied: &mut usize,
    failures: &mut Vec<CasFailure>,
) {
    let Site::ObjectSlice {
        path,
        keys,
        values: expected,
    } = &edit.site
    else {
        unreachable!("swap apply on non-object-slice site");
    };
    let Value::Map(replacement) = &edit.value else {
        unreachable!("swap value shape-checked to a mapping");
    };

    let map = match path.get_mut(root) {
        Some(Value::Map(map)) => map,
        _ => {
            failures.push(CasFailure {
                site: edit.site.clone(),
                expected: Value::Map(expected.clone()),
                actual: None,
                attempted: edit.value.clone(),
            });
            return;
        }
    };

    let intact = keys
        .iter()
        .all(|k| map.get(k).is_some_and(|v| v.deep_eq(&expected[k.as_str()])));
    if !intact {
        let actual: Map = keys
            .iter()
            .filter_map(|k| map.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        let failure = CasFailure {
            site: edit.site.clone(),
            expected: Value::Map(expected.clone()),
            actual: Some(Value::Map(actual)),
            attempted: edit.value.clone(),
        };
        if decide(options, &failure) != CasAction::Force {
            failures.push(failure);
            return;
        }
        failures.push(failure);
    }

    for key in keys {
        map.shift_remove(key);
    }
    // Order of newly written keys is unspecified; they append here.
    for (key, value) in replacement {
        map.insert(key.clone(), value.clone());
    }
    *applied += 1;
}

fn apply_splices(
    root: &mut Value,
    splices: Vec<Edit>,
    options: &mut EditOptions,
    applied: &mut usize,
    failures: &mut Vec<CasFailure>,
) {
    let mut current_path: Option<Path> = None;
    let mut offset: i64 = 0;

    for edit in splices {
        let Site::ArraySlice {
            path,
            start,
            end,
            values: expected,
        } = &edit.site
        else {
            unreachable!("splice apply on non-array-slice site");
        };
        let Value::Seq(replacement) = &edit.value else {
            unreachable!("splice value shape-checked to a sequence");
        };

        // The running offset resets per array.
        if current_path.as_ref() != Some(path) {
            current_path = Some(path.clone());
            offset = 0;
        }

        let items = match path.get_mut(root) {
            Some(Value::Seq(items)) => items,
            _ => {
                failures.push(CasFailure {
                    site: edit.site.clone(),
                    expected: Value::Seq(expected.clone()),
                    actual: None,
                    attempted: edit.value.clone(),
                });
                continue;
            }
        };

        let s = (*start as i64 + offset).max(0) as usize;
        let e = (*end as i64 + offset).max(0) as usize;
        let intact = e <= items.len()
            && s <= e
            && items[s..e].len() == expected.len()
            && items[s..e].iter().zip(expected).all(|(a, b)| a.deep_eq(b));

        if !intact {
            let actual = if s <= e && e <= items.len() {
                Some(Value::Seq(items[s..e].to_vec()))
            } else {
                None
            };
            let failure = CasFailure {
                site: edit.site.clone(),
                expected: Value::Seq(expected.clone()),
                actual,
                attempted: edit.value.clone(),
            };
            if decide(options, &failure) != CasAction::Force {
                failures.push(failure);
                continue;
            }
            failures.push(failure);
        }

        let s = s.min(items.len());
        let e = e.clamp(s, items.len());
        items.splice(s..e, replacement.iter().cloned());
        offset += replacement.len() as i64 - (e - s) as i64;
    }
}
