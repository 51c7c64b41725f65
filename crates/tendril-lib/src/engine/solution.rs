//! Branch state threaded through the search.
//!
//! A [`Sol`] is cloned at every branch point; a failed branch simply drops
//! its clone, so no branch can observe another's writes. Bindings are
//! monotone within a branch: a bound name only re-binds to a deep-equal
//! value.

use indexmap::IndexMap;

use tendril_core::{Map, Path, Value};

use crate::parser::ast::{Expr, SliceKind};

/// What a variable name is bound to.
#[derive(Clone, Debug)]
pub enum Binding {
    Scalar(Value),
    /// A slice binding keeps its kind; it never degrades into a plain
    /// container whose kind must be re-inferred.
    Slice(SliceKind, Value),
}

impl Binding {
    pub fn value(&self) -> &Value {
        match self {
            Binding::Scalar(v) | Binding::Slice(_, v) => v,
        }
    }

    pub fn slice_kind(&self) -> Option<SliceKind> {
        match self {
            Binding::Scalar(_) => None,
            Binding::Slice(kind, _) => Some(*kind),
        }
    }

    fn same(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Scalar(a), Binding::Scalar(b)) => a.deep_eq(b),
            (Binding::Slice(ka, a), Binding::Slice(kb, b)) => ka == kb && a.deep_eq(b),
            _ => false,
        }
    }
}

/// A structural reference back into the input, recorded at bind time.
#[derive(Clone, Debug)]
pub enum Site {
    /// A whole node; `value` is what was observed there.
    Scalar { path: Path, value: Value },
    /// A key position inside the mapping at `path`.
    Key { path: Path, key: String },
    /// A contiguous range `[start, end)` of the sequence at `path`.
    ArraySlice {
        path: Path,
        start: usize,
        end: usize,
        values: Vec<Value>,
    },
    /// A key-set of the mapping at `path`.
    ObjectSlice {
        path: Path,
        keys: Vec<String>,
        values: Map,
    },
}

/// Identity of a site: the coordinates without the observed values.
/// Occurrence grouping and edit deduplication both key on this.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SiteKey {
    Scalar(Path),
    Key(Path, String),
    Array(Path, usize, usize),
    Object(Path, Vec<String>),
}

impl Site {
    pub fn path(&self) -> &Path {
        match self {
            Site::Scalar { path, .. }
            | Site::Key { path, .. }
            | Site::ArraySlice { path, .. }
            | Site::ObjectSlice { path, .. } => path,
        }
    }

    pub(crate) fn key(&self) -> SiteKey {
        match self {
            Site::Scalar { path, .. } => SiteKey::Scalar(path.clone()),
            Site::Key { path, key } => SiteKey::Key(path.clone(), key.clone()),
            Site::ArraySlice {
                path, start, end, ..
            } => SiteKey::Array(path.clone(), *start, *end),
            Site::ObjectSlice { path, keys, .. } => SiteKey::Object(path.clone(), keys.clone()),
        }
    }
}

/// A guard whose variables were not all bound when it was attached.
#[derive(Clone, Debug)]
pub(crate) struct PendingGuard<'p> {
    pub expr: &'p Expr,
    /// The `_` node captured where the guard was written.
    pub anon: Value,
    pub required: Vec<String>,
}

/// A bucket frame scope: an explicit `§label` or an iterating term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FrameScope {
    Label(String),
    Term,
}

#[derive(Clone, Debug)]
pub(crate) enum Bucket {
    Arr(Vec<Value>),
    Obj(Map),
}

impl Bucket {
    fn kind(&self) -> SliceKind {
        match self {
            Bucket::Arr(_) => SliceKind::Array,
            Bucket::Obj(_) => SliceKind::Object,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Bucket::Arr(items) => Value::Seq(items),
            Bucket::Obj(map) => Value::Map(map),
        }
    }
}

/// One entry on the bucket stack.
#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub scope: FrameScope,
    pub buckets: IndexMap<String, Bucket>,
    /// The key the enclosing iteration is currently visiting, if any.
    pub observed_key: Option<String>,
}

/// One search branch: bindings, sites, deferred guards, bucket frames.
#[derive(Clone, Debug, Default)]
pub struct Sol<'p> {
    pub(crate) env: IndexMap<String, Binding>,
    pub(crate) sites: IndexMap<String, Vec<Site>>,
    pub(crate) guards: Vec<PendingGuard<'p>>,
    pub(crate) frames: Vec<Frame>,
}

impl<'p> Sol<'p> {
    pub fn new() -> Self {
        Sol::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.env.get(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn sites(&self, name: &str) -> &[Site] {
        self.sites.get(name).map_or(&[], Vec::as_slice)
    }

    /// Binds `name`, recording `site` if given. Returns false on a
    /// conflict with an unequal existing binding.
    pub(crate) fn bind(&mut self, name: &str, binding: Binding, site: Option<Site>) -> bool {
        match self.env.get(name) {
            Some(existing) if !existing.same(&binding) => return false,
            Some(_) => {}
            None => {
                self.env.insert(name.to_owned(), binding);
            }
        }
        if let Some(site) = site {
            self.sites.entry(name.to_owned()).or_default().push(site);
        }
        true
    }

    /// Names currently bound; used to roll key-side bindings back.
    pub(crate) fn bound_names(&self) -> Vec<String> {
        self.env.keys().cloned().collect()
    }

    /// Drops bindings (and their sites) introduced after `before` was
    /// taken; rolls one key iteration's bindings back.
    pub(crate) fn retain_names(&mut self, before: &std::collections::HashSet<String>) {
        self.env.retain(|name, _| before.contains(name));
        self.sites.retain(|name, _| before.contains(name));
    }

    // --- Frames ---

    pub(crate) fn push_frame(&mut self, scope: FrameScope) {
        self.frames.push(Frame {
            scope,
            buckets: IndexMap::new(),
            observed_key: None,
        });
    }

    /// Pops the innermost frame and finalizes its buckets into group
    /// bindings. Returns false if a bucket collides with an unequal
    /// existing binding or a guard fails.
    pub(crate) fn pop_frame_bind(&mut self) -> bool {
        let frame = self.frames.pop().expect("frame stack underflow");
        for (name, bucket) in frame.buckets {
            let kind = bucket.kind();
            if !self.bind(&name, Binding::Slice(kind, bucket.into_value()), None) {
                return false;
            }
        }
        self.check_guards()
    }

    /// Updates the observed key on the innermost term frame and, when the
    /// clause's object is labelled, on that label's frame.
    pub(crate) fn set_observed(&mut self, key: &str, object_label: Option<&str>) {
        for frame in self.frames.iter_mut().rev() {
            if frame.scope == FrameScope::Term {
                frame.observed_key = Some(key.to_owned());
                break;
            }
        }
        if let Some(label) = object_label {
            for frame in self.frames.iter_mut().rev() {
                if matches!(&frame.scope, FrameScope::Label(name) if name == label) {
                    frame.observed_key = Some(key.to_owned());
                    break;
                }
            }
        }
    }

    /// Appends `value` into a bucket. The frame is the named label's, or
    /// the innermost term frame when no label is given. Returns false when
    /// no frame resolves, an object bucket has no observed key, or a key
    /// collides (strict policy).
    pub(crate) fn flow_into(
        &mut self,
        bucket: &str,
        kind: SliceKind,
        label: Option<&str>,
        value: Value,
    ) -> bool {
        let Some(frame) = self.find_frame(label) else {
            return false;
        };

        match kind {
            SliceKind::Array => {
                let entry = frame
                    .buckets
                    .entry(bucket.to_owned())
                    .or_insert_with(|| Bucket::Arr(Vec::new()));
                match entry {
                    Bucket::Arr(items) => items.push(value),
                    Bucket::Obj(_) => return false,
                }
            }
            SliceKind::Object => {
                let Some(key) = frame.observed_key.clone() else {
                    return false;
                };
                let entry = frame
                    .buckets
                    .entry(bucket.to_owned())
                    .or_insert_with(|| Bucket::Obj(Map::new()));
                match entry {
                    Bucket::Obj(map) => {
                        if map.contains_key(&key) {
                            return false;
                        }
                        map.insert(key, value);
                    }
                    Bucket::Arr(_) => return false,
                }
            }
        }
        true
    }

    /// Appends an explicit entry (from a collect directive) into a bucket
    /// at the named label's frame.
    pub(crate) fn collect_into(
        &mut self,
        bucket: &str,
        kind: SliceKind,
        label: &str,
        key: Option<String>,
        value: Value,
    ) -> bool {
        let Some(frame) = self.find_frame(Some(label)) else {
            return false;
        };
        match (kind, key) {
            (SliceKind::Array, None) => {
                let entry = frame
                    .buckets
                    .entry(bucket.to_owned())
                    .or_insert_with(|| Bucket::Arr(Vec::new()));
                match entry {
                    Bucket::Arr(items) => items.push(value),
                    Bucket::Obj(_) => return false,
                }
            }
            (SliceKind::Object, Some(key)) => {
                let entry = frame
                    .buckets
                    .entry(bucket.to_owned())
                    .or_insert_with(|| Bucket::Obj(Map::new()));
                match entry {
                    Bucket::Obj(map) => {
                        if map.contains_key(&key) {
                            return false;
                        }
                        map.insert(key, value);
                    }
                    Bucket::Arr(_) => return false,
                }
            }
            _ => return false,
        }
        true
    }

    fn find_frame(&mut self, label: Option<&str>) -> Option<&mut Frame> {
        match label {
            Some(name) => self
                .frames
                .iter_mut()
                .rev()
                .find(|f| matches!(&f.scope, FrameScope::Label(n) if n == name)),
            None => self
                .frames
                .iter_mut()
                .rev()
                .find(|f| f.scope == FrameScope::Term),
        }
    }

    // --- Guards ---

    /// Attaches a guard. Evaluates immediately when its variables are all
    /// bound, defers it otherwise. Returns false if it fails now.
    pub(crate) fn attach_guard(&mut self, expr: &'p Expr, anon: Value) -> bool {
        let required = expr.free_vars();
        self.guards.push(PendingGuard {
            expr,
            anon,
            required,
        });
        self.check_guards()
    }

    /// Evaluates every deferred guard whose variables are now bound.
    /// Returns false as soon as one fails.
    pub(crate) fn check_guards(&mut self) -> bool {
        let mut i = 0;
        while i < self.guards.len() {
            let ready = self.guards[i]
                .required
                .iter()
                .all(|name| self.env.contains_key(name));
            if !ready {
                i += 1;
                continue;
            }
            let guard = self.guards.remove(i);
            if !super::guard::holds(guard.expr, &self.env, &guard.anon) {
                return false;
            }
        }
        true
    }

    /// True when no guard is left waiting for a variable; emission-time
    /// requirement.
    pub(crate) fn guards_settled(&self) -> bool {
        self.guards.is_empty()
    }
}
