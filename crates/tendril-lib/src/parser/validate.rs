//! Post-parse validation: one walk over the AST.
//!
//! Checks the cross-cutting rules the grammar cannot express: where
//! directives may appear, how `^label` references resolve, and that
//! binding and bucket names are used with one sigil and one scope each.

use std::collections::HashMap;

use text_size::TextRange;

use crate::diagnostics::Diagnostics;
use crate::parser::ast::{Clause, Crumb, Pat, PatNode, SliceKind, Term, TermNode};

/// Where a pattern sits; several constructs are position-restricted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ctx {
    /// The whole pattern.
    Top,
    /// A sequence element or run member.
    Element,
    /// An object term's value.
    Value,
    /// An object term's key or a breadcrumb key.
    Key,
}

/// How a name binds; one name gets exactly one sigil.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sigil {
    Scalar,
    Array,
    Object,
}

impl Sigil {
    fn of(kind: SliceKind) -> Sigil {
        match kind {
            SliceKind::Array => Sigil::Array,
            SliceKind::Object => Sigil::Object,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Sigil::Scalar => "`$`",
            Sigil::Array => "`@`",
            Sigil::Object => "`%`",
        }
    }
}

/// A scope a flow can land in: an explicit label or an iterating term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ScopeId {
    Label(String),
    Term(u32),
}

#[derive(Clone, Debug)]
enum Scope {
    /// `§name` on a container; `keyed` when the container is an object.
    Label { name: String, keyed: bool },
    /// An iterating object term.
    Term { id: u32 },
}

struct Validator {
    diagnostics: Diagnostics,
    scopes: Vec<Scope>,
    names: HashMap<String, (Sigil, TextRange)>,
    buckets: HashMap<String, (SliceKind, ScopeId, TextRange)>,
    next_term_id: u32,
}

/// Runs every validation rule over `root`, collecting diagnostics.
pub fn validate(root: &PatNode) -> Diagnostics {
    let mut v = Validator {
        diagnostics: Diagnostics::new(),
        scopes: Vec::new(),
        names: HashMap::new(),
        buckets: HashMap::new(),
        next_term_id: 0,
    };
    v.walk_pat(root, Ctx::Top);
    v.diagnostics
}

impl Validator {
    fn walk_pat(&mut self, node: &PatNode, ctx: Ctx) {
        match &node.pat {
            Pat::Any
            | Pat::TypedAny(_)
            | Pat::Num(_)
            | Pat::Str(_)
            | Pat::StrCi(_)
            | Pat::Regex(_)
            | Pat::Bool(_)
            | Pat::Null
            | Pat::RootKey => {}

            Pat::Bind { name, pat, .. } => {
                self.register_name(name, Sigil::Scalar, node.span);
                self.walk_pat(pat, ctx);
            }

            Pat::GroupBind { name, kind, pat } => {
                if ctx != Ctx::Element {
                    self.diagnostics
                        .error("slice binding outside a sequence", node.span)
                        .emit();
                } else if *kind == SliceKind::Object {
                    self.diagnostics
                        .error("a sequence slice binds with `as @name`, not `as %name`", node.span)
                        .emit();
                }
                self.register_name(name, Sigil::of(*kind), node.span);
                self.walk_pat(pat, Ctx::Element);
            }

            Pat::Guarded { pat, .. } => self.walk_pat(pat, ctx),

            Pat::Alt { alts, .. } => {
                for alt in alts {
                    self.walk_pat(alt, ctx);
                }
            }

            Pat::Quant { pat, .. } => {
                if ctx != Ctx::Element {
                    self.diagnostics
                        .error("quantifier outside a sequence", node.span)
                        .emit();
                }
                self.walk_pat(pat, Ctx::Element);
            }

            Pat::Spread { .. } => {
                if ctx != Ctx::Element {
                    self.diagnostics
                        .error("`...` outside a sequence", node.span)
                        .emit();
                }
            }

            Pat::Group(items) => {
                if ctx != Ctx::Element {
                    self.diagnostics
                        .error("sequence group outside a sequence", node.span)
                        .emit();
                }
                for item in items {
                    self.walk_pat(item, Ctx::Element);
                }
            }

            Pat::Look { pat, .. } => {
                if ctx != Ctx::Element {
                    self.diagnostics
                        .error("lookahead outside a sequence", node.span)
                        .emit();
                }
                self.walk_pat(pat, Ctx::Element);
            }

            Pat::Arr(arr) => {
                let pushed = self.push_label(arr.label.as_deref(), false, node.span);
                for item in &arr.items {
                    self.walk_pat(item, Ctx::Element);
                }
                self.pop_scopes(pushed);
            }

            Pat::Obj(obj) => {
                let pushed = self.push_label(obj.label.as_deref(), true, node.span);
                for term in &obj.terms {
                    self.walk_term(term);
                }
                if let crate::parser::ast::Remnant::Named(name) = &obj.remnant {
                    self.register_name(name, Sigil::Object, node.span);
                }
                self.pop_scopes(pushed);
            }

            Pat::Flow {
                pat,
                bucket,
                kind,
                label,
            } => {
                self.walk_pat(pat, ctx);
                self.resolve_flow(bucket, *kind, label.as_deref(), node.span);
            }

            Pat::Collect {
                pat,
                key,
                bucket,
                kind,
                label,
                ..
            } => {
                self.walk_pat(pat, ctx);
                self.resolve_collect(bucket, *kind, key.is_some(), label, node.span);
            }

            Pat::Slice { pat, .. } => {
                if ctx != Ctx::Top {
                    self.diagnostics
                        .error("slice-find marker allowed only on a whole pattern", node.span)
                        .emit();
                }
                self.walk_pat(pat, Ctx::Value);
            }
        }
    }

    fn walk_term(&mut self, term: &TermNode) {
        match &term.term {
            Term::Clause(clause) => self.walk_clause(clause, term.span),
            Term::Group(terms) => {
                for t in terms {
                    self.walk_term(t);
                }
            }
            Term::GroupBind { name, terms } => {
                self.register_name(name, Sigil::Object, term.span);
                for t in terms {
                    self.walk_term(t);
                }
            }
            Term::Look { terms, .. } => {
                for t in terms {
                    self.walk_term(t);
                }
            }
        }
    }

    fn walk_clause(&mut self, clause: &Clause, span: TextRange) {
        if clause.count.is_some() && clause.optional {
            self.diagnostics
                .error("a term takes either `#{m,n}` or `?`, not both", span)
                .emit();
        }

        let id = self.next_term_id;
        self.next_term_id += 1;
        self.scopes.push(Scope::Term { id });

        self.walk_pat(&clause.key, Ctx::Key);
        for crumb in &clause.crumbs {
            match crumb {
                Crumb::Dot(key) | Crumb::Skip(key) => self.walk_pat(key, Ctx::Key),
                Crumb::Index(_) => {}
            }
        }
        self.walk_pat(&clause.value, Ctx::Value);

        self.scopes.pop();
    }

    // --- Scope helpers ---

    fn push_label(&mut self, label: Option<&str>, keyed: bool, span: TextRange) -> bool {
        let Some(name) = label else {
            return false;
        };
        if self.find_label(name).is_some() {
            self.diagnostics
                .error(format!("label `\u{00A7}{name}` is already declared"), span)
                .emit();
        }
        self.scopes.push(Scope::Label {
            name: name.to_owned(),
            keyed,
        });
        true
    }

    fn pop_scopes(&mut self, pushed: bool) {
        if pushed {
            self.scopes.pop();
        }
    }

    fn find_label(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().rev().find(|scope| {
            matches!(scope, Scope::Label { name: n, .. } if n == name)
        })
    }

    fn innermost_term(&self) -> Option<u32> {
        self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Term { id } => Some(*id),
            Scope::Label { .. } => None,
        })
    }

    // --- Directive resolution ---

    fn resolve_flow(
        &mut self,
        bucket: &str,
        kind: SliceKind,
        label: Option<&str>,
        span: TextRange,
    ) {
        let scope = match label {
            Some(name) => match self.find_label(name) {
                None => {
                    self.diagnostics
                        .error(
                            format!("label `^{name}` is not declared on an enclosing container"),
                            span,
                        )
                        .emit();
                    return;
                }
                Some(Scope::Label { keyed, .. }) => {
                    if kind == SliceKind::Object && !*keyed {
                        self.diagnostics
                            .error(
                                format!(
                                    "object bucket `%{bucket}` needs an object scope, \
                                     but `\u{00A7}{name}` labels a sequence"
                                ),
                                span,
                            )
                            .emit();
                        return;
                    }
                    ScopeId::Label(name.to_owned())
                }
                Some(Scope::Term { .. }) => unreachable!("find_label returns labels"),
            },
            None => match self.innermost_term() {
                Some(id) => ScopeId::Term(id),
                None => {
                    self.diagnostics
                        .error(
                            "flow has no enclosing iterating term; add an explicit `<^label>`",
                            span,
                        )
                        .emit();
                    return;
                }
            },
        };
        self.register_bucket(bucket, kind, scope, span);
    }

    fn resolve_collect(
        &mut self,
        bucket: &str,
        kind: SliceKind,
        has_key: bool,
        label: &str,
        span: TextRange,
    ) {
        match (has_key, kind) {
            (true, SliceKind::Array) => {
                self.diagnostics
                    .error("collecting `$k:$v` pairs needs an object bucket (`%name`)", span)
                    .emit();
            }
            (false, SliceKind::Object) => {
                self.diagnostics
                    .error("collecting bare values needs an array bucket (`@name`)", span)
                    .emit();
            }
            _ => {}
        }

        if self.find_label(label).is_none() {
            self.diagnostics
                .error(
                    format!("label `^{label}` is not declared on an enclosing container"),
                    span,
                )
                .emit();
            return;
        }
        self.register_bucket(bucket, kind, ScopeId::Label(label.to_owned()), span);
    }

    // --- Name registries ---

    fn register_name(&mut self, name: &str, sigil: Sigil, span: TextRange) {
        match self.names.get(name) {
            Some((existing, first)) if *existing != sigil => {
                let first = *first;
                let existing = *existing;
                self.diagnostics
                    .error(
                        format!(
                            "name `{name}` is used with both {} and {}",
                            existing.describe(),
                            sigil.describe()
                        ),
                        span,
                    )
                    .related_to("first use here", first)
                    .emit();
            }
            Some(_) => {}
            None => {
                self.names.insert(name.to_owned(), (sigil, span));
            }
        }
    }

    fn register_bucket(&mut self, bucket: &str, kind: SliceKind, scope: ScopeId, span: TextRange) {
        self.register_name(bucket, Sigil::of(kind), span);
        match self.buckets.get(bucket) {
            Some((existing_kind, _, first)) if *existing_kind != kind => {
                let first = *first;
                self.diagnostics
                    .error(
                        format!(
                            "bucket `{bucket}` is used as both `{}` and `{}`",
                            existing_kind.sigil(),
                            kind.sigil()
                        ),
                        span,
                    )
                    .related_to("first use here", first)
                    .emit();
            }
            Some((_, existing_scope, first)) if *existing_scope != scope => {
                let first = *first;
                self.diagnostics
                    .error(
                        format!("bucket `{bucket}` flows into two different scopes"),
                        span,
                    )
                    .related_to("first use here", first)
                    .emit();
            }
            Some(_) => {}
            None => {
                self.buckets.insert(bucket.to_owned(), (kind, scope, span));
            }
        }
    }
}
