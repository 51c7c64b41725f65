//! Compact s-expression dump of the pattern tree, for tests and
//! debugging. One line, fully parenthesized, deterministic.

use std::fmt::Write;

use super::ast::{
    BinaryOp, CallFunc, Clause, Counted, Crumb, Expr, Pat, PatNode, QuantMode, Remnant, Term,
    TermNode, UnaryOp,
};

impl PatNode {
    pub fn dump(&self) -> String {
        let mut out = String::new();
        write_pat(&mut out, self);
        out
    }
}

fn write_pat(out: &mut String, node: &PatNode) {
    match &node.pat {
        Pat::Any => out.push('_'),
        Pat::TypedAny(kind) => {
            let _ = write!(out, "_{}", kind.name());
        }
        Pat::Num(n) => {
            let _ = write!(out, "{}", fmt_num(*n));
        }
        Pat::Str(s) => {
            let _ = write!(out, "{s:?}");
        }
        Pat::StrCi(s) => {
            let _ = write!(out, "{s:?}/i");
        }
        Pat::Regex(rx) => {
            let _ = write!(out, "/{}/{}", rx.source, rx.flags);
        }
        Pat::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Pat::Null => out.push_str("null"),
        Pat::RootKey => out.push_str("**"),
        Pat::Bind { name, pat, guard } => {
            let _ = write!(out, "(bind ${name} ");
            write_pat(out, pat);
            if let Some(expr) = guard {
                out.push_str(" where ");
                write_expr(out, expr);
            }
            out.push(')');
        }
        Pat::GroupBind { name, kind, pat } => {
            let _ = write!(out, "(slice {}{name} ", kind.sigil());
            write_pat(out, pat);
            out.push(')');
        }
        Pat::Guarded { pat, guard } => {
            out.push_str("(guard ");
            write_pat(out, pat);
            out.push_str(" where ");
            write_expr(out, guard);
            out.push(')');
        }
        Pat::Alt { alts, prioritized } => {
            out.push_str(if *prioritized { "(else" } else { "(alt" });
            for alt in alts {
                out.push(' ');
                write_pat(out, alt);
            }
            out.push(')');
        }
        Pat::Quant { pat, count, mode } => {
            let mode = match mode {
                QuantMode::Greedy => "greedy",
                QuantMode::Lazy => "lazy",
                QuantMode::Possessive => "possessive",
            };
            let _ = write!(out, "(quant {mode} {} ", fmt_count(*count));
            write_pat(out, pat);
            out.push(')');
        }
        Pat::Spread { count } => match count {
            Some(count) => {
                let _ = write!(out, "(spread {})", fmt_count(*count));
            }
            None => out.push_str("(spread)"),
        },
        Pat::Group(items) => {
            out.push_str("(run");
            for item in items {
                out.push(' ');
                write_pat(out, item);
            }
            out.push(')');
        }
        Pat::Look { negated, pat } => {
            out.push_str(if *negated { "(look! " } else { "(look " });
            write_pat(out, pat);
            out.push(')');
        }
        Pat::Arr(arr) => {
            out.push_str("(arr");
            if let Some(label) = &arr.label {
                let _ = write!(out, " \u{00A7}{label}");
            }
            for item in &arr.items {
                out.push(' ');
                write_pat(out, item);
            }
            out.push(')');
        }
        Pat::Obj(obj) => {
            out.push_str("(obj");
            if let Some(label) = &obj.label {
                let _ = write!(out, " \u{00A7}{label}");
            }
            for term in &obj.terms {
                out.push(' ');
                write_term(out, term);
            }
            let _ = write!(out, " {})", fmt_remnant(&obj.remnant));
        }
        Pat::Flow {
            pat,
            bucket,
            kind,
            label,
        } => {
            out.push_str("(flow ");
            write_pat(out, pat);
            let _ = write!(out, " ->{}{bucket}", kind.sigil());
            if let Some(label) = label {
                let _ = write!(out, " ^{label}");
            }
            out.push(')');
        }
        Pat::Collect {
            pat,
            key,
            value,
            bucket,
            kind,
            label,
        } => {
            out.push_str("(collect ");
            write_pat(out, pat);
            out.push(' ');
            if let Some(key) = key {
                let _ = write!(out, "${key}:");
            }
            let _ = write!(out, "${value} in {}{bucket} across ^{label})", kind.sigil());
        }
        Pat::Slice { kind, pat } => {
            let _ = write!(out, "(find-slice {} ", kind.sigil());
            write_pat(out, pat);
            out.push(')');
        }
    }
}

fn write_term(out: &mut String, node: &TermNode) {
    match &node.term {
        Term::Clause(clause) => write_clause(out, clause),
        Term::Group(terms) => {
            out.push_str("(group");
            for term in terms {
                out.push(' ');
                write_term(out, term);
            }
            out.push(')');
        }
        Term::GroupBind { name, terms } => {
            let _ = write!(out, "(slice %{name}");
            for term in terms {
                out.push(' ');
                write_term(out, term);
            }
            out.push(')');
        }
        Term::Look { negated, terms } => {
            out.push_str(if *negated { "(look!" } else { "(look" });
            for term in terms {
                out.push(' ');
                write_term(out, term);
            }
            out.push(')');
        }
    }
}

fn write_clause(out: &mut String, clause: &Clause) {
    out.push_str("(term");
    if clause.strong {
        out.push_str(" each");
    }
    out.push(' ');
    write_pat(out, &clause.key);
    for crumb in &clause.crumbs {
        match crumb {
            Crumb::Dot(key) => {
                out.push_str(" .");
                write_pat(out, key);
            }
            Crumb::Index(index) => {
                let _ = write!(out, " [{index}]");
            }
            Crumb::Skip(key) => {
                out.push_str(" **");
                write_pat(out, key);
            }
        }
    }
    if let Some(count) = clause.count {
        let _ = write!(out, " #{}", fmt_count(count));
    }
    if clause.optional {
        out.push('?');
    }
    out.push_str(" : ");
    write_pat(out, &clause.value);
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Num(n) => {
            let _ = write!(out, "{}", fmt_num(*n));
        }
        Expr::Str(s) => {
            let _ = write!(out, "{s:?}");
        }
        Expr::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Expr::Null => out.push_str("null"),
        Expr::Var(name) => {
            let _ = write!(out, "${name}");
        }
        Expr::Anon => out.push('_'),
        Expr::Unary { op, expr } => {
            let op = match op {
                UnaryOp::Not => "!",
                UnaryOp::Neg => "-",
            };
            let _ = write!(out, "({op} ");
            write_expr(out, expr);
            out.push(')');
        }
        Expr::Binary { op, lhs, rhs } => {
            let op = match op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Rem => "%",
                BinaryOp::Lt => "<",
                BinaryOp::Gt => ">",
                BinaryOp::Le => "<=",
                BinaryOp::Ge => ">=",
                BinaryOp::Eq => "==",
                BinaryOp::Ne => "!=",
                BinaryOp::And => "&&",
                BinaryOp::Or => "||",
            };
            let _ = write!(out, "({op} ");
            write_expr(out, lhs);
            out.push(' ');
            write_expr(out, rhs);
            out.push(')');
        }
        Expr::Call { func, arg } => {
            let func = match func {
                CallFunc::Number => "number",
                CallFunc::String => "string",
                CallFunc::Boolean => "boolean",
                CallFunc::Size => "size",
            };
            let _ = write!(out, "({func} ");
            write_expr(out, arg);
            out.push(')');
        }
    }
}

fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < (i64::MAX as f64) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn fmt_count(count: Counted) -> String {
    match count.max {
        Some(max) if count.min == max => format!("{{{}}}", max),
        Some(max) => format!("{{{},{}}}", count.min, max),
        None => format!("{{{},}}", count.min),
    }
}

fn fmt_remnant(remnant: &Remnant) -> String {
    match remnant {
        Remnant::Closed => "closed".to_owned(),
        Remnant::AssertEmpty => "(!%)".to_owned(),
        Remnant::NonEmpty => "%".to_owned(),
        Remnant::Any => "%?".to_owned(),
        Remnant::Count(count) => format!("%#{}", fmt_count(*count)),
        Remnant::Named(name) => format!("(% as %{name})"),
    }
}
