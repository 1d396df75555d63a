/**
Structural operations on expressions

Free variables, occurrence checks, capture-avoiding substitution and
alpha-equivalence. None of these consult a context; they work purely
on the syntax tree.
*/
use super::ids::{Id, IdSet, fresh_in, is_hole};
use super::{Expr, SourceLoc};

/// Names occurring free in `expr`, holes included
pub fn free_vars(expr: &Expr) -> IdSet {
    let mut out = IdSet::new();
    collect_free(expr, &mut Vec::new(), &mut out);
    out
}

fn collect_free<'a>(expr: &'a Expr, bound: &mut Vec<&'a str>, out: &mut IdSet) {
    match expr {
        Expr::Var { id, .. } => {
            if !bound.contains(&id.as_str()) {
                out.insert(id.clone());
            }
        }
        Expr::App { func, arg, .. } => {
            collect_free(func, bound, out);
            collect_free(arg, bound, out);
        }
        Expr::Fn {
            arg_id,
            arg_type,
            result,
            ..
        } => {
            collect_free(arg_type, bound, out);
            match arg_id {
                Some(id) => {
                    bound.push(id);
                    collect_free(result, bound, out);
                    bound.pop();
                }
                None => collect_free(result, bound, out),
            }
        }
    }
}

pub fn free_holes(expr: &Expr) -> IdSet {
    free_vars(expr).into_iter().filter(|id| is_hole(id)).collect()
}

/// An expression is rigid when it mentions no free hole
pub fn is_rigid(expr: &Expr) -> bool {
    free_holes(expr).is_empty()
}

/// Does `var` occur free in `expr`?
pub fn occurs(expr: &Expr, var: &str) -> bool {
    match expr {
        Expr::Var { id, .. } => id == var,
        Expr::App { func, arg, .. } => occurs(func, var) || occurs(arg, var),
        Expr::Fn {
            arg_id,
            arg_type,
            result,
            ..
        } => occurs(arg_type, var) || (arg_id.as_deref() != Some(var) && occurs(result, var)),
    }
}

/// Replace free occurrences of `from` with `to`
///
/// A binder whose name is free in `to` is renamed first so that `to`
/// is never captured.
pub fn subst(expr: &Expr, from: &str, to: &Expr) -> Expr {
    match expr {
        Expr::Var { id, .. } => {
            if id == from {
                to.clone()
            } else {
                expr.clone()
            }
        }
        Expr::App {
            implicit,
            func,
            arg,
            loc,
        } => Expr::App {
            implicit: *implicit,
            func: Box::new(subst(func, from, to)),
            arg: Box::new(subst(arg, from, to)),
            loc: *loc,
        },
        Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type,
            result,
            loc,
        } => {
            let arg_type = subst(arg_type, from, to);
            let rebuild = |arg_id: Option<Id>, result: Expr| Expr::Fn {
                kind: *kind,
                implicit: *implicit,
                arg_id,
                arg_type: Box::new(arg_type.clone()),
                result: Box::new(result),
                loc: *loc,
            };

            let result_vars = free_vars(result);
            if !result_vars.contains(from) {
                return rebuild(arg_id.clone(), result.as_ref().clone());
            }

            match arg_id {
                Some(id) if id == from => rebuild(arg_id.clone(), result.as_ref().clone()),
                Some(id) => {
                    let to_vars = free_vars(to);
                    if to_vars.contains(id) {
                        let renamed = fresh_in(
                            |c| to_vars.contains(c) || result_vars.contains(c) || c == from,
                            id,
                        );
                        let result = rename(result, id, &renamed, *loc);
                        rebuild(Some(renamed), subst(&result, from, to))
                    } else {
                        rebuild(arg_id.clone(), subst(result, from, to))
                    }
                }
                None => rebuild(None, subst(result, from, to)),
            }
        }
    }
}

fn rename(expr: &Expr, from: &str, to: &str, loc: Option<SourceLoc>) -> Expr {
    subst(
        expr,
        from,
        &Expr::Var {
            id: to.to_string(),
            loc,
        },
    )
}

/// Structural equality modulo consistent renaming of bound variables
///
/// Positions are ignored. Free variables must match by name.
pub fn alpha_equiv(a: &Expr, b: &Expr) -> bool {
    alpha_equiv_in(a, b, &mut Vec::new(), &mut Vec::new())
}

fn alpha_equiv_in<'a>(
    a: &'a Expr,
    b: &'a Expr,
    bound_a: &mut Vec<Option<&'a str>>,
    bound_b: &mut Vec<Option<&'a str>>,
) -> bool {
    match (a, b) {
        (Expr::Var { id: x, .. }, Expr::Var { id: y, .. }) => {
            let px = bound_a.iter().rposition(|b| *b == Some(x.as_str()));
            let py = bound_b.iter().rposition(|b| *b == Some(y.as_str()));
            px == py && (px.is_some() || x == y)
        }
        (
            Expr::App {
                implicit: ia,
                func: fa,
                arg: aa,
                ..
            },
            Expr::App {
                implicit: ib,
                func: fb,
                arg: ab,
                ..
            },
        ) => {
            ia == ib
                && alpha_equiv_in(fa, fb, bound_a, bound_b)
                && alpha_equiv_in(aa, ab, bound_a, bound_b)
        }
        (
            Expr::Fn {
                kind: ka,
                implicit: ia,
                arg_id: xa,
                arg_type: ta,
                result: ra,
                ..
            },
            Expr::Fn {
                kind: kb,
                implicit: ib,
                arg_id: xb,
                arg_type: tb,
                result: rb,
                ..
            },
        ) => {
            if ka != kb || ia != ib || !alpha_equiv_in(ta, tb, bound_a, bound_b) {
                return false;
            }
            bound_a.push(xa.as_deref());
            bound_b.push(xb.as_deref());
            let same = alpha_equiv_in(ra, rb, bound_a, bound_b);
            bound_a.pop();
            bound_b.pop();
            same
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FnKind;

    fn var(id: &str) -> Expr {
        Expr::var(id)
    }

    fn lam(id: &str, ty: Expr, body: Expr) -> Expr {
        Expr::func(FnKind::Def, false, Some(id.to_string()), ty, body)
    }

    fn pi(id: Option<&str>, ty: Expr, body: Expr) -> Expr {
        Expr::func(FnKind::Type, false, id.map(str::to_string), ty, body)
    }

    fn set(ids: &[&str]) -> IdSet {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_vars_respects_binders() {
        // (x: A){ f(x, y) }
        let e = lam(
            "x",
            var("A"),
            Expr::app(false, Expr::app(false, var("f"), var("x")), var("y")),
        );
        assert_eq!(free_vars(&e), set(&["A", "f", "y"]));
    }

    #[test]
    fn test_binder_does_not_scope_over_its_type() {
        let e = lam("x", var("x"), var("x"));
        assert_eq!(free_vars(&e), set(&["x"]));
    }

    #[test]
    fn test_free_holes() {
        let e = pi(None, var("_0"), Expr::app(false, var("_r"), var("Nat")));
        assert_eq!(free_holes(&e), set(&["_0", "_r"]));
        assert!(!is_rigid(&e));
        assert!(is_rigid(&var("Nat")));
    }

    #[test]
    fn test_occurs_stops_at_shadowing_binder() {
        let e = lam("x", var("A"), var("x"));
        assert!(!occurs(&e, "x"));
        assert!(occurs(&e, "A"));

        let e = lam("x", var("x"), var("y"));
        assert!(occurs(&e, "x"));
    }

    #[test]
    fn test_subst_replaces_free_occurrences() {
        let e = Expr::app(false, var("f"), var("x"));
        let out = subst(&e, "x", &var("y"));
        assert!(alpha_equiv(&out, &Expr::app(false, var("f"), var("y"))));
    }

    #[test]
    fn test_subst_skips_shadowed_body() {
        let e = lam("x", var("x"), var("x"));
        let out = subst(&e, "x", &var("y"));
        assert!(alpha_equiv(&out, &lam("x", var("y"), var("x"))));
    }

    #[test]
    fn test_subst_avoids_capture() {
        // (y: A){ x }[x := y] must not capture the free y
        let e = lam("y", var("A"), var("x"));
        let out = subst(&e, "x", &var("y"));

        match &out {
            Expr::Fn { arg_id, result, .. } => {
                let arg_id = arg_id.as_deref().unwrap();
                assert_ne!(arg_id, "y");
                assert_eq!(result.as_var(), Some("y"));
            }
            other => panic!("expected a binder, got {other:?}"),
        }
        assert_eq!(free_vars(&out), set(&["A", "y"]));
    }

    #[test]
    fn test_alpha_equiv_renaming() {
        let a = lam("x", var("A"), var("x"));
        let b = lam("y", var("A"), var("y"));
        assert!(alpha_equiv(&a, &b));

        let c = lam("y", var("A"), var("x"));
        assert!(!alpha_equiv(&a, &c));
    }

    #[test]
    fn test_alpha_equiv_distinguishes_implicitness_and_kind() {
        let a = Expr::app(false, var("f"), var("x"));
        let b = Expr::app(true, var("f"), var("x"));
        assert!(!alpha_equiv(&a, &b));

        let l = lam("x", var("A"), var("x"));
        let p = pi(Some("x"), var("A"), var("x"));
        assert!(!alpha_equiv(&l, &p));
    }

    #[test]
    fn test_alpha_equiv_anonymous_binder_hides_outer_name() {
        // (x: A)(A)[x] vs (x: A)(y: A)[x]
        let a = pi(Some("x"), var("A"), pi(None, var("A"), var("x")));
        let b = pi(Some("x"), var("A"), pi(Some("y"), var("A"), var("x")));
        assert!(alpha_equiv(&a, &b));
    }
}
