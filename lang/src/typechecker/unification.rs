/**
Unification for Pal

Normalization, and the unification problem that solves holes. Each
step reduces both sides in the current context and then tries, in
order: alpha-equivalence, a pattern application of a hole on either
side, a bare hole on either side, the universe as a wildcard, matching
application spines, and matching binders. When nothing applies the
problem waits for the holes it mentions, or fails if there are none.
*/
use crate::ast::ops::{alpha_equiv, free_holes, free_vars, is_rigid, occurs, subst};
use crate::ast::{Expr, FnKind, Id, IdSet, fresh_in, is_hole};
use crate::typechecker::context::{Ann, Ctx};
use crate::typechecker::errors::{CheckError, CheckResult};
use crate::typechecker::problem::{
    BoxProblem, Judgment, Problem, Step, combine, factory, map, scoped,
};
use log::trace;

/// Full normal form: unfold defined names, beta-reduce, reduce under binders
pub fn reduce(ctx: &Ctx, expr: &Expr) -> Expr {
    normalize(ctx, expr, &mut Vec::new(), Unfold::All)
}

/// Replace solved holes by their solutions, leaving other names alone
pub fn zonk(ctx: &Ctx, expr: &Expr) -> Expr {
    normalize(ctx, expr, &mut Vec::new(), Unfold::Holes)
}

#[derive(Clone, Copy, PartialEq)]
enum Unfold {
    All,
    Holes,
}

fn normalize(ctx: &Ctx, expr: &Expr, bound: &mut Vec<Id>, unfold: Unfold) -> Expr {
    match expr {
        Expr::Var { id, .. } => {
            if bound.contains(id) || (unfold == Unfold::Holes && !is_hole(id)) {
                return expr.clone();
            }
            match ctx.value_of(id) {
                // `Type = Type`: stop rather than loop
                Some(value) if value.is_universe() => {
                    if is_hole(id) {
                        Expr::universe()
                    } else {
                        expr.clone()
                    }
                }
                Some(value) => normalize(ctx, value, bound, unfold),
                None => expr.clone(),
            }
        }
        Expr::App {
            implicit,
            func,
            arg,
            loc,
        } => {
            let func = normalize(ctx, func, bound, unfold);
            let arg = normalize(ctx, arg, bound, unfold);
            match func {
                Expr::Fn {
                    arg_id: Some(arg_id),
                    result,
                    ..
                } => normalize(ctx, &subst(&result, &arg_id, &arg), bound, unfold),
                Expr::Fn {
                    arg_id: None,
                    result,
                    ..
                } => *result,
                func => Expr::App {
                    implicit: *implicit,
                    func: Box::new(func),
                    arg: Box::new(arg),
                    loc: *loc,
                },
            }
        }
        Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type,
            result,
            loc,
        } => {
            let arg_type = normalize(ctx, arg_type, bound, unfold);
            let result = match arg_id {
                Some(id) => {
                    bound.push(id.clone());
                    let result = normalize(ctx, result, bound, unfold);
                    bound.pop();
                    result
                }
                None => normalize(ctx, result, bound, unfold),
            };
            Expr::Fn {
                kind: *kind,
                implicit: *implicit,
                arg_id: arg_id.clone(),
                arg_type: Box::new(arg_type),
                result: Box::new(result),
                loc: *loc,
            }
        }
    }
}

/// Make `expected` and `actual` equal, both of type `ty`
///
/// The result's value is the unified term.
pub fn unify(ty: Expr, expected: Expr, actual: Expr) -> BoxProblem {
    Box::new(Unify {
        ty,
        expected,
        actual,
        delegate: None,
    })
}

struct Unify {
    ty: Expr,
    expected: Expr,
    actual: Expr,
    /// Set once the problem has been handed to a more specific one
    delegate: Option<BoxProblem>,
}

/// How two application spines relate
enum Spines {
    /// Same rigid head; argument pairs outermost first
    Rigid {
        head: Expr,
        args: Vec<(bool, Expr, Expr)>,
    },
    /// Heads are rigid and differ
    Mismatch,
    /// A head still mentions a hole
    Flexible,
}

impl Problem<Judgment> for Unify {
    fn step(&mut self, ctx: Ctx) -> CheckResult<Step<Judgment>> {
        if let Some(delegate) = &mut self.delegate {
            return delegate.step(ctx);
        }

        let expected = reduce(&ctx, &self.expected);
        let actual = reduce(&ctx, &self.actual);
        trace!("unify {expected} ~ {actual}");

        if alpha_equiv(&expected, &actual) {
            return Ok(self.done(ctx, actual));
        }

        if let Some((hole, params)) = pattern(&ctx, &actual) {
            return solve_pattern(ctx, &self.ty, hole, params, expected);
        }
        if pattern(&ctx, &expected).is_some() {
            return self.swap(ctx);
        }

        if let Some(hole) = unsolved_hole(&ctx, &actual) {
            let hole = hole.to_string();
            return solve_hole(ctx, &self.ty, &hole, expected);
        }
        if unsolved_hole(&ctx, &expected).is_some() {
            return self.swap(ctx);
        }

        if expected.is_universe() {
            return Ok(self.done(ctx, actual));
        }
        if actual.is_universe() {
            return Ok(self.done(ctx, expected));
        }

        match (&expected, &actual) {
            (Expr::App { .. }, Expr::App { .. }) => match match_spines(&expected, &actual) {
                Spines::Rigid { head, args } => {
                    return self.delegate(ctx, unify_spines(self.ty.clone(), head, args));
                }
                Spines::Mismatch => {
                    return Err(Box::new(CheckError::RigidMismatch { expected, actual }));
                }
                Spines::Flexible => {}
            },
            (
                Expr::Fn {
                    kind: ek,
                    implicit: ei,
                    ..
                },
                Expr::Fn {
                    kind: ak,
                    implicit: ai,
                    ..
                },
            ) => {
                if ek != ak || ei != ai {
                    return Err(Box::new(CheckError::KindMismatch { expected, actual }));
                }
                let problem = unify_fn(self.ty.clone(), &expected, &actual);
                return self.delegate(ctx, problem);
            }
            _ => {}
        }

        let needs: IdSet = free_holes(&expected)
            .into_iter()
            .chain(free_holes(&actual))
            .collect();
        if needs.is_empty() {
            return Err(Box::new(CheckError::CannotUnify { expected, actual }));
        }

        self.expected = expected;
        self.actual = actual;
        Ok(Step::Blocked {
            ctx,
            value: Judgment::new(self.ty.clone(), self.actual.clone()),
            needs,
        })
    }
}

impl Unify {
    fn done(&self, ctx: Ctx, value: Expr) -> Step<Judgment> {
        Step::Done {
            ctx,
            value: Judgment::new(self.ty.clone(), value),
        }
    }

    fn swap(&mut self, ctx: Ctx) -> CheckResult<Step<Judgment>> {
        let problem = unify(self.ty.clone(), self.actual.clone(), self.expected.clone());
        self.delegate(ctx, problem)
    }

    fn delegate(&mut self, ctx: Ctx, problem: BoxProblem) -> CheckResult<Step<Judgment>> {
        self.delegate.insert(problem).step(ctx)
    }
}

fn unsolved_hole<'a>(ctx: &Ctx, expr: &'a Expr) -> Option<&'a str> {
    expr.as_hole().filter(|hole| !ctx.is_solved(hole))
}

fn solve_hole(ctx: Ctx, ty: &Expr, hole: &str, value: Expr) -> CheckResult<Step<Judgment>> {
    if occurs(&value, hole) {
        return Err(Box::new(CheckError::Cycle {
            hole: hole.to_string(),
            expr: value,
        }));
    }
    trace!("solve {hole} := {value}");
    let mut ctx = ctx;
    ctx.solve(hole, ty.clone(), value.clone());
    Ok(Step::Done {
        ctx,
        value: Judgment::new(ty.clone(), value),
    })
}

/// An unsolved hole applied to distinct binder parameters, e.g.
/// `_r(x, y)`; yields the hole and the arguments outermost first
fn pattern<'a>(ctx: &Ctx, expr: &'a Expr) -> Option<(&'a str, Vec<(bool, &'a str)>)> {
    let (head, args) = expr.spine();
    let hole = unsolved_hole(ctx, head)?;
    if args.is_empty() {
        return None;
    }

    let mut params: Vec<(bool, &str)> = Vec::with_capacity(args.len());
    for (implicit, arg) in args {
        let id = arg.as_var()?;
        if is_hole(id) || !ctx.is_bound(id) || params.iter().any(|(_, seen)| *seen == id) {
            return None;
        }
        params.push((implicit, id));
    }
    Some((hole, params))
}

/// `_r(x, y) := e` becomes `_r := (x){(y){e}}`
fn solve_pattern(
    ctx: Ctx,
    ty: &Expr,
    hole: &str,
    params: Vec<(bool, &str)>,
    expected: Expr,
) -> CheckResult<Step<Judgment>> {
    if occurs(&expected, hole) {
        return Err(Box::new(CheckError::Cycle {
            hole: hole.to_string(),
            expr: expected,
        }));
    }

    let mut solution = expected.clone();
    for (implicit, id) in params {
        let arg_type = ctx
            .get(id)
            .map(|ann| ann.ty.clone())
            .unwrap_or_else(Expr::universe);
        solution = Expr::func(FnKind::Def, implicit, Some(id.to_string()), arg_type, solution);
    }

    trace!("solve {hole} := {solution}");
    let mut ctx = ctx;
    ctx.solve(hole, ty.clone(), solution);
    Ok(Step::Done {
        ctx,
        value: Judgment::new(ty.clone(), expected),
    })
}

/// Walk both spines in step while either side still mentions a hole
fn match_spines(expected: &Expr, actual: &Expr) -> Spines {
    let mut left = expected;
    let mut right = actual;
    let mut args = Vec::new();

    loop {
        if is_rigid(left) && is_rigid(right) {
            return if alpha_equiv(left, right) {
                Spines::Rigid {
                    head: left.clone(),
                    args,
                }
            } else {
                Spines::Mismatch
            };
        }

        match (left, right) {
            (
                Expr::App {
                    implicit: li,
                    func: lf,
                    arg: la,
                    ..
                },
                Expr::App {
                    implicit: ri,
                    func: rf,
                    arg: ra,
                    ..
                },
            ) if li == ri => {
                args.push((*li, la.as_ref().clone(), ra.as_ref().clone()));
                left = lf;
                right = rf;
            }
            _ => return Spines::Flexible,
        }
    }
}

/// Unify arguments pairwise under a shared head, then rebuild the application
fn unify_spines(ty: Expr, head: Expr, args: Vec<(bool, Expr, Expr)>) -> BoxProblem {
    let implicits: Vec<bool> = args.iter().map(|(implicit, _, _)| *implicit).collect();
    let factories = args
        .into_iter()
        .map(|(_, expected, actual)| factory(move |_| unify(Expr::universe(), expected, actual)))
        .collect();

    map(combine(factories), move |results| {
        let value = implicits
            .iter()
            .zip(results)
            .rev()
            .fold(head.clone(), |func, (implicit, arg)| {
                Expr::app(*implicit, func, arg.value)
            });
        Judgment::new(ty.clone(), value)
    })
}

/// Binders of the same kind: unify argument types, then results under a
/// shared name for the argument
fn unify_fn(ty: Expr, expected: &Expr, actual: &Expr) -> BoxProblem {
    let (
        Expr::Fn {
            kind,
            implicit,
            arg_id: expected_id,
            arg_type: expected_type,
            result: expected_result,
            ..
        },
        Expr::Fn {
            arg_id: actual_id,
            arg_type: actual_type,
            result: actual_result,
            ..
        },
    ) = (expected, actual)
    else {
        return unify(ty, expected.clone(), actual.clone());
    };

    let taken: IdSet = free_vars(expected)
        .into_iter()
        .chain(free_vars(actual))
        .collect();
    let rename = |result: &Expr, from: &Option<Id>, to: &Id| match from {
        Some(from) => subst(result, from, &Expr::var(to.clone())),
        None => result.clone(),
    };
    let arg_id = match (expected_id, actual_id) {
        (Some(id), _) | (None, Some(id)) => Some(fresh_in(|c| taken.contains(c), id)),
        (None, None) => None,
    };
    let (expected_result, actual_result) = match &arg_id {
        Some(fresh) => (
            rename(expected_result, expected_id, fresh),
            rename(actual_result, actual_id, fresh),
        ),
        None => (
            expected_result.as_ref().clone(),
            actual_result.as_ref().clone(),
        ),
    };

    let (kind, implicit) = (*kind, *implicit);
    let (expected_type, actual_type) = (expected_type.as_ref().clone(), actual_type.as_ref().clone());
    let scope_id = arg_id.clone();

    let problem = combine(vec![
        factory(move |_| unify(Expr::universe(), expected_type, actual_type)),
        factory(move |prev: &[Judgment]| {
            let ann = Ann::binder(prev[0].value.clone());
            scoped(
                scope_id,
                ann,
                unify(Expr::universe(), expected_result, actual_result),
            )
        }),
    ]);

    map(problem, move |results| {
        let value = Expr::func(
            kind,
            implicit,
            arg_id.clone(),
            results[0].value.clone(),
            results[1].value.clone(),
        );
        Judgment::new(ty.clone(), value)
    })
}
