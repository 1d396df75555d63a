/**
Core type checker for Pal

Bidirectional elaboration. Every expression form becomes a problem
that infers a judgment (type and elaborated value); `check` pairs that
with a unification against the expected type when there is one. Holes
met along the way are solved by unification, possibly out of order,
by the scheduling in `combine`.
*/
use crate::ast::ops::{free_holes, free_vars, subst};
use crate::ast::{Binding, Expr, FnKind, Id, IdSet, Module, Program, SourceLoc, is_hole};
use crate::typechecker::context::{Ann, Ctx};
use crate::typechecker::errors::{CheckError, CheckResult, ProgramError};
use crate::typechecker::problem::{
    BoxProblem, Judgment, Problem, Step, combine, factory, map, scoped, trivial,
};
use crate::typechecker::unification::{unify, zonk};
use log::{debug, trace};

/// Parameter name of the function type synthesized for an application
const APP_ARG: &str = "arg";

/// Infer `expr`, then unify its type with `expected` when given
///
/// The judgment's type is the unified type and its value is the
/// elaborated form of `expr`.
pub fn check(expected: Option<Expr>, expr: Expr) -> BoxProblem {
    trace!("check {expr}");
    let has_expected = expected.is_some();

    let infer: BoxProblem = match expr {
        Expr::Var { id, loc } => Box::new(CheckVar {
            expected: expected.clone(),
            id,
            loc,
            delegate: None,
        }),
        Expr::App {
            implicit,
            func,
            arg,
            loc,
        } => Box::new(CheckApp {
            implicit,
            func: *func,
            arg: *arg,
            loc,
            inner: None,
        }),
        Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type,
            result,
            loc,
        } => check_fn(kind, implicit, arg_id, *arg_type, *result, loc),
    };

    let problem = combine(vec![
        factory(move |_| infer),
        factory(move |prev: &[Judgment]| match expected {
            Some(ty) => unify(Expr::universe(), ty, prev[0].ty.clone()),
            None => trivial(prev[0].clone()),
        }),
    ]);

    map(problem, move |mut results| {
        let unified = results.pop();
        let inferred = results.pop();
        match (inferred, unified) {
            (Some(inferred), Some(unified)) if has_expected => {
                Judgment::new(unified.value, inferred.value)
            }
            (Some(inferred), _) => inferred,
            (None, _) => Judgment::new(Expr::universe(), Expr::universe()),
        }
    })
}

struct CheckVar {
    expected: Option<Expr>,
    id: Id,
    loc: Option<SourceLoc>,
    /// Checks the solution once the hole is solved
    delegate: Option<BoxProblem>,
}

impl Problem<Judgment> for CheckVar {
    fn step(&mut self, ctx: Ctx) -> CheckResult<Step<Judgment>> {
        if let Some(delegate) = &mut self.delegate {
            return delegate.step(ctx);
        }

        let Some(ann) = ctx.get(&self.id) else {
            return Err(Box::new(CheckError::UnknownVar {
                id: self.id.clone(),
                loc: self.loc,
            }));
        };
        let (ty, value) = (ann.ty.clone(), ann.value.clone());
        let var = Expr::Var {
            id: self.id.clone(),
            loc: self.loc,
        };

        if !is_hole(&self.id) {
            let value = value.unwrap_or(var);
            return Ok(Step::Done {
                ctx,
                value: Judgment::new(ty, value),
            });
        }

        match value {
            None => Ok(Step::Blocked {
                ctx,
                value: Judgment::new(ty, var),
                needs: IdSet::from([self.id.clone()]),
            }),
            Some(solution) => {
                let problem = check(self.expected.clone(), solution);
                self.delegate.insert(problem).step(ctx)
            }
        }
    }
}

struct CheckApp {
    implicit: bool,
    func: Expr,
    arg: Expr,
    loc: Option<SourceLoc>,
    /// Built on the first step, once fresh holes can be named
    inner: Option<BoxProblem>,
}

impl Problem<Judgment> for CheckApp {
    fn step(&mut self, mut ctx: Ctx) -> CheckResult<Step<Judgment>> {
        if let Some(inner) = &mut self.inner {
            return inner.step(ctx);
        }

        let arg_type = ctx.introduce("argType", Expr::universe());
        let result_type = ctx.introduce(
            "resultType",
            Expr::func(FnKind::Type, false, None, arg_type.clone(), Expr::universe()),
        );
        let problem = self.problem(arg_type, result_type);
        self.inner.insert(problem).step(ctx)
    }
}

impl CheckApp {
    /// Infer both sides, make the function's type `(arg: A)[R(arg)]`
    /// and the argument's type `A`, then apply
    fn problem(&self, arg_type: Expr, result_type: Expr) -> BoxProblem {
        let (implicit, loc) = (self.implicit, self.loc);
        let (func, arg) = (self.func.clone(), self.arg.clone());
        let pi = Expr::func(
            FnKind::Type,
            implicit,
            Some(APP_ARG.to_string()),
            arg_type.clone(),
            Expr::app(false, result_type.clone(), Expr::var(APP_ARG)),
        );

        let problem = combine(vec![
            factory(move |_| check(None, func)),
            factory(move |_| check(None, arg)),
            factory(move |prev: &[Judgment]| unify(Expr::universe(), prev[0].ty.clone(), pi)),
            factory(move |prev: &[Judgment]| {
                unify(Expr::universe(), arg_type, prev[1].ty.clone())
            }),
        ]);

        map(problem, move |results| {
            let (func, arg) = (&results[0], &results[1]);

            let ty = match &func.ty {
                Expr::Fn { arg_id, result, .. } => instantiate(result, arg_id, &arg.value),
                _ => Expr::app(false, result_type.clone(), arg.value.clone()),
            };
            let value = match &func.value {
                Expr::Fn { arg_id, result, .. } => instantiate(result, arg_id, &arg.value),
                _ => Expr::App {
                    implicit,
                    func: Box::new(func.value.clone()),
                    arg: Box::new(arg.value.clone()),
                    loc,
                },
            };
            Judgment::new(ty, value)
        })
    }
}

fn instantiate(result: &Expr, arg_id: &Option<Id>, value: &Expr) -> Expr {
    match arg_id {
        Some(id) => subst(result, id, value),
        None => result.clone(),
    }
}

/// Check the parameter type against `Type`, then the body with the
/// parameter in scope
fn check_fn(
    kind: FnKind,
    implicit: bool,
    arg_id: Option<Id>,
    arg_type: Expr,
    result: Expr,
    loc: Option<SourceLoc>,
) -> BoxProblem {
    let body_expected = (kind == FnKind::Type).then(Expr::universe);
    let scope_id = arg_id.clone();

    let problem = combine(vec![
        factory(move |_| check(Some(Expr::universe()), arg_type)),
        factory(move |prev: &[Judgment]| {
            let ann = Ann::binder(prev[0].value.clone());
            scoped(scope_id, ann, check(body_expected, result))
        }),
    ]);

    map(problem, move |results| {
        let (param, body) = (&results[0], &results[1]);
        let ty = match kind {
            FnKind::Type => Expr::universe(),
            FnKind::Def => Expr::Fn {
                kind: FnKind::Type,
                implicit,
                arg_id: arg_id.clone(),
                arg_type: Box::new(param.value.clone()),
                result: Box::new(body.ty.clone()),
                loc,
            },
        };
        let value = Expr::Fn {
            kind,
            implicit,
            arg_id: arg_id.clone(),
            arg_type: Box::new(param.value.clone()),
            result: Box::new(body.value.clone()),
            loc,
        };
        Judgment::new(ty, value)
    })
}

/// Result of checking one top-level expression
#[derive(Debug, Clone)]
pub struct Elaborated {
    /// Solution context, holes included
    pub ctx: Ctx,
    /// Judgment with solved holes substituted
    pub judgment: Judgment,
}

/// Check a single expression to completion
///
/// Every free hole `h` is seeded as `h : h_type` with `h_type : Type`.
/// Fails as stuck when a round ends blocked and none of the holes it
/// waits on has been solved.
pub fn check_expr(ctx: &Ctx, expected: Option<&Expr>, expr: &Expr) -> CheckResult<Elaborated> {
    let mut ctx = ctx.clone();
    let mut holes: Vec<Id> = free_holes(expr).into_iter().collect();
    if let Some(ty) = expected {
        holes.extend(free_holes(ty));
    }
    holes.sort();
    holes.dedup();
    for hole in holes {
        if ctx.contains(&hole) {
            continue;
        }
        let hole_type = format!("{hole}_type");
        ctx.insert(hole_type.clone(), Ann::of_type(Expr::universe()));
        ctx.insert(hole, Ann::of_type(Expr::var(hole_type)));
    }

    let mut problem = check(expected.cloned(), expr.clone());
    loop {
        match problem.step(ctx)? {
            Step::Done { ctx, value } => {
                trace!("solved context {ctx}");
                let judgment = Judgment::new(zonk(&ctx, &value.ty), zonk(&ctx, &value.value));
                return Ok(Elaborated { ctx, judgment });
            }
            Step::Blocked { ctx: next, needs, .. } => {
                if !needs.iter().any(|hole| next.is_solved(hole)) {
                    let mut needs: Vec<Id> = needs.into_iter().collect();
                    needs.sort();
                    debug!("stuck on {needs:?}");
                    return Err(Box::new(CheckError::Stuck { needs }));
                }
                ctx = next;
            }
        }
    }
}

/// The program-level checker
///
/// Modules are checked in order. Inside a module each binding sees
/// the bindings before it; the module's bindings become visible to
/// later modules once the whole module has checked.
pub struct TypeChecker {
    global: Ctx,
}

impl TypeChecker {
    /// Create a checker whose global context holds only `Type`
    pub fn new() -> Self {
        TypeChecker {
            global: Ctx::global(),
        }
    }

    pub fn global(&self) -> &Ctx {
        &self.global
    }

    pub fn into_global(self) -> Ctx {
        self.global
    }

    /// Type check a complete program, stopping at the first failure
    pub fn check_program(&mut self, program: &Program) -> Result<(), ProgramError> {
        for module in program {
            self.check_module(module)?;
        }
        Ok(())
    }

    fn check_module(&mut self, module: &Module) -> Result<(), ProgramError> {
        let mut internal = self.global.clone();
        let mut external = Vec::with_capacity(module.len());

        for binding in module {
            debug!("checking `{}`", binding.id);
            let (inside, outside) =
                check_binding(&internal, binding).map_err(|error| ProgramError {
                    binding: binding.id.clone(),
                    error,
                })?;
            internal.insert(binding.id.clone(), inside);
            external.push((binding.id.clone(), outside));
        }

        for (id, ann) in external {
            self.global.insert(id, ann);
        }
        Ok(())
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Entries for a binding: one for the rest of its module, one for later modules
fn check_binding(internal: &Ctx, binding: &Binding) -> CheckResult<(Ann, Ann)> {
    let declared = match &binding.ty {
        Some(ty) => {
            let checked = check_expr(internal, Some(&Expr::universe()), ty)?;
            let written = back_patch(internal, &checked.ctx, ty)?;
            Some((checked.judgment.value, written))
        }
        None => None,
    };

    match (&binding.value, declared) {
        (Some(value), declared) => {
            let expected = declared.as_ref().map(|(elaborated, _)| elaborated);
            let checked = check_expr(internal, expected, value)?;
            let Judgment { ty, value } = checked.judgment;
            let exported = declared.map(|(_, written)| written).unwrap_or_else(|| ty.clone());
            Ok((Ann::defined(ty, value.clone()), Ann::defined(exported, value)))
        }
        (None, Some((_, written))) => Ok((Ann::of_type(written.clone()), Ann::of_type(written))),
        (None, None) => Err(Box::new(CheckError::MissingType {
            id: binding.id.clone(),
        })),
    }
}

/// The declared type as written, with the holes the check solved filled in
fn back_patch(internal: &Ctx, solved: &Ctx, ty: &Expr) -> CheckResult<Expr> {
    let patched = zonk(solved, ty);
    let mut unsolved: Vec<Id> = free_vars(&patched)
        .into_iter()
        .filter(|id| !internal.contains(id))
        .collect();
    if unsolved.is_empty() {
        return Ok(patched);
    }
    unsolved.sort();
    Err(Box::new(CheckError::Stuck { needs: unsolved }))
}

/// Check a whole program against an empty global context
pub fn check_program(program: &Program) -> Result<Ctx, ProgramError> {
    let mut checker = TypeChecker::new();
    checker.check_program(program)?;
    Ok(checker.into_global())
}
