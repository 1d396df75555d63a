/**
Suspendable judgments

A problem is a piece of checking work that may need to wait for holes
to be solved. Each call to `step` runs it as far as it can go with the
current context and reports either a finished value or a partial value
together with the holes it is waiting on. Problems are composed with
`combine`, which re-runs a sub-problem only when one of the holes it
waits on has been solved since.
*/
use crate::ast::{Expr, Id, IdSet};
use crate::typechecker::context::{Ann, Ctx};
use crate::typechecker::errors::CheckResult;

/// An elaborated term and its type
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub ty: Expr,
    pub value: Expr,
}

impl Judgment {
    pub fn new(ty: Expr, value: Expr) -> Self {
        Judgment { ty, value }
    }
}

/// Outcome of running a problem once
#[derive(Debug, Clone)]
pub enum Step<T> {
    /// Waiting on `needs`; `value` is the best result so far
    Blocked { ctx: Ctx, value: T, needs: IdSet },
    Done { ctx: Ctx, value: T },
}

impl<T> Step<T> {
    pub fn ctx(&self) -> &Ctx {
        match self {
            Step::Blocked { ctx, .. } | Step::Done { ctx, .. } => ctx,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Step::Blocked { value, .. } | Step::Done { value, .. } => value,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Step::Blocked { ctx, value, needs } => Step::Blocked {
                ctx,
                value: f(value),
                needs,
            },
            Step::Done { ctx, value } => Step::Done {
                ctx,
                value: f(value),
            },
        }
    }

    pub fn map_ctx(self, f: impl FnOnce(&mut Ctx)) -> Step<T> {
        match self {
            Step::Blocked {
                mut ctx,
                value,
                needs,
            } => {
                f(&mut ctx);
                Step::Blocked { ctx, value, needs }
            }
            Step::Done { mut ctx, value } => {
                f(&mut ctx);
                Step::Done { ctx, value }
            }
        }
    }
}

pub trait Problem<T> {
    /// Advance as far as the context allows
    fn step(&mut self, ctx: Ctx) -> CheckResult<Step<T>>;
}

pub type BoxProblem<T = Judgment> = Box<dyn Problem<T>>;

/// Builds a sub-problem from the partial results of the ones before it
pub type Factory<T> = Box<dyn FnOnce(&[T]) -> BoxProblem<T>>;

pub fn factory<T>(f: impl FnOnce(&[T]) -> BoxProblem<T> + 'static) -> Factory<T> {
    Box::new(f)
}

/// Already solved
pub fn trivial<T: Clone + 'static>(value: T) -> BoxProblem<T> {
    Box::new(Trivial(value))
}

struct Trivial<T>(T);

impl<T: Clone> Problem<T> for Trivial<T> {
    fn step(&mut self, ctx: Ctx) -> CheckResult<Step<T>> {
        Ok(Step::Done {
            ctx,
            value: self.0.clone(),
        })
    }
}

/// Transform every value `inner` produces, partial ones included
pub fn map<T: 'static, U: 'static>(
    inner: BoxProblem<T>,
    f: impl FnMut(T) -> U + 'static,
) -> BoxProblem<U> {
    Box::new(Map {
        inner,
        f: Box::new(f),
    })
}

struct Map<T, U> {
    inner: BoxProblem<T>,
    f: Box<dyn FnMut(T) -> U>,
}

impl<T, U> Problem<U> for Map<T, U> {
    fn step(&mut self, ctx: Ctx) -> CheckResult<Step<U>> {
        let step = self.inner.step(ctx)?;
        Ok(step.map(&mut self.f))
    }
}

/// Run `inner` with `id` bound to `ann`
///
/// Whatever `id` meant before is restored in every context handed back.
pub fn scoped<T: 'static>(id: Option<Id>, ann: Ann, inner: BoxProblem<T>) -> BoxProblem<T> {
    match id {
        Some(id) => Box::new(Scoped { id, ann, inner }),
        None => inner,
    }
}

struct Scoped<T> {
    id: Id,
    ann: Ann,
    inner: BoxProblem<T>,
}

impl<T> Problem<T> for Scoped<T> {
    fn step(&mut self, mut ctx: Ctx) -> CheckResult<Step<T>> {
        let shadowed = ctx.insert(self.id.clone(), self.ann.clone());
        let step = self.inner.step(ctx)?;
        let id = &self.id;
        Ok(step.map_ctx(|ctx| match shadowed {
            Some(ann) => {
                ctx.insert(id.clone(), ann);
            }
            None => {
                ctx.remove(id);
            }
        }))
    }
}

/// Run sub-problems side by side in one shared context
///
/// Each factory sees the current results of the factories before it.
/// The combined problem is done when all parts are; while blocked it
/// waits on the union of what its parts wait on.
pub fn combine<T: Clone + 'static>(factories: Vec<Factory<T>>) -> BoxProblem<Vec<T>> {
    Box::new(Combine {
        pending: factories,
        parts: Vec::new(),
        results: Vec::new(),
    })
}

struct Part<T> {
    problem: BoxProblem<T>,
    done: bool,
    needs: IdSet,
}

struct Combine<T> {
    pending: Vec<Factory<T>>,
    parts: Vec<Part<T>>,
    results: Vec<T>,
}

impl<T: Clone> Combine<T> {
    fn record(&mut self, index: usize, step: Step<T>) -> Ctx {
        let part = &mut self.parts[index];
        let (ctx, value) = match step {
            Step::Blocked { ctx, value, needs } => {
                part.needs = needs;
                (ctx, value)
            }
            Step::Done { ctx, value } => {
                part.done = true;
                part.needs.clear();
                (ctx, value)
            }
        };
        if index < self.results.len() {
            self.results[index] = value;
        } else {
            self.results.push(value);
        }
        ctx
    }
}

impl<T: Clone> Problem<Vec<T>> for Combine<T> {
    fn step(&mut self, mut ctx: Ctx) -> CheckResult<Step<Vec<T>>> {
        for index in 0..self.parts.len() {
            let part = &mut self.parts[index];
            if part.done || !part.needs.iter().any(|hole| ctx.is_solved(hole)) {
                continue;
            }
            let step = part.problem.step(ctx)?;
            ctx = self.record(index, step);
        }

        for factory in std::mem::take(&mut self.pending) {
            let mut problem = factory(&self.results);
            let step = problem.step(ctx)?;
            self.parts.push(Part {
                problem,
                done: false,
                needs: IdSet::new(),
            });
            ctx = self.record(self.parts.len() - 1, step);
        }

        let needs: IdSet = self
            .parts
            .iter()
            .flat_map(|part| part.needs.iter().cloned())
            .collect();
        let value = self.results.clone();

        if self.parts.iter().all(|part| part.done) {
            Ok(Step::Done { ctx, value })
        } else {
            Ok(Step::Blocked { ctx, value, needs })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Waits on `hole`; once solved, reports its value
    struct Await {
        hole: Id,
    }

    impl Problem<Expr> for Await {
        fn step(&mut self, ctx: Ctx) -> CheckResult<Step<Expr>> {
            match ctx.value_of(&self.hole).cloned() {
                Some(value) => Ok(Step::Done { ctx, value }),
                None => {
                    let value = Expr::var(self.hole.clone());
                    let needs = IdSet::from([self.hole.clone()]);
                    Ok(Step::Blocked { ctx, value, needs })
                }
            }
        }
    }

    /// Solves `hole` with `value` on its first step
    struct Solve {
        hole: Id,
        value: Expr,
    }

    impl Problem<Expr> for Solve {
        fn step(&mut self, mut ctx: Ctx) -> CheckResult<Step<Expr>> {
            ctx.solve(&self.hole, Expr::universe(), self.value.clone());
            Ok(Step::Done {
                ctx,
                value: self.value.clone(),
            })
        }
    }

    fn holes_ctx() -> Ctx {
        let mut ctx = Ctx::new();
        ctx.insert("_a".into(), Ann::of_type(Expr::universe()));
        ctx.insert("_b".into(), Ann::of_type(Expr::universe()));
        ctx
    }

    #[test]
    fn test_combine_unblocks_earlier_part() {
        let mut problem = combine::<Expr>(vec![
            factory(|_| Box::new(Await { hole: "_a".into() })),
            factory(|_| {
                Box::new(Solve {
                    hole: "_a".into(),
                    value: Expr::var("Nat"),
                })
            }),
        ]);

        let step = problem.step(holes_ctx()).unwrap();
        let Step::Blocked { ctx, value, needs } = step else {
            panic!("first round should block on _a");
        };
        assert_eq!(needs, IdSet::from(["_a".to_string()]));
        assert_eq!(value[0].as_var(), Some("_a"));

        let step = problem.step(ctx).unwrap();
        assert!(step.is_done());
        assert_eq!(step.value()[0].as_var(), Some("Nat"));
        assert_eq!(step.value()[1].as_var(), Some("Nat"));
    }

    #[test]
    fn test_combine_factories_see_earlier_results() {
        let mut problem = combine::<Expr>(vec![
            factory(|_| trivial(Expr::var("x"))),
            factory(|prev: &[Expr]| {
                trivial(Expr::app(false, Expr::var("f"), prev[0].clone()))
            }),
        ]);

        let step = problem.step(Ctx::new()).unwrap();
        assert!(step.is_done());
        assert_eq!(
            step.value()[1],
            Expr::app(false, Expr::var("f"), Expr::var("x"))
        );
    }

    #[test]
    fn test_blocked_part_is_not_rerun_without_progress() {
        let mut problem = combine::<Expr>(vec![
            factory(|_| Box::new(Await { hole: "_a".into() })),
            factory(|_| Box::new(Await { hole: "_b".into() })),
        ]);

        let step = problem.step(holes_ctx()).unwrap();
        let Step::Blocked { needs, ctx, .. } = step else {
            panic!("expected block");
        };
        assert_eq!(needs.len(), 2);

        let step = problem.step(ctx).unwrap();
        assert!(!step.is_done());
    }

    #[test]
    fn test_map_applies_to_partial_values() {
        let mut problem = map(Box::new(Await { hole: "_a".into() }), |e: Expr| {
            Expr::app(false, Expr::var("g"), e)
        });

        let step = problem.step(holes_ctx()).unwrap();
        assert!(!step.is_done());
        assert_eq!(
            *step.value(),
            Expr::app(false, Expr::var("g"), Expr::var("_a"))
        );
    }

    #[test]
    fn test_scoped_restores_shadowed_binding() {
        struct Peek;
        impl Problem<Expr> for Peek {
            fn step(&mut self, ctx: Ctx) -> CheckResult<Step<Expr>> {
                let value = ctx.get("x").map(|ann| ann.ty.clone()).unwrap();
                Ok(Step::Done { ctx, value })
            }
        }

        let mut ctx = Ctx::new();
        ctx.insert("x".into(), Ann::of_type(Expr::var("Outer")));

        let mut problem = scoped(
            Some("x".into()),
            Ann::of_type(Expr::var("Inner")),
            Box::new(Peek),
        );
        let step = problem.step(ctx).unwrap();

        assert_eq!(step.value().as_var(), Some("Inner"));
        assert_eq!(step.ctx().get("x").unwrap().ty.as_var(), Some("Outer"));
    }

    #[test]
    fn test_scoped_removes_fresh_binding() {
        let mut problem = scoped(
            Some("y".into()),
            Ann::of_type(Expr::universe()),
            trivial(Expr::var("y")),
        );
        let step = problem.step(Ctx::new()).unwrap();
        assert!(!step.ctx().contains("y"));
    }
}
