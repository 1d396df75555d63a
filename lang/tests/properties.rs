use pallang::ast::ops::{alpha_equiv, free_vars, subst};
use pallang::ast::{Binding, Expr, FnKind, Program};
use pallang::parser::{parse_expr, parse_program, tokenize};
use pallang::printer::{PrintOptions, serialize_expr, serialize_program};
use pallang::typechecker::{Ann, CheckError, Ctx, Step, unify};
use proptest::prelude::*;

const NAMES: &[&str] = &["a", "b", "f", "g", "x", "y", "Nat"];

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(NAMES).prop_map(String::from)
}

fn kind() -> impl Strategy<Value = FnKind> {
    prop_oneof![Just(FnKind::Def), Just(FnKind::Type)]
}

/// Arbitrary expressions, holes included
fn expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        4 => name().prop_map(Expr::var),
        1 => Just(Expr::var("_0")),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (any::<bool>(), inner.clone(), inner.clone())
                .prop_map(|(implicit, func, arg)| Expr::app(implicit, func, arg)),
            (
                kind(),
                any::<bool>(),
                prop::option::of(name()),
                inner.clone(),
                inner,
            )
                .prop_map(|(kind, implicit, arg_id, arg_type, result)| {
                    Expr::func(kind, implicit, arg_id, arg_type, result)
                }),
        ]
    })
}

/// Hole-free expressions without redexes
fn rigid_expr() -> impl Strategy<Value = Expr> {
    name().prop_map(Expr::var).prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (any::<bool>(), name(), inner.clone())
                .prop_map(|(implicit, head, arg)| Expr::app(implicit, Expr::var(head), arg)),
            (any::<bool>(), prop::option::of(name()), inner.clone(), inner).prop_map(
                |(implicit, arg_id, arg_type, result)| {
                    Expr::func(FnKind::Type, implicit, arg_id, arg_type, result)
                }
            ),
        ]
    })
}

fn binding() -> impl Strategy<Value = Binding> {
    (name(), prop::option::of(expr()), prop::option::of(expr()))
        .prop_map(|(id, ty, value)| Binding::new(id, ty, value))
}

fn program() -> impl Strategy<Value = Program> {
    prop::collection::vec(prop::collection::vec(binding(), 1..4), 1..3)
}

fn reparse(source: &str) -> Expr {
    parse_expr(tokenize(source)).unwrap()
}

/// Rename every binder, substituting the new name into its scope
fn rename_binders(expr: &Expr) -> Expr {
    match expr {
        Expr::Var { .. } => expr.clone(),
        Expr::App {
            implicit,
            func,
            arg,
            ..
        } => Expr::app(*implicit, rename_binders(func), rename_binders(arg)),
        Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type,
            result,
            ..
        } => {
            let arg_type = rename_binders(arg_type);
            match arg_id {
                Some(id) => {
                    let renamed = format!("{id}r");
                    let result = subst(result, id, &Expr::var(renamed.clone()));
                    Expr::func(*kind, *implicit, Some(renamed), arg_type, rename_binders(&result))
                }
                None => Expr::func(*kind, *implicit, None, arg_type, rename_binders(result)),
            }
        }
    }
}

fn unifies(expected: &Expr, actual: &Expr) -> bool {
    let mut problem = unify(Expr::universe(), expected.clone(), actual.clone());
    matches!(problem.step(Ctx::global()), Ok(Step::Done { .. }))
}

fn hole_ctx() -> Ctx {
    let mut ctx = Ctx::global();
    ctx.insert("_h".into(), Ann::of_type(Expr::universe()));
    ctx
}

proptest! {
    #[test]
    fn prop_printed_expression_reparses_to_same_text(e in expr()) {
        let options = PrintOptions::default();
        let printed = serialize_expr(&e, &options);
        let again = serialize_expr(&reparse(&printed), &options);
        prop_assert_eq!(printed, again);
    }

    #[test]
    fn prop_printed_rigid_expression_reparses_alpha_equivalent(e in rigid_expr()) {
        let printed = serialize_expr(&e, &PrintOptions::default());
        prop_assert!(alpha_equiv(&e, &reparse(&printed)));
    }

    #[test]
    fn prop_program_serialization_is_idempotent(p in program(), line_length in 10usize..100) {
        let options = PrintOptions { line_length, full_hole_names: false };
        let printed = serialize_program(&p, &options);
        let reparsed = parse_program(tokenize(&printed)).unwrap();

        prop_assert_eq!(reparsed.len(), p.len());
        prop_assert_eq!(serialize_program(&reparsed, &options), printed);
    }

    #[test]
    fn prop_renaming_binders_preserves_alpha_equivalence(e in expr()) {
        let renamed = rename_binders(&e);
        prop_assert!(alpha_equiv(&e, &renamed));
        prop_assert!(alpha_equiv(&renamed, &e));
        prop_assert_eq!(free_vars(&e), free_vars(&renamed));
    }

    #[test]
    fn prop_rigid_unification_is_symmetric(a in rigid_expr(), b in rigid_expr()) {
        prop_assert_eq!(unifies(&a, &b), unifies(&b, &a));
        prop_assert_eq!(unifies(&a, &b), alpha_equiv(&a, &b));
    }

    #[test]
    fn prop_rigid_term_unifies_with_itself(a in rigid_expr()) {
        prop_assert!(unifies(&a, &a));
        prop_assert!(unifies(&a, &rename_binders(&a)));
    }

    #[test]
    fn prop_hole_is_solved_by_rigid_term(e in rigid_expr()) {
        let mut problem = unify(Expr::universe(), Expr::var("_h"), e.clone());
        let step = problem.step(hole_ctx()).unwrap();

        let solution = step.ctx().value_of("_h").cloned();
        prop_assert!(step.is_done());
        prop_assert!(solution.is_some_and(|s| alpha_equiv(&s, &e)));
    }

    #[test]
    fn prop_hole_inside_its_solution_is_a_cycle(head in name(), e in rigid_expr()) {
        let actual = Expr::app(false, Expr::app(false, Expr::var(head), e), Expr::var("_h"));
        let mut problem = unify(Expr::universe(), Expr::var("_h"), actual);

        let cycle = match problem.step(hole_ctx()) {
            Err(err) => matches!(*err, CheckError::Cycle { .. }),
            Ok(_) => false,
        };
        prop_assert!(cycle);
    }
}
