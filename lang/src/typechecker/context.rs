/**
Typing context for Pal

Maps every name in scope (globals, binders and holes) to its type
and, when known, its value. A hole with a value is solved.
*/
use crate::ast::{Expr, Id, TYPE_ID, fresh_in};
use std::collections::HashMap;
use std::collections::hash_map;

/// Type and optional value of a name in scope
#[derive(Debug, Clone, PartialEq)]
pub struct Ann {
    pub ty: Expr,
    pub value: Option<Expr>,
    /// Introduced by a binder rather than a binding or a hole
    pub bound: bool,
}

impl Ann {
    pub fn of_type(ty: Expr) -> Self {
        Ann {
            ty,
            value: None,
            bound: false,
        }
    }

    pub fn defined(ty: Expr, value: Expr) -> Self {
        Ann {
            ty,
            value: Some(value),
            bound: false,
        }
    }

    /// A parameter in scope while checking a binder's body
    pub fn binder(ty: Expr) -> Self {
        Ann {
            ty,
            value: None,
            bound: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ctx {
    entries: HashMap<Id, Ann>,
}

impl Ctx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding only the universe: `Type : Type = Type`
    pub fn global() -> Self {
        let mut ctx = Ctx::new();
        ctx.insert(
            TYPE_ID.to_string(),
            Ann::defined(Expr::universe(), Expr::universe()),
        );
        ctx
    }

    pub fn get(&self, id: &str) -> Option<&Ann> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn value_of(&self, id: &str) -> Option<&Expr> {
        self.get(id).and_then(|ann| ann.value.as_ref())
    }

    pub fn is_solved(&self, id: &str) -> bool {
        self.value_of(id).is_some()
    }

    /// Whether `id` is a binder parameter, as opposed to a global or a hole
    pub fn is_bound(&self, id: &str) -> bool {
        self.get(id).is_some_and(|ann| ann.bound && ann.value.is_none())
    }

    /// Insert an entry, returning the one it replaced
    pub fn insert(&mut self, id: Id, ann: Ann) -> Option<Ann> {
        self.entries.insert(id, ann)
    }

    pub fn remove(&mut self, id: &str) -> Option<Ann> {
        self.entries.remove(id)
    }

    /// Record a solution for `hole`, keeping its type when it has one
    pub fn solve(&mut self, hole: &str, ty: Expr, value: Expr) {
        match self.entries.get_mut(hole) {
            Some(ann) => ann.value = Some(value),
            None => {
                self.entries.insert(hole.to_string(), Ann::defined(ty, value));
            }
        }
    }

    /// Add a fresh hole named after `label` and return a reference to it
    pub fn introduce(&mut self, label: &str, ty: Expr) -> Expr {
        let id = fresh_in(|c| self.contains(c), &format!("_{label}0"));
        self.insert(id.clone(), Ann::of_type(ty));
        Expr::var(id)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Id, Ann> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_ctx_holds_universe() {
        let ctx = Ctx::global();

        assert_eq!(ctx.len(), 1);
        let ann = ctx.get(TYPE_ID).unwrap();
        assert!(ann.ty.is_universe());
        assert!(ann.value.as_ref().is_some_and(Expr::is_universe));
    }

    #[test]
    fn test_introduce_picks_unused_names() {
        let mut ctx = Ctx::new();
        let a = ctx.introduce("argType", Expr::universe());
        let b = ctx.introduce("argType", Expr::universe());

        assert_eq!(a.as_var(), Some("_argType0"));
        assert_eq!(b.as_var(), Some("_argType1"));
        assert!(!ctx.is_solved("_argType0"));
    }

    #[test]
    fn test_solve_keeps_existing_type() {
        let mut ctx = Ctx::new();
        ctx.insert("_0".into(), Ann::of_type(Expr::var("Nat")));
        ctx.solve("_0", Expr::universe(), Expr::var("zero"));

        let ann = ctx.get("_0").unwrap();
        assert_eq!(ann.ty.as_var(), Some("Nat"));
        assert_eq!(ann.value.as_ref().and_then(Expr::as_var), Some("zero"));
    }

    #[test]
    fn test_only_binders_are_bound() {
        let mut ctx = Ctx::global();
        ctx.insert("zero".into(), Ann::of_type(Expr::var("Nat")));
        ctx.insert("n".into(), Ann::binder(Expr::var("Nat")));

        assert!(ctx.is_bound("n"));
        assert!(!ctx.is_bound("zero"));
        assert!(!ctx.is_bound("missing"));
    }

    #[test]
    fn test_insert_returns_shadowed_entry() {
        let mut ctx = Ctx::new();
        assert!(ctx.insert("x".into(), Ann::of_type(Expr::var("A"))).is_none());
        let old = ctx.insert("x".into(), Ann::of_type(Expr::var("B")));
        assert_eq!(old.map(|a| a.ty), Some(Expr::var("A")));
    }
}
