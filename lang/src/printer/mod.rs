/**
Pretty-printer for Pal

Turns syntax trees back into source text the parser accepts. Runs of
same-implicitness applications are printed as one argument list, and
chains of binders as one parameter list. Anything wider than the
remaining columns is broken over several lines.

Holes print as `_` unless `full_hole_names` is set; that mode is for
diagnostics and does not re-parse.
*/
use std::fmt;

use crate::ast::{Binding, Expr, FnKind, Module, Program, is_hole};
use crate::typechecker::Ctx;

pub const DEFAULT_LINE_LENGTH: usize = 80;

pub const MODULE_SEPARATOR: &str = "--------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub line_length: usize,
    pub full_hole_names: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            line_length: DEFAULT_LINE_LENGTH,
            full_hole_names: false,
        }
    }
}

pub fn serialize_program(program: &Program, options: &PrintOptions) -> String {
    let separator = format!("\n\n{MODULE_SEPARATOR}\n\n");
    let modules: Vec<String> = program
        .iter()
        .map(|module| serialize_module(module, options))
        .collect();
    format!("{}\n", modules.join(&separator))
}

pub fn serialize_module(module: &Module, options: &PrintOptions) -> String {
    let printer = Printer::new(options);
    module
        .iter()
        .map(|binding| printer.binding(binding, options.line_length))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn serialize_binding(binding: &Binding, options: &PrintOptions) -> String {
    Printer::new(options).binding(binding, options.line_length)
}

/// Single-line rendering
pub fn serialize_expr(expr: &Expr, options: &PrintOptions) -> String {
    Printer::new(options).expr(expr)
}

/// Rendering that breaks lines to stay within `columns`
pub fn serialize_expr_indent(expr: &Expr, columns: usize, options: &PrintOptions) -> String {
    Printer::new(options).expr_indent(expr, columns)
}

/// Every context entry as a binding, sorted by name, inside `{ }`
pub fn serialize_ctx(ctx: &Ctx, options: &PrintOptions) -> String {
    let printer = Printer::new(&PrintOptions {
        full_hole_names: true,
        ..*options
    });
    let columns = options.line_length.saturating_sub(2);

    let mut entries: Vec<_> = ctx.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    if entries.is_empty() {
        return "{\n}\n".to_string();
    }

    let lines: Vec<String> = entries
        .into_iter()
        .map(|(id, ann)| {
            let binding = Binding::new(id.clone(), Some(ann.ty.clone()), ann.value.clone());
            printer.binding(&binding, columns)
        })
        .collect();
    format!("{{\n{}\n}}\n", indent(&lines.join("\n")))
}

/// One link of a binder chain
struct Param<'a> {
    id: Option<&'a str>,
    ty: &'a Expr,
}

/// A run of binders printed under a single body bracket
struct Chain<'a> {
    kind: FnKind,
    implicit: Vec<Param<'a>>,
    explicit: Vec<Param<'a>>,
    body: &'a Expr,
}

impl<'a> Chain<'a> {
    /// Collect implicit parameters, then explicit ones; an implicit
    /// binder after an explicit one starts a new chain in the body.
    fn of(expr: &'a Expr) -> Option<Self> {
        let Expr::Fn { kind, .. } = expr else {
            return None;
        };
        let mut chain = Chain {
            kind: *kind,
            implicit: Vec::new(),
            explicit: Vec::new(),
            body: expr,
        };

        let mut cursor = expr;
        while let Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type,
            result,
            ..
        } = cursor
        {
            if *kind != chain.kind || (*implicit && !chain.explicit.is_empty()) {
                break;
            }
            let param = Param {
                id: arg_id.as_deref(),
                ty: arg_type,
            };
            if *implicit {
                chain.implicit.push(param);
            } else {
                chain.explicit.push(param);
            }
            cursor = result;
        }
        chain.body = cursor;
        Some(chain)
    }

    fn brackets(&self) -> (&'static str, &'static str) {
        match self.kind {
            FnKind::Def => ("{", "}"),
            FnKind::Type => ("[", "]"),
        }
    }
}

struct Printer {
    full_hole_names: bool,
}

impl Printer {
    fn new(options: &PrintOptions) -> Self {
        Printer {
            full_hole_names: options.full_hole_names,
        }
    }

    fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Var { id, .. } => self.var(id),
            Expr::App { implicit, .. } => {
                let (head, args) = flatten_app(expr, *implicit);
                let args: Vec<String> = args.iter().map(|arg| self.expr(arg)).collect();
                let (open, close) = arg_brackets(*implicit);
                format!("{}{open}{}{close}", self.expr(head), args.join(", "))
            }
            Expr::Fn { .. } => match Chain::of(expr) {
                Some(chain) => {
                    let (open, close) = chain.brackets();
                    let body = if chain.body.as_var().is_some() {
                        format!("{open}{}{close}", self.expr(chain.body))
                    } else {
                        format!(" {open} {} {close}", self.expr(chain.body))
                    };
                    format!("{}{body}", self.params(&chain))
                }
                None => String::new(),
            },
        }
    }

    fn var(&self, id: &str) -> String {
        if is_hole(id) && !self.full_hole_names {
            "_".to_string()
        } else {
            id.to_string()
        }
    }

    fn expr_indent(&self, expr: &Expr, columns: usize) -> String {
        let one_line = self.expr(expr);
        if width(&one_line) < columns {
            return one_line;
        }

        match expr {
            Expr::Var { .. } => one_line,
            Expr::App { implicit, .. } => {
                let (head, args) = flatten_app(expr, *implicit);
                let args: Vec<String> = args
                    .iter()
                    .map(|arg| indent(&self.expr_indent(arg, columns.saturating_sub(3))))
                    .collect();
                let (open, close) = arg_brackets(*implicit);
                format!(
                    "{}{open}\n{}\n{close}",
                    self.expr_indent(head, columns),
                    args.join(",\n")
                )
            }
            Expr::Fn { .. } => match Chain::of(expr) {
                Some(chain) => {
                    let (open, close) = chain.brackets();
                    let mut header = self.params(&chain);
                    if width(&header) + 2 > columns {
                        header = self.params_indent(&chain);
                    }
                    let body = self.expr_indent(chain.body, columns.saturating_sub(2));
                    format!("{header} {open}\n{}\n{close}", indent(&body))
                }
                None => one_line,
            },
        }
    }

    fn param(&self, kind: FnKind, param: &Param<'_>) -> String {
        let hole_type = !self.full_hole_names && param.ty.as_hole().is_some();
        match (kind, param.id) {
            (FnKind::Type, None) => self.expr(param.ty),
            (FnKind::Type, Some(id)) if is_hole(id) => self.expr(param.ty),
            (FnKind::Type, Some(id)) if hole_type => format!("{id}:"),
            (FnKind::Def, Some(id)) if hole_type => self.var(id),
            (FnKind::Def, None) => format!(":{}", self.expr(param.ty)),
            (_, Some(id)) => format!("{}: {}", self.var(id), self.expr(param.ty)),
        }
    }

    fn param_lists(&self, chain: &Chain<'_>) -> Vec<(bool, Vec<String>)> {
        [(true, &chain.implicit), (false, &chain.explicit)]
            .into_iter()
            .filter(|(_, params)| !params.is_empty())
            .map(|(implicit, params)| {
                let params = params.iter().map(|p| self.param(chain.kind, p)).collect();
                (implicit, params)
            })
            .collect()
    }

    fn params(&self, chain: &Chain<'_>) -> String {
        self.param_lists(chain)
            .into_iter()
            .map(|(implicit, params)| {
                let (open, close) = arg_brackets(implicit);
                format!("{open}{}{close}", params.join(", "))
            })
            .collect()
    }

    fn params_indent(&self, chain: &Chain<'_>) -> String {
        self.param_lists(chain)
            .into_iter()
            .map(|(implicit, params)| {
                let (open, close) = arg_brackets(implicit);
                format!("{open}\n{}\n{close}", indent(&params.join(",\n")))
            })
            .collect()
    }

    fn binding(&self, binding: &Binding, line_length: usize) -> String {
        let mut out = binding.id.clone();
        if let Some(ty) = &binding.ty {
            out.push(':');
            // Room for the ` =` that follows
            let reserve = if binding.value.is_some() { 2 } else { 0 };
            self.place(&mut out, ty, line_length.saturating_sub(reserve));
        }
        if let Some(value) = &binding.value {
            out.push_str(" =");
            self.place(&mut out, value, line_length);
        }
        out
    }

    /// Continue on the current line when `expr` laid out for the columns
    /// left there fits, otherwise start an indented block below
    fn place(&self, out: &mut String, expr: &Expr, line_length: usize) {
        let used = out.rsplit('\n').next().map(width).unwrap_or(0);
        let remaining = line_length.saturating_sub(used + 1);
        let inline = self.expr_indent(expr, remaining);
        if inline.split('\n').all(|line| width(line) <= remaining) {
            out.push(' ');
            out.push_str(&inline);
        } else {
            let below = self.expr_indent(expr, line_length.saturating_sub(2));
            out.push('\n');
            out.push_str(&indent(&below));
        }
    }
}

/// Head and arguments of a run of applications with the same implicitness
fn flatten_app(expr: &Expr, implicit: bool) -> (&Expr, Vec<&Expr>) {
    let mut head = expr;
    let mut args = Vec::new();
    while let Expr::App {
        implicit: i,
        func,
        arg,
        ..
    } = head
    {
        if *i != implicit {
            break;
        }
        args.push(arg.as_ref());
        head = func;
    }
    args.reverse();
    (head, args)
}

fn arg_brackets(implicit: bool) -> (&'static str, &'static str) {
    if implicit { ("<", ">") } else { ("(", ")") }
}

fn indent(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn width(text: &str) -> usize {
    text.chars().count()
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printer = Printer::new(&PrintOptions {
            full_hole_names: true,
            ..PrintOptions::default()
        });
        write!(f, "{}", printer.expr(self))
    }
}

impl fmt::Display for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serialize_ctx(self, &PrintOptions::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_program, tokenize};
    use crate::typechecker::Ann;

    fn expr(input: &str) -> Expr {
        parse_expr(tokenize(input)).unwrap()
    }

    fn one_line(input: &str) -> String {
        serialize_expr(&expr(input), &PrintOptions::default())
    }

    fn narrow(input: &str, columns: usize) -> String {
        serialize_expr_indent(&expr(input), columns, &PrintOptions::default())
    }

    #[test]
    fn test_applications_flatten_by_implicitness() {
        assert_eq!(one_line("f<A>(x)(y)"), "f<A>(x, y)");
        assert_eq!(one_line("f(x)<A>"), "f(x)<A>");
        assert_eq!(one_line("g(f(x))"), "g(f(x))");
    }

    #[test]
    fn test_binder_chains() {
        assert_eq!(one_line("<T:>(x: T)[T]"), "<T:>(x: T)[T]");
        assert_eq!(one_line("(A: Type)(B: Type)[f(A, B)]"), "(A: Type, B: Type) [ f(A, B) ]");
        assert_eq!(one_line("(x){x}"), "(x){x}");
        assert_eq!(one_line("(:Nat){zero}"), "(:Nat){zero}");
        assert_eq!(one_line("(Nat)[Nat]"), "(Nat)[Nat]");
    }

    #[test]
    fn test_chain_breaks_on_kind_change() {
        assert_eq!(one_line("(x){(Nat)[Nat]}"), "(x) { (Nat)[Nat] }");
    }

    #[test]
    fn test_holes_print_as_underscore() {
        let e = expr("f(_, _)");
        assert_eq!(serialize_expr(&e, &PrintOptions::default()), "f(_, _)");

        let full = PrintOptions {
            full_hole_names: true,
            ..PrintOptions::default()
        };
        assert_eq!(serialize_expr(&e, &full), "f(_0, _1)");
        assert_eq!(e.to_string(), "f(_0, _1)");
    }

    #[test]
    fn test_long_application_wraps_arguments() {
        assert_eq!(narrow("f(alpha, beta)", 10), "f(\n  alpha,\n  beta\n)");
    }

    #[test]
    fn test_long_binder_wraps_body() {
        assert_eq!(narrow("(x: A)[g(x)]", 10), "(x: A) [\n  g(x)\n]");
    }

    #[test]
    fn test_long_parameter_list_wraps() {
        assert_eq!(
            narrow("<A:, B:>(x: A)[B]", 8),
            "<\n  A:,\n  B:\n>(\n  x: A\n) [\n  B\n]"
        );
    }

    #[test]
    fn test_binding_moves_long_type_below() {
        let program = parse_program(tokenize("name: (x: A)[g(x)]")).unwrap();
        let options = PrintOptions {
            line_length: 10,
            ..PrintOptions::default()
        };
        assert_eq!(
            serialize_binding(&program[0][0], &options),
            "name:\n  (x: A) [\n    g(x)\n  ]"
        );
    }

    #[test]
    fn test_binding_lines_fit_line_length() {
        let source = "longername: f(alphaalpha, beta)\nid: (x: A)[g(x)] = (x: A){g(x)}";
        let program = parse_program(tokenize(source)).unwrap();
        let options = PrintOptions {
            line_length: 20,
            ..PrintOptions::default()
        };

        for binding in &program[0] {
            let printed = serialize_binding(binding, &options);
            for line in printed.lines() {
                assert!(width(line) <= 20, "`{line}` is too wide in\n{printed}");
            }
        }
        assert_eq!(
            serialize_binding(&program[0][0], &options),
            "longername:\n  f(\n    alphaalpha,\n    beta\n  )"
        );
    }

    #[test]
    fn test_binding_wraps_within_remaining_columns() {
        let program = parse_program(tokenize("n = f(alpha, beta)")).unwrap();
        let options = PrintOptions {
            line_length: 12,
            ..PrintOptions::default()
        };
        assert_eq!(
            serialize_binding(&program[0][0], &options),
            "n = f(\n  alpha,\n  beta\n)"
        );
    }

    #[test]
    fn test_full_hole_names_show_parameter_holes() {
        let full = PrintOptions {
            full_hole_names: true,
            ..PrintOptions::default()
        };
        assert_eq!(serialize_expr(&expr("(x: _)[x]"), &full), "(x: _0)[x]");
        assert_eq!(serialize_expr(&expr("(x){x}"), &full), "(x: _0){x}");
        assert_eq!(one_line("(x: _)[x]"), "(x:)[x]");
        assert_eq!(expr("(x: _)[x]").to_string(), "(x: _0)[x]");
    }

    #[test]
    fn test_serialize_program_layout() {
        let program = parse_program(tokenize("Nat: Type zero: Nat\n---\none = succ(zero)")).unwrap();
        assert_eq!(
            serialize_program(&program, &PrintOptions::default()),
            "Nat: Type\n\nzero: Nat\n\n--------------------\n\none = succ(zero)\n"
        );
    }

    #[test]
    fn test_serialize_empty_program() {
        let program = parse_program(tokenize("")).unwrap();
        assert_eq!(serialize_program(&program, &PrintOptions::default()), "\n");
    }

    #[test]
    fn test_serialize_ctx() {
        let mut ctx = Ctx::new();
        ctx.insert(
            "zero".to_string(),
            Ann::of_type(Expr::var("Nat")),
        );
        ctx.insert(
            "_argType0".to_string(),
            Ann::defined(Expr::universe(), Expr::var("Nat")),
        );

        assert_eq!(
            serialize_ctx(&ctx, &PrintOptions::default()),
            "{\n  _argType0: Type = Nat\n  zero: Nat\n}\n"
        );
        assert_eq!(serialize_ctx(&Ctx::new(), &PrintOptions::default()), "{\n}\n");
    }
}
