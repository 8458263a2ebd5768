// Builders for the injected runtime calls. Every hook has the same
// surface form, ALIAS.func(unsafe.Pointer(&LOC)), so one location-hook
// builder serves both the read and the write emitters.

use crate::frontend::ast::*;

use super::config::{Config, POINTER_FUNC, POINTER_PACKAGE};

/// Fresh ids for synthesized nodes, seeded past the parse's high-water
/// mark so resolver lookups for synthetic nodes always miss.
pub(crate) struct IdGen {
    next: ExprId,
}

impl IdGen {
    pub fn new(start: ExprId) -> Self {
        Self { next: start }
    }

    pub fn fresh(&mut self) -> ExprId {
        let id = self.next;
        self.next += 1;
        id
    }
}

pub(crate) fn ident_expr(ids: &mut IdGen, name: &str) -> Expr {
    Expr {
        id: ids.fresh(),
        kind: ExprKind::Ident(name.to_string()),
        span: Span::synthetic(),
    }
}

fn selector(ids: &mut IdGen, x: Expr, sel: &str) -> Expr {
    let sel = Ident {
        id: ids.fresh(),
        name: sel.to_string(),
        span: Span::synthetic(),
    };
    Expr {
        id: ids.fresh(),
        kind: ExprKind::Selector {
            x: Box::new(x),
            sel,
        },
        span: Span::synthetic(),
    }
}

fn call(ids: &mut IdGen, fun: Expr, args: Vec<Expr>) -> Expr {
    Expr {
        id: ids.fresh(),
        kind: ExprKind::Call {
            fun: Box::new(fun),
            args,
            ellipsis: false,
        },
        span: Span::synthetic(),
    }
}

fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr {
        expr,
        span: Span::synthetic(),
    }
}

/// `ALIAS.hook(unsafe.Pointer(&LOC))` as a statement.
pub(crate) fn location_hook(cfg: &Config, ids: &mut IdGen, hook: &str, loc: Expr) -> Stmt {
    let addr = Expr {
        id: ids.fresh(),
        kind: ExprKind::Unary {
            op: UnaryOp::And,
            x: Box::new(loc),
        },
        span: Span::synthetic(),
    };
    let pointer_pkg = ident_expr(ids, POINTER_PACKAGE);
    let erase = selector(ids, pointer_pkg, POINTER_FUNC);
    let erased = call(ids, erase, vec![addr]);
    let alias = ident_expr(ids, &cfg.runtime_alias);
    let hook_fun = selector(ids, alias, hook);
    expr_stmt(call(ids, hook_fun, vec![erased]))
}

/// `ALIAS.func(args...)` as an expression.
pub(crate) fn runtime_call(cfg: &Config, ids: &mut IdGen, func: &str, args: Vec<Expr>) -> Expr {
    let alias = ident_expr(ids, &cfg.runtime_alias);
    let fun = selector(ids, alias, func);
    call(ids, fun, args)
}

/// `ALIAS.func()` as a statement.
pub(crate) fn runtime_stmt(cfg: &Config, ids: &mut IdGen, func: &str) -> Stmt {
    expr_stmt(runtime_call(cfg, ids, func, Vec::new()))
}

/// Highest expression id present in the given files, for seeding an
/// IdGen when the parse that produced them is not available.
pub(crate) fn max_expr_id(files: &[FileAst]) -> ExprId {
    let mut max = 0;
    for file in files {
        for decl in &file.decls {
            decl_max(decl, &mut max);
        }
    }
    max
}

fn bump(max: &mut ExprId, id: ExprId) {
    if id > *max {
        *max = id;
    }
}

fn decl_max(decl: &Decl, max: &mut ExprId) {
    match decl {
        Decl::Func(f) => {
            for p in f.params.iter().chain(&f.results) {
                type_max(&p.ty, max);
            }
            if let Some(body) = &f.body {
                for stmt in &body.stmts {
                    stmt_max(stmt, max);
                }
            }
        }
        Decl::Var(d) => {
            for spec in &d.specs {
                if let Some(ty) = &spec.ty {
                    type_max(ty, max);
                }
                for value in &spec.values {
                    expr_max(value, max);
                }
            }
        }
        Decl::Const(d) => {
            for spec in &d.specs {
                for value in &spec.values {
                    expr_max(value, max);
                }
            }
        }
        Decl::Type(d) => type_max(&d.ty, max),
    }
}

fn stmt_max(stmt: &Stmt, max: &mut ExprId) {
    match stmt {
        Stmt::Decl(decl) => decl_max(decl, max),
        Stmt::Expr { expr, .. } | Stmt::IncDec { expr, .. } => expr_max(expr, max),
        Stmt::Send { chan, value, .. } => {
            expr_max(chan, max);
            expr_max(value, max);
        }
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter().chain(rhs) {
                expr_max(expr, max);
            }
        }
        Stmt::Go { call, .. } | Stmt::Defer { call, .. } => expr_max(call, max),
        Stmt::Return { results, .. } => {
            for expr in results {
                expr_max(expr, max);
            }
        }
        Stmt::Block(block) => {
            for stmt in &block.stmts {
                stmt_max(stmt, max);
            }
        }
        Stmt::If(s) => {
            if let Some(init) = &s.init {
                stmt_max(init, max);
            }
            expr_max(&s.cond, max);
            for stmt in &s.then.stmts {
                stmt_max(stmt, max);
            }
            if let Some(els) = &s.els {
                stmt_max(els, max);
            }
        }
        Stmt::For(s) => {
            if let Some(init) = &s.init {
                stmt_max(init, max);
            }
            if let Some(cond) = &s.cond {
                expr_max(cond, max);
            }
            if let Some(post) = &s.post {
                stmt_max(post, max);
            }
            for stmt in &s.body.stmts {
                stmt_max(stmt, max);
            }
        }
        Stmt::Range(s) => {
            if let Some(key) = &s.key {
                expr_max(key, max);
            }
            if let Some(value) = &s.value {
                expr_max(value, max);
            }
            expr_max(&s.x, max);
            for stmt in &s.body.stmts {
                stmt_max(stmt, max);
            }
        }
        Stmt::Switch(s) => {
            if let Some(init) = &s.init {
                stmt_max(init, max);
            }
            if let Some(tag) = &s.tag {
                expr_max(tag, max);
            }
            for case in &s.cases {
                for expr in &case.exprs {
                    expr_max(expr, max);
                }
                for stmt in &case.body {
                    stmt_max(stmt, max);
                }
            }
        }
        Stmt::Select(s) => {
            for case in &s.cases {
                if let Some(comm) = &case.comm {
                    stmt_max(comm, max);
                }
                for stmt in &case.body {
                    stmt_max(stmt, max);
                }
            }
        }
        Stmt::Labeled { stmt, .. } => stmt_max(stmt, max),
        Stmt::Branch { .. } | Stmt::Empty { .. } => {}
    }
}

fn expr_max(expr: &Expr, max: &mut ExprId) {
    bump(max, expr.id);
    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::BasicLit { .. } => {}
        ExprKind::TypeExpr(ty) => type_max(ty, max),
        ExprKind::CompositeLit { ty, elems } => {
            if let Some(ty) = ty {
                type_max(ty, max);
            }
            for elem in elems {
                if let Some(key) = &elem.key {
                    expr_max(key, max);
                }
                expr_max(&elem.value, max);
            }
        }
        ExprKind::FuncLit { body, .. } => {
            for stmt in &body.stmts {
                stmt_max(stmt, max);
            }
        }
        ExprKind::Paren(x) | ExprKind::Star(x) => expr_max(x, max),
        ExprKind::Selector { x, sel } => {
            bump(max, sel.id);
            expr_max(x, max);
        }
        ExprKind::Index { x, index } => {
            expr_max(x, max);
            expr_max(index, max);
        }
        ExprKind::Slice { x, low, high, max: hi } => {
            expr_max(x, max);
            for part in [low, high, hi].into_iter().flatten() {
                expr_max(part, max);
            }
        }
        ExprKind::TypeAssert { x, ty } => {
            expr_max(x, max);
            type_max(ty, max);
        }
        ExprKind::Call { fun, args, .. } => {
            expr_max(fun, max);
            for arg in args {
                expr_max(arg, max);
            }
        }
        ExprKind::Unary { x, .. } => expr_max(x, max),
        ExprKind::Binary { x, y, .. } => {
            expr_max(x, max);
            expr_max(y, max);
        }
    }
}

fn type_max(ty: &TypeAst, max: &mut ExprId) {
    match &ty.kind {
        TypeAstKind::Named(_) | TypeAstKind::Qualified(_, _) => {}
        TypeAstKind::Pointer(inner)
        | TypeAstKind::Slice(inner)
        | TypeAstKind::Ellipsis(inner) => type_max(inner, max),
        TypeAstKind::Array(len, inner) => {
            if let Some(len) = len {
                expr_max(len, max);
            }
            type_max(inner, max);
        }
        TypeAstKind::Map(key, value) => {
            type_max(key, max);
            type_max(value, max);
        }
        TypeAstKind::Chan { elem, .. } => type_max(elem, max),
        TypeAstKind::Func { params, results } => {
            for p in params.iter().chain(results) {
                type_max(&p.ty, max);
            }
        }
        TypeAstKind::Struct(fields) => {
            for field in fields {
                type_max(&field.ty, max);
            }
        }
        TypeAstKind::Interface(methods) => {
            for method in methods {
                for p in method.params.iter().chain(&method.results) {
                    type_max(&p.ty, max);
                }
            }
        }
    }
}
