// Statement walker for the rewriting passes. Handlers run in post
// order (children first) and may replace the visited statement; the
// cursor additionally allows inserting siblings, but only when the
// statement sits in an ordered statement list. Single-statement slots
// (if/for initializers, else branches, labeled bodies, select comm
// clauses) are visited with insertion disabled.

use crate::frontend::ast::*;

pub(crate) struct Cursor {
    in_list: bool,
    before: Vec<Stmt>,
}

impl Cursor {
    /// Whether the visited statement is a member of a statement list,
    /// the enabling condition for sibling insertion.
    pub fn in_list(&self) -> bool {
        self.in_list
    }

    /// Queues a sibling before the visited statement. Outside a list
    /// slot the insertion is silently dropped; handlers gate on
    /// in_list first.
    pub fn insert_before(&mut self, stmt: Stmt) {
        if self.in_list {
            self.before.push(stmt);
        }
    }
}

pub(crate) fn rewrite_file<F>(file: &mut FileAst, f: &mut F)
where
    F: FnMut(Stmt, &mut Cursor) -> Stmt,
{
    for decl in &mut file.decls {
        rewrite_decl(decl, f);
    }
}

fn rewrite_decl<F>(decl: &mut Decl, f: &mut F)
where
    F: FnMut(Stmt, &mut Cursor) -> Stmt,
{
    match decl {
        Decl::Func(func) => {
            if let Some(body) = &mut func.body {
                rewrite_stmt_list(&mut body.stmts, f);
            }
        }
        Decl::Var(d) => {
            for spec in &mut d.specs {
                for value in &mut spec.values {
                    rewrite_expr(value, f);
                }
            }
        }
        Decl::Const(d) => {
            for spec in &mut d.specs {
                for value in &mut spec.values {
                    rewrite_expr(value, f);
                }
            }
        }
        Decl::Type(_) => {}
    }
}

pub(crate) fn rewrite_stmt_list<F>(stmts: &mut Vec<Stmt>, f: &mut F)
where
    F: FnMut(Stmt, &mut Cursor) -> Stmt,
{
    let old = std::mem::take(stmts);
    let mut out = Vec::with_capacity(old.len());
    for mut stmt in old {
        rewrite_children(&mut stmt, f);
        let mut cur = Cursor {
            in_list: true,
            before: Vec::new(),
        };
        let replaced = f(stmt, &mut cur);
        out.append(&mut cur.before);
        out.push(replaced);
    }
    *stmts = out;
}

fn rewrite_solo<F>(stmt: &mut Stmt, f: &mut F)
where
    F: FnMut(Stmt, &mut Cursor) -> Stmt,
{
    rewrite_children(stmt, f);
    let owned = std::mem::replace(
        stmt,
        Stmt::Empty {
            span: Span::synthetic(),
        },
    );
    let mut cur = Cursor {
        in_list: false,
        before: Vec::new(),
    };
    *stmt = f(owned, &mut cur);
}

fn rewrite_children<F>(stmt: &mut Stmt, f: &mut F)
where
    F: FnMut(Stmt, &mut Cursor) -> Stmt,
{
    match stmt {
        Stmt::Block(block) => rewrite_stmt_list(&mut block.stmts, f),
        Stmt::If(s) => {
            if let Some(init) = &mut s.init {
                rewrite_solo(init, f);
            }
            rewrite_expr(&mut s.cond, f);
            rewrite_stmt_list(&mut s.then.stmts, f);
            if let Some(els) = &mut s.els {
                rewrite_solo(els, f);
            }
        }
        Stmt::For(s) => {
            if let Some(init) = &mut s.init {
                rewrite_solo(init, f);
            }
            if let Some(cond) = &mut s.cond {
                rewrite_expr(cond, f);
            }
            if let Some(post) = &mut s.post {
                rewrite_solo(post, f);
            }
            rewrite_stmt_list(&mut s.body.stmts, f);
        }
        Stmt::Range(s) => {
            if let Some(key) = &mut s.key {
                rewrite_expr(key, f);
            }
            if let Some(value) = &mut s.value {
                rewrite_expr(value, f);
            }
            rewrite_expr(&mut s.x, f);
            rewrite_stmt_list(&mut s.body.stmts, f);
        }
        Stmt::Switch(s) => {
            if let Some(init) = &mut s.init {
                rewrite_solo(init, f);
            }
            if let Some(tag) = &mut s.tag {
                rewrite_expr(tag, f);
            }
            for case in &mut s.cases {
                for expr in &mut case.exprs {
                    rewrite_expr(expr, f);
                }
                rewrite_stmt_list(&mut case.body, f);
            }
        }
        Stmt::Select(s) => {
            for case in &mut s.cases {
                if let Some(comm) = &mut case.comm {
                    rewrite_solo(comm, f);
                }
                rewrite_stmt_list(&mut case.body, f);
            }
        }
        Stmt::Labeled { stmt: inner, .. } => rewrite_solo(inner, f),
        Stmt::Go { call, .. } | Stmt::Defer { call, .. } => rewrite_expr(call, f),
        Stmt::Expr { expr, .. } => rewrite_expr(expr, f),
        Stmt::Send { chan, value, .. } => {
            rewrite_expr(chan, f);
            rewrite_expr(value, f);
        }
        Stmt::IncDec { expr, .. } => rewrite_expr(expr, f),
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter_mut().chain(rhs.iter_mut()) {
                rewrite_expr(expr, f);
            }
        }
        Stmt::Return { results, .. } => {
            for expr in results {
                rewrite_expr(expr, f);
            }
        }
        Stmt::Decl(decl) => rewrite_decl(decl, f),
        Stmt::Branch { .. } | Stmt::Empty { .. } => {}
    }
}

// Expressions carry statement lists only through function literals;
// the walk descends every operand to reach them.
fn rewrite_expr<F>(expr: &mut Expr, f: &mut F)
where
    F: FnMut(Stmt, &mut Cursor) -> Stmt,
{
    match &mut expr.kind {
        ExprKind::Ident(_) | ExprKind::BasicLit { .. } | ExprKind::TypeExpr(_) => {}
        ExprKind::CompositeLit { elems, .. } => {
            for elem in elems {
                if let Some(key) = &mut elem.key {
                    rewrite_expr(key, f);
                }
                rewrite_expr(&mut elem.value, f);
            }
        }
        ExprKind::FuncLit { body, .. } => rewrite_stmt_list(&mut body.stmts, f),
        ExprKind::Paren(x) | ExprKind::Star(x) => rewrite_expr(x, f),
        ExprKind::Selector { x, .. } => rewrite_expr(x, f),
        ExprKind::Index { x, index } => {
            rewrite_expr(x, f);
            rewrite_expr(index, f);
        }
        ExprKind::Slice { x, low, high, max } => {
            rewrite_expr(x, f);
            for part in [low, high, max].into_iter().flatten() {
                rewrite_expr(part, f);
            }
        }
        ExprKind::TypeAssert { x, .. } => rewrite_expr(x, f),
        ExprKind::Call { fun, args, .. } => {
            rewrite_expr(fun, f);
            for arg in args {
                rewrite_expr(arg, f);
            }
        }
        ExprKind::Unary { x, .. } => rewrite_expr(x, f),
        ExprKind::Binary { x, y, .. } => {
            rewrite_expr(x, f);
            rewrite_expr(y, f);
        }
    }
}
