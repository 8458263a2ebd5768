// Purpose: Pass 1 - insert read/write hook calls before every statement that touches memory.
// Inputs/Outputs: Walks lowered files and inserts sibling hook statements via the cursor.
// Invariants: Reads precede writes within one statement; insertion only happens in list slots.
// Gotchas: Absent type data degrades per-rule (skip indexed elements, presume package heads).

use crate::frontend::ast::*;
use crate::sema::Entity;

use super::cursor::{self, Cursor};
use super::hooks;
use super::PassCtx;

pub(crate) fn run(file: &mut FileAst, ctx: &mut PassCtx) {
    cursor::rewrite_file(file, &mut |stmt, cur| instrument_stmt(stmt, cur, ctx));
}

fn instrument_stmt(stmt: Stmt, cur: &mut Cursor, ctx: &mut PassCtx) -> Stmt {
    match stmt {
        Stmt::If(s) => {
            // Lowering already hoisted the initializer, so the
            // condition's reads become plain siblings.
            if cur.in_list() {
                let mut reads = Vec::new();
                collect_reads(ctx, &s.cond, &mut reads);
                for stmt in reads {
                    cur.insert_before(stmt);
                }
            }
            Stmt::If(s)
        }
        Stmt::For(mut s) => {
            if let Some(cond) = &s.cond {
                let mut reads = Vec::new();
                collect_reads(ctx, cond, &mut reads);
                // Once before the loop for the first evaluation, once
                // at the end of the body so every later check's reads
                // are observed.
                if cur.in_list() {
                    for stmt in &reads {
                        cur.insert_before(stmt.clone());
                    }
                }
                s.body.stmts.extend(reads);
            }
            Stmt::For(s)
        }
        Stmt::Switch(s) => {
            // A tag is only instrumented when no init is present: the
            // init stays in its non-list slot, and reads hoisted above
            // it could name bindings it introduces.
            if let Some(tag) = &s.tag {
                if s.init.is_none() && cur.in_list() {
                    let mut reads = Vec::new();
                    collect_reads(ctx, tag, &mut reads);
                    for stmt in reads {
                        cur.insert_before(stmt);
                    }
                }
            }
            Stmt::Switch(s)
        }
        Stmt::IncDec { expr, op, span } => {
            if cur.in_list() {
                let read = make_read(ctx, expr.clone());
                let write = make_write(ctx, expr.clone());
                cur.insert_before(read);
                cur.insert_before(write);
            }
            Stmt::IncDec { expr, op, span }
        }
        Stmt::Assign { lhs, op, rhs, span } => {
            if !cur.in_list() {
                return Stmt::Assign { lhs, op, rhs, span };
            }
            let mut reads = Vec::new();
            let mut writes = Vec::new();
            for value in &rhs {
                collect_reads(ctx, value, &mut reads);
            }
            for target in &lhs {
                if is_blank(target) {
                    continue;
                }
                if op.is_compound() {
                    // `x op= v` reads x as well.
                    collect_reads(ctx, target, &mut reads);
                }
                if op == AssignOp::Define {
                    match &target.kind {
                        ExprKind::Ident(_) => {
                            // A fresh definition gets no write hook; a
                            // same-scope redeclaration is a real store.
                            // Without resolver data the two cannot be
                            // told apart, so neither is instrumented.
                            if let Some(info) = ctx.info {
                                if !info.defines(target.id) {
                                    collect_writes(ctx, target, &mut writes);
                                }
                            }
                        }
                        _ => collect_writes(ctx, target, &mut writes),
                    }
                } else {
                    collect_writes(ctx, target, &mut writes);
                }
            }
            for stmt in reads {
                cur.insert_before(stmt);
            }
            for stmt in writes {
                cur.insert_before(stmt);
            }
            Stmt::Assign { lhs, op, rhs, span }
        }
        Stmt::Send { chan, value, span } => {
            if cur.in_list() {
                let mut reads = Vec::new();
                collect_reads(ctx, &chan, &mut reads);
                collect_reads(ctx, &value, &mut reads);
                for stmt in reads {
                    cur.insert_before(stmt);
                }
            }
            Stmt::Send { chan, value, span }
        }
        Stmt::Range(mut s) => {
            if !cur.in_list() {
                return Stmt::Range(s);
            }
            let mut reads = Vec::new();
            let mut writes = Vec::new();
            collect_reads(ctx, &s.x, &mut reads);
            if let Some(key) = &s.key {
                if !is_blank(key) {
                    collect_writes(ctx, key, &mut writes);
                }
            }
            if let Some(value) = &s.value {
                if !is_blank(value) {
                    collect_writes(ctx, value, &mut writes);
                }
            }
            for stmt in reads {
                cur.insert_before(stmt);
            }
            if s.define {
                // The loop variables are assigned anew on every
                // iteration, so their writes belong inside the body.
                s.body.stmts.splice(0..0, writes);
            } else {
                for stmt in writes {
                    cur.insert_before(stmt);
                }
            }
            Stmt::Range(s)
        }
        Stmt::Return { results, span } => {
            if cur.in_list() {
                let mut reads = Vec::new();
                for result in &results {
                    collect_reads(ctx, result, &mut reads);
                }
                for stmt in reads {
                    cur.insert_before(stmt);
                }
            }
            Stmt::Return { results, span }
        }
        Stmt::Expr { expr, span } => {
            if cur.in_list() {
                let mut reads = Vec::new();
                collect_reads(ctx, &expr, &mut reads);
                for stmt in reads {
                    cur.insert_before(stmt);
                }
            }
            Stmt::Expr { expr, span }
        }
        other => other,
    }
}

fn make_read(ctx: &mut PassCtx, loc: Expr) -> Stmt {
    ctx.dirty = true;
    hooks::location_hook(ctx.cfg, ctx.ids, &ctx.cfg.mem_read_func, loc)
}

fn make_write(ctx: &mut PassCtx, loc: Expr) -> Stmt {
    ctx.dirty = true;
    hooks::location_hook(ctx.cfg, ctx.ids, &ctx.cfg.mem_write_func, loc)
}

pub(crate) fn is_blank(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Ident(name) if name == "_")
}

fn entity_of(ctx: &PassCtx, id: ExprId) -> Option<Entity> {
    ctx.info.and_then(|info| info.entity_of(id))
}

fn known_non_map(ctx: &PassCtx, id: ExprId) -> bool {
    ctx.info
        .map(|info| info.is_known_non_map(id))
        .unwrap_or(false)
}

/// Emits a read hook for each atomic addressable location the
/// expression reads, in evaluation order.
pub(crate) fn collect_reads(ctx: &mut PassCtx, expr: &Expr, out: &mut Vec<Stmt>) {
    match &expr.kind {
        ExprKind::Ident(name) => {
            if is_builtin(name) {
                return;
            }
            if let Some(entity) = entity_of(ctx, expr.id) {
                match entity {
                    Entity::Package | Entity::Type | Entity::Const | Entity::Func => return,
                    Entity::Var | Entity::Field => {}
                }
            }
            out.push(make_read(ctx, expr.clone()));
        }
        ExprKind::Selector { x, sel } => {
            match ctx.info {
                Some(info) => {
                    if let Some(entity) = info.entity_of(sel.id) {
                        // Qualified constants, packages, and type names
                        // are not memory.
                        if matches!(entity, Entity::Const | Entity::Package | Entity::Type) {
                            return;
                        }
                    } else if matches!(x.kind, ExprKind::Ident(_)) {
                        match info.entity_of(x.id) {
                            Some(Entity::Package) => return,
                            Some(_) => {}
                            // Unresolved head: presume a package so no
                            // address of a non-location is ever taken.
                            None => return,
                        }
                    }
                }
                None => {
                    // No resolver data at all: a bare-identifier head
                    // is presumed to be a package.
                    if matches!(x.kind, ExprKind::Ident(_)) {
                        return;
                    }
                }
            }
            collect_reads(ctx, x, out);
            out.push(make_read(ctx, expr.clone()));
        }
        ExprKind::Index { x, index } => {
            collect_reads(ctx, x, out);
            collect_reads(ctx, index, out);
            // Map elements are not addressable; without type data the
            // container could be one, so the whole-index read is
            // dropped rather than risking an invalid address-of.
            if known_non_map(ctx, x.id) {
                out.push(make_read(ctx, expr.clone()));
            }
        }
        ExprKind::Star(x) => {
            collect_reads(ctx, x, out);
            out.push(make_read(ctx, expr.clone()));
        }
        ExprKind::Unary { op, x } => match op {
            // Taking an address reads nothing.
            UnaryOp::And => {}
            // The receive side effect itself belongs to the runtime's
            // channel integration; only the channel operand is walked.
            UnaryOp::Recv => collect_reads(ctx, x, out),
            _ => collect_reads(ctx, x, out),
        },
        ExprKind::Binary { x, y, .. } => {
            collect_reads(ctx, x, out);
            collect_reads(ctx, y, out);
        }
        ExprKind::Call { fun, args, .. } => {
            match &fun.kind {
                // A plain identifier callee names a function, not a
                // location.
                ExprKind::Ident(_) => {}
                ExprKind::Selector { x, .. } => match ctx.info {
                    Some(info) => {
                        if matches!(x.kind, ExprKind::Ident(_)) {
                            match info.entity_of(x.id) {
                                Some(Entity::Package) => {}
                                Some(_) => collect_reads(ctx, x, out),
                                None => {}
                            }
                        } else {
                            collect_reads(ctx, x, out);
                        }
                    }
                    None => {
                        if !matches!(x.kind, ExprKind::Ident(_)) {
                            collect_reads(ctx, x, out);
                        }
                    }
                },
                // A computed function value is itself read.
                _ => collect_reads(ctx, fun, out),
            }
            for arg in args {
                collect_reads(ctx, arg, out);
            }
        }
        ExprKind::Paren(x) => collect_reads(ctx, x, out),
        ExprKind::Slice { x, low, high, max } => {
            collect_reads(ctx, x, out);
            for part in [low, high, max].into_iter().flatten() {
                collect_reads(ctx, part, out);
            }
        }
        ExprKind::TypeAssert { x, .. } => collect_reads(ctx, x, out),
        // Literals and types read no memory.
        ExprKind::BasicLit { .. }
        | ExprKind::FuncLit { .. }
        | ExprKind::CompositeLit { .. }
        | ExprKind::TypeExpr(_) => {}
    }
}

/// Emits reads for the addressing sub-expressions of a store target,
/// then one write hook for the whole location.
pub(crate) fn collect_writes(ctx: &mut PassCtx, expr: &Expr, out: &mut Vec<Stmt>) {
    match &expr.kind {
        ExprKind::Ident(_) => {
            out.push(make_write(ctx, expr.clone()));
        }
        ExprKind::Selector { x, .. } => {
            collect_reads(ctx, x, out);
            out.push(make_write(ctx, expr.clone()));
        }
        ExprKind::Index { x, index } => {
            collect_reads(ctx, x, out);
            collect_reads(ctx, index, out);
            if known_non_map(ctx, x.id) {
                out.push(make_write(ctx, expr.clone()));
            }
        }
        ExprKind::Star(x) => {
            collect_reads(ctx, x, out);
            out.push(make_write(ctx, expr.clone()));
        }
        ExprKind::Paren(x) => collect_writes(ctx, x, out),
        _ => {}
    }
}

// Predeclared names that never denote instrumentable memory. Filtered
// by name so the pass behaves identically with and without resolver
// data.
fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "append"
            | "cap"
            | "close"
            | "complex"
            | "copy"
            | "delete"
            | "imag"
            | "len"
            | "make"
            | "new"
            | "panic"
            | "print"
            | "println"
            | "real"
            | "recover"
            | "true"
            | "false"
            | "nil"
            | "iota"
    )
}
