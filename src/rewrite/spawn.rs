// Pass 2: replace every concurrent spawn with a block that evaluates
// the arguments into fresh temporaries in the launching task, then
// hands the runtime a closure bracketing the original call with the
// lifecycle hooks. Runs strictly after the memory pass so the
// synthetic temporaries and the closure body stay uninstrumented.

use crate::frontend::ast::*;

use super::config::{ENTRY_FUNC, ENTRY_PACKAGE, SPAWN_TEMP_PREFIX};
use super::cursor::{self, Cursor};
use super::hooks;
use super::memory;
use super::PassCtx;

pub(crate) fn run(file: &mut FileAst, ctx: &mut PassCtx) {
    cursor::rewrite_file(file, &mut |stmt, cur| desugar_stmt(stmt, cur, ctx));
}

fn desugar_stmt(stmt: Stmt, _cur: &mut Cursor, ctx: &mut PassCtx) -> Stmt {
    let (call, span) = match stmt {
        Stmt::Go { call, span } => (call, span),
        other => return other,
    };
    let (fun, args, ellipsis) = match call.kind {
        ExprKind::Call {
            fun,
            args,
            ellipsis,
        } => (fun, args, ellipsis),
        // Malformed spawn; leave it for the compiler to reject.
        kind => {
            return Stmt::Go {
                call: Expr {
                    id: call.id,
                    kind,
                    span: call.span,
                },
                span,
            }
        }
    };
    ctx.dirty = true;

    let mut stmts = Vec::new();
    let mut temp_args = Vec::new();
    for (i, arg) in args.into_iter().enumerate() {
        // The argument is evaluated (and its reads observed) in the
        // launching task.
        memory::collect_reads(ctx, &arg, &mut stmts);
        let name = format!("{}{}", SPAWN_TEMP_PREFIX, i);
        let target = hooks::ident_expr(ctx.ids, &name);
        stmts.push(Stmt::Assign {
            lhs: vec![target],
            op: AssignOp::Define,
            rhs: vec![arg],
            span: Span::synthetic(),
        });
        temp_args.push(hooks::ident_expr(ctx.ids, &name));
    }

    let wrapped = Expr {
        id: ctx.ids.fresh(),
        kind: ExprKind::Call {
            fun,
            args: temp_args,
            ellipsis,
        },
        span: Span::synthetic(),
    };
    let enter = hooks::runtime_stmt(ctx.cfg, ctx.ids, &ctx.cfg.enter_func);
    let exit = hooks::runtime_stmt(ctx.cfg, ctx.ids, &ctx.cfg.exit_func);
    let closure = Expr {
        id: ctx.ids.fresh(),
        kind: ExprKind::FuncLit {
            params: Vec::new(),
            results: Vec::new(),
            body: Block {
                stmts: vec![
                    enter,
                    Stmt::Expr {
                        expr: wrapped,
                        span: Span::synthetic(),
                    },
                    exit,
                ],
                span: Span::synthetic(),
            },
        },
        span: Span::synthetic(),
    };
    let spawn = hooks::runtime_call(ctx.cfg, ctx.ids, &ctx.cfg.spawn_func, vec![closure]);
    stmts.push(Stmt::Expr {
        expr: spawn,
        span: Span::synthetic(),
    });

    // A block keeps the temporaries out of the launching scope.
    Stmt::Block(Block { stmts, span })
}

/// Brackets the program entry function with the lifecycle hooks; the
/// entry task has no spawn site to do it.
pub(crate) fn bracket_entry(file: &mut FileAst, ctx: &mut PassCtx) {
    if file.package != ENTRY_PACKAGE {
        return;
    }
    for decl in &mut file.decls {
        let Decl::Func(f) = decl else {
            continue;
        };
        if f.name != ENTRY_FUNC || f.recv.is_some() {
            continue;
        }
        if let Some(body) = &mut f.body {
            let enter = hooks::runtime_stmt(ctx.cfg, ctx.ids, &ctx.cfg.enter_func);
            let exit = hooks::runtime_stmt(ctx.cfg, ctx.ids, &ctx.cfg.exit_func);
            body.stmts.insert(0, enter);
            body.stmts.push(exit);
            ctx.dirty = true;
        }
        break;
    }
}
