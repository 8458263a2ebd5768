// Pass 0: move statements out of the non-list slots of if/for headers
// so the instrumentation pass only ever inserts siblings into ordered
// statement lists.

use crate::frontend::ast::*;

use super::cursor::{self, Cursor};

pub(crate) fn run(file: &mut FileAst) {
    cursor::rewrite_file(file, &mut lower_stmt);
}

fn lower_stmt(stmt: Stmt, cur: &mut Cursor) -> Stmt {
    match stmt {
        // `if init; cond { body }` becomes `{ init; if cond { body } }`.
        // The wrapping block bounds the initializer's scope exactly as
        // the header did.
        Stmt::If(mut s) if cur.in_list() => {
            if let Some(init) = s.init.take() {
                let span = s.span.clone();
                return Stmt::Block(Block {
                    stmts: vec![*init, Stmt::If(s)],
                    span,
                });
            }
            Stmt::If(s)
        }
        // `for init; cond; post { body }` becomes
        // `{ init; for cond { body; post } }`; either clause may be
        // absent independently.
        Stmt::For(mut s) if cur.in_list() => {
            if let Some(post) = s.post.take() {
                s.body.stmts.push(*post);
            }
            if let Some(init) = s.init.take() {
                let span = s.span.clone();
                return Stmt::Block(Block {
                    stmts: vec![*init, Stmt::For(s)],
                    span,
                });
            }
            Stmt::For(s)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::frontend::printer::print_file;

    fn lowered(src: &str) -> String {
        let tokens = Lexer::new(src).lex_all();
        let mut parser = Parser::new(tokens);
        let mut file = parser.parse_file().expect("parse");
        assert!(parser.diags.is_empty());
        run(&mut file);
        print_file(&file)
    }

    #[test]
    fn for_with_init_and_post_moves_into_block() {
        let out = lowered("package main\nfunc main() {\n\tfor i := 0; i < 10; i++ {\n\t\tx++\n\t}\n}\n");
        assert!(out.contains("i := 0"));
        assert!(out.contains("for i < 10 {"));
        // Post statement became the last statement of the body.
        let body_pos = out.find("x++").expect("body stmt");
        let post_pos = out.find("i++").expect("post stmt");
        assert!(post_pos > body_pos);
    }

    #[test]
    fn for_with_only_post_keeps_no_wrapper_block() {
        let out = lowered("package main\nfunc main() {\n\tfor ; x < 3; x++ {\n\t\ty = x\n\t}\n}\n");
        assert!(out.contains("for x < 3 {"));
        assert!(!out.contains("for ;"));
    }

    #[test]
    fn if_with_init_moves_into_block() {
        let out = lowered(
            "package main\nfunc main() {\n\tif x := f(); x > 50 {\n\t\ty = x\n\t}\n}\n",
        );
        assert!(out.contains("x := f()"));
        assert!(out.contains("if x > 50 {"));
    }

    #[test]
    fn else_if_with_init_is_left_alone() {
        let src = "package main\nfunc main() {\n\tif a {\n\t} else if x := f(); x > 0 {\n\t}\n}\n";
        let out = lowered(src);
        // The else branch is a single-statement slot; no block can
        // replace it.
        assert!(out.contains("else if x := f(); x > 0 {"));
    }

    #[test]
    fn lowering_twice_changes_nothing() {
        let src = "package main\nfunc main() {\n\tfor i := 0; i < 10; i++ {\n\t\tif j := i; j > 2 {\n\t\t\tx = j\n\t\t}\n\t}\n}\n";
        let tokens = Lexer::new(src).lex_all();
        let mut parser = Parser::new(tokens);
        let mut file = parser.parse_file().expect("parse");
        run(&mut file);
        let once = print_file(&file);
        run(&mut file);
        let twice = print_file(&file);
        assert_eq!(once, twice);
    }
}
