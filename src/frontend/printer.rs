// Purpose: Render an AST back to target-language source text.
// Inputs/Outputs: Consumes a FileAst and appends formatted source to a string buffer.
// Invariants: Output must re-lex and re-parse to an equivalent AST (modulo spans/ids).
// Gotchas: Operator nesting relies on parse-preserved Paren nodes; none are invented here.

use super::ast::*;

pub fn print_file(file: &FileAst) -> String {
    let mut p = Printer::new();
    p.file(file);
    p.out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn file(&mut self, file: &FileAst) {
        self.push("package ");
        self.push(&file.package);
        self.push("\n");
        if !file.imports.is_empty() {
            self.push("\nimport (");
            self.indent += 1;
            for spec in &file.imports {
                self.newline();
                if let Some(alias) = &spec.alias {
                    self.push(alias);
                    self.push(" ");
                }
                self.push(&format!("{:?}", spec.path));
            }
            self.indent -= 1;
            self.newline();
            self.push(")\n");
        }
        for decl in &file.decls {
            self.push("\n");
            self.decl(decl);
            self.push("\n");
        }
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Func(f) => self.func_decl(f),
            Decl::Var(d) => self.value_decl("var", &d.specs),
            Decl::Const(d) => self.value_decl("const", &d.specs),
            Decl::Type(d) => {
                self.push("type ");
                self.push(&d.name);
                if d.is_alias {
                    self.push(" =");
                }
                self.push(" ");
                self.type_ast(&d.ty);
            }
        }
    }

    fn func_decl(&mut self, f: &FuncDecl) {
        self.push("func ");
        if let Some(recv) = &f.recv {
            self.push("(");
            if let Some(name) = &recv.name {
                self.push(name);
                self.push(" ");
            }
            self.type_ast(&recv.ty);
            self.push(") ");
        }
        self.push(&f.name);
        self.params(&f.params);
        self.results(&f.results);
        if let Some(body) = &f.body {
            self.push(" ");
            self.block(body);
        }
    }

    fn value_decl(&mut self, kw: &str, specs: &[ValueSpec]) {
        self.push(kw);
        if specs.len() == 1 {
            self.push(" ");
            self.value_spec(&specs[0]);
            return;
        }
        self.push(" (");
        self.indent += 1;
        for spec in specs {
            self.newline();
            self.value_spec(spec);
        }
        self.indent -= 1;
        self.newline();
        self.push(")");
    }

    fn value_spec(&mut self, spec: &ValueSpec) {
        self.push(&spec.names.join(", "));
        if let Some(ty) = &spec.ty {
            self.push(" ");
            self.type_ast(ty);
        }
        if !spec.values.is_empty() {
            self.push(" = ");
            self.expr_list(&spec.values);
        }
    }

    fn params(&mut self, params: &[Param]) {
        self.push("(");
        for (i, group) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if !group.names.is_empty() {
                self.push(&group.names.join(", "));
                self.push(" ");
            }
            self.type_ast(&group.ty);
        }
        self.push(")");
    }

    fn results(&mut self, results: &[Param]) {
        if results.is_empty() {
            return;
        }
        if results.len() == 1 && results[0].names.is_empty() {
            self.push(" ");
            self.type_ast(&results[0].ty);
            return;
        }
        self.push(" ");
        self.params(results);
    }

    fn block(&mut self, block: &Block) {
        if block.stmts.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{");
        self.indent += 1;
        for stmt in &block.stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => self.decl(decl),
            Stmt::Expr { expr, .. } => self.expr(expr),
            Stmt::Send { chan, value, .. } => {
                self.expr(chan);
                self.push(" <- ");
                self.expr(value);
            }
            Stmt::IncDec { expr, op, .. } => {
                self.expr(expr);
                self.push(match op {
                    IncDecOp::Inc => "++",
                    IncDecOp::Dec => "--",
                });
            }
            Stmt::Assign { lhs, op, rhs, .. } => {
                self.expr_list(lhs);
                self.push(assign_token(*op));
                self.expr_list(rhs);
            }
            Stmt::Go { call, .. } => {
                self.push("go ");
                self.expr(call);
            }
            Stmt::Defer { call, .. } => {
                self.push("defer ");
                self.expr(call);
            }
            Stmt::Return { results, .. } => {
                self.push("return");
                if !results.is_empty() {
                    self.push(" ");
                    self.expr_list(results);
                }
            }
            Stmt::Branch { kind, label, .. } => {
                self.push(match kind {
                    BranchKind::Break => "break",
                    BranchKind::Continue => "continue",
                    BranchKind::Goto => "goto",
                    BranchKind::Fallthrough => "fallthrough",
                });
                if let Some(label) = label {
                    self.push(" ");
                    self.push(label);
                }
            }
            Stmt::Block(block) => self.block(block),
            Stmt::If(s) => self.if_stmt(s),
            Stmt::For(s) => {
                self.push("for ");
                if s.init.is_some() || s.post.is_some() {
                    if let Some(init) = &s.init {
                        self.stmt(init);
                    }
                    self.push("; ");
                    if let Some(cond) = &s.cond {
                        self.expr(cond);
                    }
                    self.push("; ");
                    if let Some(post) = &s.post {
                        self.stmt(post);
                    }
                    self.push(" ");
                } else if let Some(cond) = &s.cond {
                    self.expr(cond);
                    self.push(" ");
                }
                self.block(&s.body);
            }
            Stmt::Range(s) => {
                self.push("for ");
                if s.key.is_some() || s.value.is_some() {
                    if let Some(key) = &s.key {
                        self.expr(key);
                    }
                    if let Some(value) = &s.value {
                        self.push(", ");
                        self.expr(value);
                    }
                    self.push(if s.define { " := " } else { " = " });
                }
                self.push("range ");
                self.expr(&s.x);
                self.push(" ");
                self.block(&s.body);
            }
            Stmt::Switch(s) => {
                self.push("switch ");
                if let Some(init) = &s.init {
                    self.stmt(init);
                    self.push("; ");
                }
                if let Some(tag) = &s.tag {
                    self.expr(tag);
                    self.push(" ");
                }
                self.push("{");
                for case in &s.cases {
                    self.newline();
                    if case.exprs.is_empty() {
                        self.push("default:");
                    } else {
                        self.push("case ");
                        self.expr_list(&case.exprs);
                        self.push(":");
                    }
                    self.indent += 1;
                    for stmt in &case.body {
                        self.newline();
                        self.stmt(stmt);
                    }
                    self.indent -= 1;
                }
                self.newline();
                self.push("}");
            }
            Stmt::Select(s) => {
                self.push("select {");
                for case in &s.cases {
                    self.newline();
                    match &case.comm {
                        Some(comm) => {
                            self.push("case ");
                            self.stmt(comm);
                            self.push(":");
                        }
                        None => self.push("default:"),
                    }
                    self.indent += 1;
                    for stmt in &case.body {
                        self.newline();
                        self.stmt(stmt);
                    }
                    self.indent -= 1;
                }
                self.newline();
                self.push("}");
            }
            Stmt::Labeled { label, stmt, .. } => {
                self.push(label);
                self.push(":");
                self.newline();
                self.stmt(stmt);
            }
            Stmt::Empty { .. } => {}
        }
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        self.push("if ");
        if let Some(init) = &s.init {
            self.stmt(init);
            self.push("; ");
        }
        self.expr(&s.cond);
        self.push(" ");
        self.block(&s.then);
        if let Some(els) = &s.els {
            self.push(" else ");
            match els.as_ref() {
                Stmt::If(nested) => self.if_stmt(nested),
                Stmt::Block(block) => self.block(block),
                other => self.stmt(other),
            }
        }
    }

    fn expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.push(name),
            ExprKind::BasicLit { text, .. } => self.push(text),
            ExprKind::CompositeLit { ty, elems } => {
                if let Some(ty) = ty {
                    self.type_ast(ty);
                }
                self.push("{");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    if let Some(key) = &elem.key {
                        self.expr(key);
                        self.push(": ");
                    }
                    self.expr(&elem.value);
                }
                self.push("}");
            }
            ExprKind::FuncLit {
                params,
                results,
                body,
            } => {
                self.push("func");
                self.params(params);
                self.results(results);
                self.push(" ");
                self.block(body);
            }
            ExprKind::Paren(inner) => {
                self.push("(");
                self.expr(inner);
                self.push(")");
            }
            ExprKind::Selector { x, sel } => {
                self.expr(x);
                self.push(".");
                self.push(&sel.name);
            }
            ExprKind::Index { x, index } => {
                self.expr(x);
                self.push("[");
                self.expr(index);
                self.push("]");
            }
            ExprKind::Slice { x, low, high, max } => {
                self.expr(x);
                self.push("[");
                if let Some(low) = low {
                    self.expr(low);
                }
                self.push(":");
                if let Some(high) = high {
                    self.expr(high);
                }
                if let Some(max) = max {
                    self.push(":");
                    self.expr(max);
                }
                self.push("]");
            }
            ExprKind::TypeAssert { x, ty } => {
                self.expr(x);
                self.push(".(");
                self.type_ast(ty);
                self.push(")");
            }
            ExprKind::Call {
                fun,
                args,
                ellipsis,
            } => {
                self.expr(fun);
                self.push("(");
                self.expr_list(args);
                if *ellipsis {
                    self.push("...");
                }
                self.push(")");
            }
            ExprKind::Star(x) => {
                self.push("*");
                self.expr(x);
            }
            ExprKind::Unary { op, x } => {
                self.push(match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::Xor => "^",
                    UnaryOp::And => "&",
                    UnaryOp::Recv => "<-",
                });
                self.expr(x);
            }
            ExprKind::Binary { op, x, y } => {
                self.expr(x);
                self.push(" ");
                self.push(binary_token(*op));
                self.push(" ");
                self.expr(y);
            }
            ExprKind::TypeExpr(ty) => self.type_ast(ty),
        }
    }

    fn type_ast(&mut self, ty: &TypeAst) {
        match &ty.kind {
            TypeAstKind::Named(name) => self.push(name),
            TypeAstKind::Qualified(pkg, name) => {
                self.push(pkg);
                self.push(".");
                self.push(name);
            }
            TypeAstKind::Pointer(inner) => {
                self.push("*");
                self.type_ast(inner);
            }
            TypeAstKind::Slice(inner) => {
                self.push("[]");
                self.type_ast(inner);
            }
            TypeAstKind::Array(len, inner) => {
                self.push("[");
                match len {
                    Some(len) => self.expr(len),
                    None => self.push("..."),
                }
                self.push("]");
                self.type_ast(inner);
            }
            TypeAstKind::Map(key, value) => {
                self.push("map[");
                self.type_ast(key);
                self.push("]");
                self.type_ast(value);
            }
            TypeAstKind::Chan { dir, elem } => {
                match dir {
                    ChanDir::Both => self.push("chan "),
                    ChanDir::SendOnly => self.push("chan<- "),
                    ChanDir::RecvOnly => self.push("<-chan "),
                }
                self.type_ast(elem);
            }
            TypeAstKind::Func { params, results } => {
                self.push("func");
                self.params(params);
                self.results(results);
            }
            TypeAstKind::Struct(fields) => {
                if fields.is_empty() {
                    self.push("struct{}");
                    return;
                }
                self.push("struct {");
                self.indent += 1;
                for field in fields {
                    self.newline();
                    self.push(&field.names.join(", "));
                    self.push(" ");
                    self.type_ast(&field.ty);
                }
                self.indent -= 1;
                self.newline();
                self.push("}");
            }
            TypeAstKind::Interface(methods) => {
                if methods.is_empty() {
                    self.push("interface{}");
                    return;
                }
                self.push("interface {");
                self.indent += 1;
                for method in methods {
                    self.newline();
                    self.push(&method.name);
                    self.params(&method.params);
                    self.results(&method.results);
                }
                self.indent -= 1;
                self.newline();
                self.push("}");
            }
            TypeAstKind::Ellipsis(inner) => {
                self.push("...");
                self.type_ast(inner);
            }
        }
    }
}

fn assign_token(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => " = ",
        AssignOp::Define => " := ",
        AssignOp::Add => " += ",
        AssignOp::Sub => " -= ",
        AssignOp::Mul => " *= ",
        AssignOp::Div => " /= ",
        AssignOp::Rem => " %= ",
        AssignOp::And => " &= ",
        AssignOp::Or => " |= ",
        AssignOp::Xor => " ^= ",
        AssignOp::Shl => " <<= ",
        AssignOp::Shr => " >>= ",
        AssignOp::AndNot => " &^= ",
    }
}

fn binary_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::LOr => "||",
        BinaryOp::LAnd => "&&",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Lte => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Gte => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Or => "|",
        BinaryOp::Xor => "^",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::And => "&",
        BinaryOp::AndNot => "&^",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;

    fn parse(src: &str) -> FileAst {
        let tokens = Lexer::new(src).lex_all();
        let mut parser = Parser::new(tokens);
        let file = parser.parse_file().expect("parse file");
        assert!(parser.diags.is_empty(), "diagnostics on input");
        file
    }

    fn reparses(src: &str) -> String {
        let printed = print_file(&parse(src));
        let tokens = Lexer::new(&printed).lex_all();
        let mut parser = Parser::new(tokens);
        let file = parser.parse_file();
        assert!(
            file.is_some() && parser.diags.is_empty(),
            "printed source failed to re-parse:\n{}",
            printed
        );
        printed
    }

    #[test]
    fn prints_assignments_and_loops() {
        let out = reparses(
            "package main\nfunc main() {\n\tsum := 0\n\tfor i := 0; i < 10; i++ {\n\t\tsum += i\n\t}\n}\n",
        );
        assert!(out.contains("sum := 0"));
        assert!(out.contains("for i := 0; i < 10; i++ {"));
    }

    #[test]
    fn prints_imports_grouped_and_quoted() {
        let out = reparses("package main\nimport (\n\t\"fmt\"\n\t\"time\"\n)\nfunc main() {\n\tfmt.Println(time.Now())\n}\n");
        assert!(out.contains("import ("));
        assert!(out.contains("\"fmt\""));
    }

    #[test]
    fn prints_composites_pointers_and_channels() {
        let out = reparses(
            "package main\nfunc main() {\n\tm := map[string]int{\"a\": 1}\n\tp := &m\n\t_ = *p\n\tch := make(chan int, 1)\n\tch <- m[\"a\"]\n\td := <-ch\n\t_ = d\n}\n",
        );
        assert!(out.contains("map[string]int{\"a\": 1}"));
        assert!(out.contains("ch <- m[\"a\"]"));
        assert!(out.contains("d := <-ch"));
    }

    #[test]
    fn prints_struct_decl_and_method() {
        let out = reparses(
            "package counter\ntype Counter struct {\n\tvalue int\n}\nfunc (c *Counter) Increment() {\n\tc.value++\n}\n",
        );
        assert!(out.contains("type Counter struct {"));
        assert!(out.contains("func (c *Counter) Increment() {"));
    }

    #[test]
    fn prints_paren_nesting_verbatim() {
        let out = reparses("package main\nfunc main() {\n\tx := (1 + 2) * 3\n\t_ = x\n}\n");
        assert!(out.contains("(1 + 2) * 3"));
    }

    #[test]
    fn prints_switch_select_and_labels() {
        let out = reparses(
            "package main\nfunc main() {\n\tswitch x {\n\tcase 1:\n\t\ty := 2\n\t\t_ = y\n\tdefault:\n\t}\nloop:\n\tfor {\n\t\tbreak loop\n\t}\n}\n",
        );
        assert!(out.contains("switch x {"));
        assert!(out.contains("break loop"));
    }
}
