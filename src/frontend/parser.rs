use super::ast::*;
use super::diagnostic::Diagnostics;
use super::lexer::{Keyword, Symbol, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
    pub diags: Diagnostics,
    next_expr_id: ExprId,
    // Suppresses `Name{...}` composite literals while parsing the header
    // of an if/for/switch, where `{` opens the body instead.
    allow_composite_lit: bool,
}

// A simple statement, or the range clause of a for header.
enum SimpleStmt {
    Stmt(Stmt),
    RangeClause {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        span: Span,
    },
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::new_with_expr_id(tokens, 0)
    }

    pub fn new_with_expr_id(tokens: Vec<Token>, next_expr_id: ExprId) -> Self {
        Self {
            tokens,
            idx: 0,
            diags: Diagnostics::default(),
            next_expr_id,
            allow_composite_lit: true,
        }
    }

    pub fn next_expr_id(&self) -> ExprId {
        self.next_expr_id
    }

    fn new_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = self.next_expr_id;
        self.next_expr_id += 1;
        Expr { id, kind, span }
    }

    fn new_ident(&mut self, name: String, span: Span) -> Ident {
        let id = self.next_expr_id;
        self.next_expr_id += 1;
        Ident { id, name, span }
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.idx)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, off: usize) -> &TokenKind {
        self.tokens
            .get(self.idx + off)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span.clone())
    }

    fn span_here(&self) -> Span {
        self.peek_span().unwrap_or_else(Span::synthetic)
    }

    fn bump(&mut self) -> Token {
        let tok = self
            .tokens
            .get(self.idx)
            .cloned()
            .unwrap_or_else(|| Token {
                kind: TokenKind::Eof,
                span: Span::synthetic(),
            });
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn at_symbol(&self, sym: Symbol) -> bool {
        matches!(self.peek(), TokenKind::Symbol(s) if *s == sym)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_symbol(&mut self, sym: Symbol) -> bool {
        if self.at_symbol(sym) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, sym: Symbol) -> bool {
        if self.eat_symbol(sym) {
            return true;
        }
        self.diags
            .push(format!("expected {:?}", sym), self.peek_span());
        false
    }

    fn expect_ident(&mut self) -> Option<(String, Span)> {
        if let TokenKind::Ident(name) = self.peek().clone() {
            let tok = self.bump();
            return Some((name, tok.span));
        }
        self.diags.push("expected identifier", self.peek_span());
        None
    }

    fn consume_semis(&mut self) {
        while self.at_symbol(Symbol::Semi) {
            self.bump();
        }
    }

    // Statement terminator: an explicit or inserted semicolon, or the
    // closing brace of the enclosing block.
    fn expect_stmt_end(&mut self) {
        if self.at_symbol(Symbol::Semi) {
            self.bump();
            return;
        }
        if self.at_symbol(Symbol::RBrace) || self.at_eof() {
            return;
        }
        self.diags
            .push("expected end of statement", self.peek_span());
        // Make progress on malformed input.
        self.bump();
    }

    pub fn parse_file(&mut self) -> Option<FileAst> {
        let span = self.span_here();
        if !self.at_keyword(Keyword::Package) {
            self.diags.push("expected package clause", self.peek_span());
            return None;
        }
        self.bump();
        let (package, _) = self.expect_ident()?;
        self.consume_semis();

        let mut imports = Vec::new();
        while self.at_keyword(Keyword::Import) {
            self.bump();
            self.parse_import_group(&mut imports);
            self.consume_semis();
        }

        let mut decls = Vec::new();
        while !self.at_eof() {
            if self.at_symbol(Symbol::Semi) {
                self.bump();
                continue;
            }
            match self.parse_decl() {
                Some(decl) => decls.push(decl),
                None => {
                    // Skip the offending token to avoid stalling.
                    self.bump();
                }
            }
            self.consume_semis();
        }
        Some(FileAst {
            package,
            imports,
            decls,
            span,
        })
    }

    fn parse_import_group(&mut self, imports: &mut Vec<ImportSpec>) {
        if self.eat_symbol(Symbol::LParen) {
            while !self.at_symbol(Symbol::RParen) && !self.at_eof() {
                if self.at_symbol(Symbol::Semi) {
                    self.bump();
                    continue;
                }
                if let Some(spec) = self.parse_import_spec() {
                    imports.push(spec);
                }
                self.consume_semis();
            }
            self.expect_symbol(Symbol::RParen);
        } else if let Some(spec) = self.parse_import_spec() {
            imports.push(spec);
        }
    }

    fn parse_import_spec(&mut self) -> Option<ImportSpec> {
        let span = self.span_here();
        let alias = if let TokenKind::Ident(name) = self.peek().clone() {
            self.bump();
            Some(name)
        } else if self.at_symbol(Symbol::Dot) {
            self.bump();
            Some(".".to_string())
        } else {
            None
        };
        if let TokenKind::StringLit(text) = self.peek().clone() {
            self.bump();
            let path = strip_quotes(&text);
            return Some(ImportSpec { alias, path, span });
        }
        self.diags.push("expected import path", self.peek_span());
        None
    }

    fn parse_decl(&mut self) -> Option<Decl> {
        match self.peek() {
            TokenKind::Keyword(Keyword::Func) => self.parse_func_decl().map(Decl::Func),
            TokenKind::Keyword(Keyword::Var) => self.parse_value_decl(false).map(Decl::Var),
            TokenKind::Keyword(Keyword::Const) => self
                .parse_value_decl(true)
                .map(|d| Decl::Const(ConstDecl {
                    specs: d.specs,
                    span: d.span,
                })),
            TokenKind::Keyword(Keyword::Type) => self.parse_type_decl().map(Decl::Type),
            _ => {
                self.diags.push("expected declaration", self.peek_span());
                None
            }
        }
    }

    fn parse_func_decl(&mut self) -> Option<FuncDecl> {
        let span = self.span_here();
        self.bump(); // func
        let recv = if self.at_symbol(Symbol::LParen) {
            Some(self.parse_receiver()?)
        } else {
            None
        };
        let (name, _) = self.expect_ident()?;
        let params = self.parse_param_list()?;
        let results = self.parse_results()?;
        let body = if self.at_symbol(Symbol::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Some(FuncDecl {
            name,
            recv,
            params,
            results,
            body,
            span,
        })
    }

    fn parse_receiver(&mut self) -> Option<Receiver> {
        let span = self.span_here();
        self.expect_symbol(Symbol::LParen);
        // Either `(name Type)` or `(Type)`.
        let mut name = None;
        if let TokenKind::Ident(n) = self.peek().clone() {
            if type_start(self.peek_at(1)) {
                self.bump();
                name = Some(n);
            }
        }
        let ty = self.parse_type()?;
        self.expect_symbol(Symbol::RParen);
        Some(Receiver { name, ty, span })
    }

    // Parenthesized parameter list. Go's grammar leaves `a, b int` vs
    // `int, string` ambiguous until the whole list is seen, so elements
    // are collected flat and regrouped once any element carries a name.
    fn parse_param_list(&mut self) -> Option<Vec<Param>> {
        self.expect_symbol(Symbol::LParen);
        let mut items: Vec<(Option<String>, TypeAst, Span)> = Vec::new();
        while !self.at_symbol(Symbol::RParen) && !self.at_eof() {
            let span = self.span_here();
            let first = self.parse_type()?;
            if type_start(self.peek()) {
                let name = match first.kind {
                    TypeAstKind::Named(n) => n,
                    _ => {
                        self.diags
                            .push("expected parameter name", Some(first.span.clone()));
                        return None;
                    }
                };
                let ty = self.parse_type()?;
                items.push((Some(name), ty, span));
            } else {
                items.push((None, first, span));
            }
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }
        self.expect_symbol(Symbol::RParen);
        Some(regroup_params(items, &mut self.diags))
    }

    fn parse_results(&mut self) -> Option<Vec<Param>> {
        if self.at_symbol(Symbol::LParen) {
            return self.parse_param_list();
        }
        if type_start(self.peek()) {
            let ty = self.parse_type()?;
            let span = ty.span.clone();
            return Some(vec![Param {
                names: Vec::new(),
                ty,
                span,
            }]);
        }
        Some(Vec::new())
    }

    fn parse_value_decl(&mut self, is_const: bool) -> Option<VarDecl> {
        let span = self.span_here();
        self.bump(); // var or const
        let mut specs = Vec::new();
        if self.eat_symbol(Symbol::LParen) {
            while !self.at_symbol(Symbol::RParen) && !self.at_eof() {
                if self.at_symbol(Symbol::Semi) {
                    self.bump();
                    continue;
                }
                if let Some(spec) = self.parse_value_spec(is_const) {
                    specs.push(spec);
                }
                self.consume_semis();
            }
            self.expect_symbol(Symbol::RParen);
        } else if let Some(spec) = self.parse_value_spec(is_const) {
            specs.push(spec);
        }
        Some(VarDecl { specs, span })
    }

    fn parse_value_spec(&mut self, is_const: bool) -> Option<ValueSpec> {
        let span = self.span_here();
        let mut names = Vec::new();
        loop {
            let (name, _) = self.expect_ident()?;
            names.push(name);
            if !self.eat_symbol(Symbol::Comma) {
                break;
            }
        }
        let ty = if type_start(self.peek()) && !self.at_symbol(Symbol::Assign) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut values = Vec::new();
        if self.eat_symbol(Symbol::Assign) {
            values = self.parse_expr_list()?;
        } else if is_const && ty.is_none() {
            // Bare const spec repeating the previous expression (iota
            // groups); nothing to record.
        }
        Some(ValueSpec {
            names,
            ty,
            values,
            span,
        })
    }

    fn parse_type_decl(&mut self) -> Option<TypeDecl> {
        let span = self.span_here();
        self.bump(); // type
        let (name, _) = self.expect_ident()?;
        let is_alias = self.eat_symbol(Symbol::Assign);
        let ty = self.parse_type()?;
        Some(TypeDecl {
            name,
            is_alias,
            ty,
            span,
        })
    }

    pub fn parse_type(&mut self) -> Option<TypeAst> {
        let span = self.span_here();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                if self.at_symbol(Symbol::Dot) {
                    if let TokenKind::Ident(sel) = self.peek_at(1).clone() {
                        self.bump();
                        self.bump();
                        return Some(TypeAst {
                            kind: TypeAstKind::Qualified(name, sel),
                            span,
                        });
                    }
                }
                Some(TypeAst {
                    kind: TypeAstKind::Named(name),
                    span,
                })
            }
            TokenKind::Symbol(Symbol::Star) => {
                self.bump();
                let inner = self.parse_type()?;
                Some(TypeAst {
                    kind: TypeAstKind::Pointer(Box::new(inner)),
                    span,
                })
            }
            TokenKind::Symbol(Symbol::LBracket) => {
                self.bump();
                if self.eat_symbol(Symbol::RBracket) {
                    let elem = self.parse_type()?;
                    return Some(TypeAst {
                        kind: TypeAstKind::Slice(Box::new(elem)),
                        span,
                    });
                }
                let len = if self.eat_symbol(Symbol::Ellipsis) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                self.expect_symbol(Symbol::RBracket);
                let elem = self.parse_type()?;
                Some(TypeAst {
                    kind: TypeAstKind::Array(len, Box::new(elem)),
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Map) => {
                self.bump();
                self.expect_symbol(Symbol::LBracket);
                let key = self.parse_type()?;
                self.expect_symbol(Symbol::RBracket);
                let value = self.parse_type()?;
                Some(TypeAst {
                    kind: TypeAstKind::Map(Box::new(key), Box::new(value)),
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Chan) => {
                self.bump();
                let dir = if self.eat_symbol(Symbol::Arrow) {
                    ChanDir::SendOnly
                } else {
                    ChanDir::Both
                };
                let elem = self.parse_type()?;
                Some(TypeAst {
                    kind: TypeAstKind::Chan {
                        dir,
                        elem: Box::new(elem),
                    },
                    span,
                })
            }
            TokenKind::Symbol(Symbol::Arrow) => {
                self.bump();
                if !self.at_keyword(Keyword::Chan) {
                    self.diags.push("expected chan", self.peek_span());
                    return None;
                }
                self.bump();
                let elem = self.parse_type()?;
                Some(TypeAst {
                    kind: TypeAstKind::Chan {
                        dir: ChanDir::RecvOnly,
                        elem: Box::new(elem),
                    },
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Func) => {
                self.bump();
                let params = self.parse_param_list()?;
                let results = self.parse_results()?;
                Some(TypeAst {
                    kind: TypeAstKind::Func { params, results },
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Struct) => {
                self.bump();
                self.expect_symbol(Symbol::LBrace);
                let mut fields = Vec::new();
                while !self.at_symbol(Symbol::RBrace) && !self.at_eof() {
                    if self.at_symbol(Symbol::Semi) {
                        self.bump();
                        continue;
                    }
                    let fspan = self.span_here();
                    let mut names = Vec::new();
                    loop {
                        match self.expect_ident() {
                            Some((n, _)) => names.push(n),
                            None => break,
                        }
                        if !self.eat_symbol(Symbol::Comma) {
                            break;
                        }
                    }
                    let ty = self.parse_type()?;
                    fields.push(FieldDef {
                        names,
                        ty,
                        span: fspan,
                    });
                    self.consume_semis();
                }
                self.expect_symbol(Symbol::RBrace);
                Some(TypeAst {
                    kind: TypeAstKind::Struct(fields),
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Interface) => {
                self.bump();
                self.expect_symbol(Symbol::LBrace);
                let mut methods = Vec::new();
                while !self.at_symbol(Symbol::RBrace) && !self.at_eof() {
                    if self.at_symbol(Symbol::Semi) {
                        self.bump();
                        continue;
                    }
                    let mspan = self.span_here();
                    let (name, _) = self.expect_ident()?;
                    let params = self.parse_param_list()?;
                    let results = self.parse_results()?;
                    methods.push(MethodSig {
                        name,
                        params,
                        results,
                        span: mspan,
                    });
                    self.consume_semis();
                }
                self.expect_symbol(Symbol::RBrace);
                Some(TypeAst {
                    kind: TypeAstKind::Interface(methods),
                    span,
                })
            }
            TokenKind::Symbol(Symbol::Ellipsis) => {
                self.bump();
                let inner = self.parse_type()?;
                Some(TypeAst {
                    kind: TypeAstKind::Ellipsis(Box::new(inner)),
                    span,
                })
            }
            TokenKind::Symbol(Symbol::LParen) => {
                self.bump();
                let inner = self.parse_type();
                self.expect_symbol(Symbol::RParen);
                inner
            }
            _ => {
                self.diags.push("expected type", self.peek_span());
                None
            }
        }
    }

    pub fn parse_block(&mut self) -> Option<Block> {
        let span = self.span_here();
        self.expect_symbol(Symbol::LBrace);
        let stmts = self.parse_stmt_list(|p| p.at_symbol(Symbol::RBrace));
        self.expect_symbol(Symbol::RBrace);
        Some(Block { stmts, span })
    }

    fn parse_stmt_list<F>(&mut self, stop: F) -> Vec<Stmt>
    where
        F: Fn(&Parser) -> bool,
    {
        let mut stmts = Vec::new();
        while !stop(self) && !self.at_eof() {
            if self.at_symbol(Symbol::Semi) {
                self.bump();
                continue;
            }
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => {
                    self.bump();
                }
            }
        }
        stmts
    }

    pub fn parse_stmt(&mut self) -> Option<Stmt> {
        let span = self.span_here();
        match self.peek().clone() {
            TokenKind::Keyword(Keyword::Var) => {
                let d = self.parse_value_decl(false)?;
                self.expect_stmt_end();
                Some(Stmt::Decl(Decl::Var(d)))
            }
            TokenKind::Keyword(Keyword::Const) => {
                let d = self.parse_value_decl(true)?;
                self.expect_stmt_end();
                Some(Stmt::Decl(Decl::Const(ConstDecl {
                    specs: d.specs,
                    span: d.span,
                })))
            }
            TokenKind::Keyword(Keyword::Type) => {
                let d = self.parse_type_decl()?;
                self.expect_stmt_end();
                Some(Stmt::Decl(Decl::Type(d)))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_stmt().map(Stmt::If),
            TokenKind::Keyword(Keyword::For) => self.parse_for_stmt(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_stmt().map(Stmt::Switch),
            TokenKind::Keyword(Keyword::Select) => self.parse_select_stmt().map(Stmt::Select),
            TokenKind::Keyword(Keyword::Go) => {
                self.bump();
                let call = self.parse_expr()?;
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    self.diags
                        .push("expression in go must be a call", Some(call.span.clone()));
                }
                self.expect_stmt_end();
                Some(Stmt::Go { call, span })
            }
            TokenKind::Keyword(Keyword::Defer) => {
                self.bump();
                let call = self.parse_expr()?;
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    self.diags
                        .push("expression in defer must be a call", Some(call.span.clone()));
                }
                self.expect_stmt_end();
                Some(Stmt::Defer { call, span })
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let mut results = Vec::new();
                if !self.at_symbol(Symbol::Semi)
                    && !self.at_symbol(Symbol::RBrace)
                    && !self.at_eof()
                {
                    results = self.parse_expr_list()?;
                }
                self.expect_stmt_end();
                Some(Stmt::Return { results, span })
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                let label = self.eat_label();
                self.expect_stmt_end();
                Some(Stmt::Branch {
                    kind: BranchKind::Break,
                    label,
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                let label = self.eat_label();
                self.expect_stmt_end();
                Some(Stmt::Branch {
                    kind: BranchKind::Continue,
                    label,
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Goto) => {
                self.bump();
                let label = self.eat_label();
                self.expect_stmt_end();
                Some(Stmt::Branch {
                    kind: BranchKind::Goto,
                    label,
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Fallthrough) => {
                self.bump();
                self.expect_stmt_end();
                Some(Stmt::Branch {
                    kind: BranchKind::Fallthrough,
                    label: None,
                    span,
                })
            }
            TokenKind::Symbol(Symbol::LBrace) => {
                let block = self.parse_block()?;
                self.expect_stmt_end();
                Some(Stmt::Block(block))
            }
            TokenKind::Ident(label)
                if matches!(self.peek_at(1), TokenKind::Symbol(Symbol::Colon)) =>
            {
                self.bump();
                self.bump();
                self.consume_semis();
                let stmt = self.parse_stmt()?;
                Some(Stmt::Labeled {
                    label,
                    stmt: Box::new(stmt),
                    span,
                })
            }
            _ => {
                let simple = self.parse_simple_stmt(false)?;
                self.expect_stmt_end();
                match simple {
                    SimpleStmt::Stmt(stmt) => Some(stmt),
                    SimpleStmt::RangeClause { span, .. } => {
                        self.diags
                            .push("range is only valid in a for header", Some(span));
                        None
                    }
                }
            }
        }
    }

    fn eat_label(&mut self) -> Option<String> {
        if let TokenKind::Ident(name) = self.peek().clone() {
            self.bump();
            Some(name)
        } else {
            None
        }
    }

    fn parse_simple_stmt(&mut self, allow_range: bool) -> Option<SimpleStmt> {
        let span = self.span_here();
        let lhs = self.parse_expr_list()?;
        let op = match self.peek() {
            TokenKind::Symbol(Symbol::Define) => Some(AssignOp::Define),
            TokenKind::Symbol(Symbol::Assign) => Some(AssignOp::Assign),
            TokenKind::Symbol(Symbol::PlusAssign) => Some(AssignOp::Add),
            TokenKind::Symbol(Symbol::MinusAssign) => Some(AssignOp::Sub),
            TokenKind::Symbol(Symbol::StarAssign) => Some(AssignOp::Mul),
            TokenKind::Symbol(Symbol::SlashAssign) => Some(AssignOp::Div),
            TokenKind::Symbol(Symbol::PercentAssign) => Some(AssignOp::Rem),
            TokenKind::Symbol(Symbol::AmpAssign) => Some(AssignOp::And),
            TokenKind::Symbol(Symbol::PipeAssign) => Some(AssignOp::Or),
            TokenKind::Symbol(Symbol::CaretAssign) => Some(AssignOp::Xor),
            TokenKind::Symbol(Symbol::ShlAssign) => Some(AssignOp::Shl),
            TokenKind::Symbol(Symbol::ShrAssign) => Some(AssignOp::Shr),
            TokenKind::Symbol(Symbol::AmpCaretAssign) => Some(AssignOp::AndNot),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            if allow_range
                && self.at_keyword(Keyword::Range)
                && matches!(op, AssignOp::Define | AssignOp::Assign)
            {
                self.bump();
                let x = self.parse_expr()?;
                let mut iter = lhs.into_iter();
                let key = iter.next();
                let value = iter.next();
                return Some(SimpleStmt::RangeClause {
                    key,
                    value,
                    define: op == AssignOp::Define,
                    x,
                    span,
                });
            }
            let rhs = self.parse_expr_list()?;
            return Some(SimpleStmt::Stmt(Stmt::Assign { lhs, op, rhs, span }));
        }
        let mut lhs = lhs;
        if lhs.len() != 1 {
            self.diags
                .push("expected assignment after expression list", Some(span.clone()));
        }
        let expr = lhs.pop()?;
        match self.peek() {
            TokenKind::Symbol(Symbol::Arrow) => {
                self.bump();
                let value = self.parse_expr()?;
                Some(SimpleStmt::Stmt(Stmt::Send {
                    chan: expr,
                    value,
                    span,
                }))
            }
            TokenKind::Symbol(Symbol::Inc) => {
                self.bump();
                Some(SimpleStmt::Stmt(Stmt::IncDec {
                    expr,
                    op: IncDecOp::Inc,
                    span,
                }))
            }
            TokenKind::Symbol(Symbol::Dec) => {
                self.bump();
                Some(SimpleStmt::Stmt(Stmt::IncDec {
                    expr,
                    op: IncDecOp::Dec,
                    span,
                }))
            }
            _ => Some(SimpleStmt::Stmt(Stmt::Expr { expr, span })),
        }
    }

    fn parse_if_stmt(&mut self) -> Option<IfStmt> {
        let span = self.span_here();
        self.bump(); // if
        let prev = self.allow_composite_lit;
        self.allow_composite_lit = false;
        let mut init = None;
        let first = self.parse_simple_stmt(false)?;
        let cond = if self.at_symbol(Symbol::Semi) {
            self.bump();
            match first {
                SimpleStmt::Stmt(stmt) => init = Some(Box::new(stmt)),
                SimpleStmt::RangeClause { .. } => {}
            }
            self.parse_expr()?
        } else {
            match first {
                SimpleStmt::Stmt(Stmt::Expr { expr, .. }) => expr,
                _ => {
                    self.diags
                        .push("expected condition expression", self.peek_span());
                    self.allow_composite_lit = prev;
                    return None;
                }
            }
        };
        self.allow_composite_lit = prev;
        let then = self.parse_block()?;
        let els = if self.at_keyword(Keyword::Else) {
            self.bump();
            if self.at_keyword(Keyword::If) {
                Some(Box::new(Stmt::If(self.parse_if_stmt()?)))
            } else {
                let block = self.parse_block()?;
                Some(Box::new(Stmt::Block(block)))
            }
        } else {
            None
        };
        Some(IfStmt {
            init,
            cond,
            then,
            els,
            span,
        })
    }

    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let span = self.span_here();
        self.bump(); // for
        let prev = self.allow_composite_lit;
        self.allow_composite_lit = false;

        // Bare `for {`.
        if self.at_symbol(Symbol::LBrace) {
            self.allow_composite_lit = prev;
            let body = self.parse_block()?;
            self.expect_stmt_end();
            return Some(Stmt::For(ForStmt {
                init: None,
                cond: None,
                post: None,
                body,
                span,
            }));
        }

        // `for range x {`.
        if self.at_keyword(Keyword::Range) {
            self.bump();
            let x = self.parse_expr()?;
            self.allow_composite_lit = prev;
            let body = self.parse_block()?;
            self.expect_stmt_end();
            return Some(Stmt::Range(RangeStmt {
                key: None,
                value: None,
                define: false,
                x,
                body,
                span,
            }));
        }

        let mut init: Option<Box<Stmt>> = None;
        let mut cond: Option<Expr> = None;
        let mut post: Option<Box<Stmt>> = None;

        if !self.at_symbol(Symbol::Semi) {
            match self.parse_simple_stmt(true)? {
                SimpleStmt::RangeClause {
                    key,
                    value,
                    define,
                    x,
                    ..
                } => {
                    self.allow_composite_lit = prev;
                    let body = self.parse_block()?;
                    self.expect_stmt_end();
                    return Some(Stmt::Range(RangeStmt {
                        key,
                        value,
                        define,
                        x,
                        body,
                        span,
                    }));
                }
                SimpleStmt::Stmt(stmt) => {
                    if self.at_symbol(Symbol::Semi) {
                        init = Some(Box::new(stmt));
                    } else {
                        // Condition-only loop.
                        match stmt {
                            Stmt::Expr { expr, .. } => cond = Some(expr),
                            other => {
                                self.diags.push(
                                    "expected loop condition",
                                    stmt_span(&other),
                                );
                            }
                        }
                        self.allow_composite_lit = prev;
                        let body = self.parse_block()?;
                        self.expect_stmt_end();
                        return Some(Stmt::For(ForStmt {
                            init: None,
                            cond,
                            post: None,
                            body,
                            span,
                        }));
                    }
                }
            }
        }

        // Three-clause form: `for init; cond; post {`.
        self.expect_symbol(Symbol::Semi);
        if !self.at_symbol(Symbol::Semi) {
            cond = Some(self.parse_expr()?);
        }
        self.expect_symbol(Symbol::Semi);
        if !self.at_symbol(Symbol::LBrace) {
            match self.parse_simple_stmt(false)? {
                SimpleStmt::Stmt(stmt) => post = Some(Box::new(stmt)),
                SimpleStmt::RangeClause { span, .. } => {
                    self.diags.push("range not allowed here", Some(span));
                }
            }
        }
        self.allow_composite_lit = prev;
        let body = self.parse_block()?;
        self.expect_stmt_end();
        Some(Stmt::For(ForStmt {
            init,
            cond,
            post,
            body,
            span,
        }))
    }

    fn parse_switch_stmt(&mut self) -> Option<SwitchStmt> {
        let span = self.span_here();
        self.bump(); // switch
        let prev = self.allow_composite_lit;
        self.allow_composite_lit = false;
        let mut init = None;
        let mut tag = None;
        if !self.at_symbol(Symbol::LBrace) {
            let first = self.parse_simple_stmt(false)?;
            if self.at_symbol(Symbol::Semi) {
                self.bump();
                match first {
                    SimpleStmt::Stmt(stmt) => init = Some(Box::new(stmt)),
                    SimpleStmt::RangeClause { .. } => {}
                }
                if !self.at_symbol(Symbol::LBrace) {
                    tag = Some(self.parse_expr()?);
                }
            } else {
                match first {
                    SimpleStmt::Stmt(Stmt::Expr { expr, .. }) => tag = Some(expr),
                    SimpleStmt::Stmt(stmt) => {
                        self.diags
                            .push("expected switch tag expression", stmt_span(&stmt));
                    }
                    SimpleStmt::RangeClause { .. } => {}
                }
            }
        }
        self.allow_composite_lit = prev;
        self.expect_symbol(Symbol::LBrace);
        let mut cases = Vec::new();
        while !self.at_symbol(Symbol::RBrace) && !self.at_eof() {
            if self.at_symbol(Symbol::Semi) {
                self.bump();
                continue;
            }
            let cspan = self.span_here();
            let exprs = if self.at_keyword(Keyword::Case) {
                self.bump();
                self.parse_expr_list()?
            } else if self.at_keyword(Keyword::Default) {
                self.bump();
                Vec::new()
            } else {
                self.diags.push("expected case or default", self.peek_span());
                break;
            };
            self.expect_symbol(Symbol::Colon);
            let body = self.parse_stmt_list(|p| {
                p.at_keyword(Keyword::Case)
                    || p.at_keyword(Keyword::Default)
                    || p.at_symbol(Symbol::RBrace)
            });
            cases.push(CaseClause {
                exprs,
                body,
                span: cspan,
            });
        }
        self.expect_symbol(Symbol::RBrace);
        self.expect_stmt_end();
        Some(SwitchStmt {
            init,
            tag,
            cases,
            span,
        })
    }

    fn parse_select_stmt(&mut self) -> Option<SelectStmt> {
        let span = self.span_here();
        self.bump(); // select
        self.expect_symbol(Symbol::LBrace);
        let mut cases = Vec::new();
        while !self.at_symbol(Symbol::RBrace) && !self.at_eof() {
            if self.at_symbol(Symbol::Semi) {
                self.bump();
                continue;
            }
            let cspan = self.span_here();
            let comm = if self.at_keyword(Keyword::Case) {
                self.bump();
                match self.parse_simple_stmt(false)? {
                    SimpleStmt::Stmt(stmt) => Some(Box::new(stmt)),
                    SimpleStmt::RangeClause { .. } => None,
                }
            } else if self.at_keyword(Keyword::Default) {
                self.bump();
                None
            } else {
                self.diags.push("expected case or default", self.peek_span());
                break;
            };
            self.expect_symbol(Symbol::Colon);
            let body = self.parse_stmt_list(|p| {
                p.at_keyword(Keyword::Case)
                    || p.at_keyword(Keyword::Default)
                    || p.at_symbol(Symbol::RBrace)
            });
            cases.push(CommClause {
                comm,
                body,
                span: cspan,
            });
        }
        self.expect_symbol(Symbol::RBrace);
        self.expect_stmt_end();
        Some(SelectStmt { cases, span })
    }

    pub fn parse_expr_list(&mut self) -> Option<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat_symbol(Symbol::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Some(exprs)
    }

    pub fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let (op, prec) = match binary_op(self.peek()) {
                Some(pair) => pair,
                None => return Some(lhs),
            };
            if prec < min_prec {
                return Some(lhs);
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.clone();
            lhs = self.new_expr(
                ExprKind::Binary {
                    op,
                    x: Box::new(lhs),
                    y: Box::new(rhs),
                },
                span,
            );
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let span = self.span_here();
        let op = match self.peek() {
            TokenKind::Symbol(Symbol::Plus) => Some(UnaryOp::Plus),
            TokenKind::Symbol(Symbol::Minus) => Some(UnaryOp::Minus),
            TokenKind::Symbol(Symbol::Bang) => Some(UnaryOp::Not),
            TokenKind::Symbol(Symbol::Caret) => Some(UnaryOp::Xor),
            TokenKind::Symbol(Symbol::Amp) => Some(UnaryOp::And),
            TokenKind::Symbol(Symbol::Arrow) => Some(UnaryOp::Recv),
            _ => None,
        };
        if let Some(op) = op {
            // `<-chan T` in expression position is a type, not a receive.
            if op == UnaryOp::Recv && matches!(self.peek_at(1), TokenKind::Keyword(Keyword::Chan))
            {
                let ty = self.parse_type()?;
                return Some(self.new_expr(ExprKind::TypeExpr(ty), span));
            }
            self.bump();
            let x = self.parse_unary()?;
            return Some(self.new_expr(
                ExprKind::Unary {
                    op,
                    x: Box::new(x),
                },
                span,
            ));
        }
        if self.at_symbol(Symbol::Star) {
            self.bump();
            let x = self.parse_unary()?;
            return Some(self.new_expr(ExprKind::Star(Box::new(x)), span));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let mut expr = self.parse_operand()?;
        loop {
            match self.peek().clone() {
                TokenKind::Symbol(Symbol::Dot) => {
                    self.bump();
                    if self.at_symbol(Symbol::LParen) {
                        self.bump();
                        let ty = self.parse_type()?;
                        self.expect_symbol(Symbol::RParen);
                        let span = expr.span.clone();
                        expr = self.new_expr(
                            ExprKind::TypeAssert {
                                x: Box::new(expr),
                                ty,
                            },
                            span,
                        );
                        continue;
                    }
                    let (name, ispan) = self.expect_ident()?;
                    let sel = self.new_ident(name, ispan);
                    let span = expr.span.clone();
                    expr = self.new_expr(
                        ExprKind::Selector {
                            x: Box::new(expr),
                            sel,
                        },
                        span,
                    );
                }
                TokenKind::Symbol(Symbol::LParen) => {
                    self.bump();
                    let prev = self.allow_composite_lit;
                    self.allow_composite_lit = true;
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while !self.at_symbol(Symbol::RParen) && !self.at_eof() {
                        args.push(self.parse_expr()?);
                        if self.eat_symbol(Symbol::Ellipsis) {
                            ellipsis = true;
                        }
                        if !self.eat_symbol(Symbol::Comma) {
                            break;
                        }
                    }
                    self.allow_composite_lit = prev;
                    self.expect_symbol(Symbol::RParen);
                    let span = expr.span.clone();
                    expr = self.new_expr(
                        ExprKind::Call {
                            fun: Box::new(expr),
                            args,
                            ellipsis,
                        },
                        span,
                    );
                }
                TokenKind::Symbol(Symbol::LBracket) => {
                    self.bump();
                    let prev = self.allow_composite_lit;
                    self.allow_composite_lit = true;
                    let low = if self.at_symbol(Symbol::Colon) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    if self.eat_symbol(Symbol::Colon) {
                        let high = if self.at_symbol(Symbol::Colon)
                            || self.at_symbol(Symbol::RBracket)
                        {
                            None
                        } else {
                            Some(Box::new(self.parse_expr()?))
                        };
                        let max = if self.eat_symbol(Symbol::Colon) {
                            Some(Box::new(self.parse_expr()?))
                        } else {
                            None
                        };
                        self.allow_composite_lit = prev;
                        self.expect_symbol(Symbol::RBracket);
                        let span = expr.span.clone();
                        expr = self.new_expr(
                            ExprKind::Slice {
                                x: Box::new(expr),
                                low,
                                high,
                                max,
                            },
                            span,
                        );
                    } else {
                        self.allow_composite_lit = prev;
                        self.expect_symbol(Symbol::RBracket);
                        let index = low?;
                        let span = expr.span.clone();
                        expr = self.new_expr(
                            ExprKind::Index {
                                x: Box::new(expr),
                                index,
                            },
                            span,
                        );
                    }
                }
                TokenKind::Symbol(Symbol::LBrace) if self.allow_composite_lit => {
                    let ty = match expr_as_type(&expr) {
                        Some(ty) => ty,
                        None => return Some(expr),
                    };
                    let elems = self.parse_composite_body()?;
                    let span = expr.span.clone();
                    expr = self.new_expr(
                        ExprKind::CompositeLit {
                            ty: Some(ty),
                            elems,
                        },
                        span,
                    );
                }
                _ => return Some(expr),
            }
        }
    }

    fn parse_operand(&mut self) -> Option<Expr> {
        let span = self.span_here();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Some(self.new_expr(ExprKind::Ident(name), span))
            }
            TokenKind::IntLit(text) => {
                self.bump();
                Some(self.new_expr(
                    ExprKind::BasicLit {
                        kind: LitKind::Int,
                        text,
                    },
                    span,
                ))
            }
            TokenKind::FloatLit(text) => {
                self.bump();
                Some(self.new_expr(
                    ExprKind::BasicLit {
                        kind: LitKind::Float,
                        text,
                    },
                    span,
                ))
            }
            TokenKind::StringLit(text) => {
                self.bump();
                Some(self.new_expr(
                    ExprKind::BasicLit {
                        kind: LitKind::String,
                        text,
                    },
                    span,
                ))
            }
            TokenKind::CharLit(text) => {
                self.bump();
                Some(self.new_expr(
                    ExprKind::BasicLit {
                        kind: LitKind::Char,
                        text,
                    },
                    span,
                ))
            }
            TokenKind::Symbol(Symbol::LParen) => {
                self.bump();
                let prev = self.allow_composite_lit;
                self.allow_composite_lit = true;
                let inner = self.parse_expr()?;
                self.allow_composite_lit = prev;
                self.expect_symbol(Symbol::RParen);
                Some(self.new_expr(ExprKind::Paren(Box::new(inner)), span))
            }
            TokenKind::Keyword(Keyword::Func) => {
                self.bump();
                let params = self.parse_param_list()?;
                let results = self.parse_results()?;
                if self.at_symbol(Symbol::LBrace) {
                    let prev = self.allow_composite_lit;
                    self.allow_composite_lit = true;
                    let body = self.parse_block()?;
                    self.allow_composite_lit = prev;
                    Some(self.new_expr(
                        ExprKind::FuncLit {
                            params,
                            results,
                            body,
                        },
                        span,
                    ))
                } else {
                    Some(self.new_expr(
                        ExprKind::TypeExpr(TypeAst {
                            kind: TypeAstKind::Func { params, results },
                            span: span.clone(),
                        }),
                        span,
                    ))
                }
            }
            TokenKind::Symbol(Symbol::LBracket)
            | TokenKind::Keyword(Keyword::Map)
            | TokenKind::Keyword(Keyword::Chan)
            | TokenKind::Keyword(Keyword::Struct)
            | TokenKind::Keyword(Keyword::Interface) => {
                let ty = self.parse_type()?;
                // A literal type prefix is unambiguous, so a composite
                // body is allowed even inside control-clause headers.
                if self.at_symbol(Symbol::LBrace) {
                    let elems = self.parse_composite_body()?;
                    return Some(self.new_expr(
                        ExprKind::CompositeLit {
                            ty: Some(ty),
                            elems,
                        },
                        span,
                    ));
                }
                Some(self.new_expr(ExprKind::TypeExpr(ty), span))
            }
            _ => {
                self.diags.push("expected expression", self.peek_span());
                None
            }
        }
    }

    fn parse_composite_body(&mut self) -> Option<Vec<CompositeElem>> {
        self.expect_symbol(Symbol::LBrace);
        let prev = self.allow_composite_lit;
        self.allow_composite_lit = true;
        let mut elems = Vec::new();
        while !self.at_symbol(Symbol::RBrace) && !self.at_eof() {
            if self.at_symbol(Symbol::Semi) {
                self.bump();
                continue;
            }
            let first = self.parse_composite_value()?;
            let elem = if self.eat_symbol(Symbol::Colon) {
                let value = self.parse_composite_value()?;
                CompositeElem {
                    key: Some(first),
                    value,
                }
            } else {
                CompositeElem {
                    key: None,
                    value: first,
                }
            };
            elems.push(elem);
            if !self.eat_symbol(Symbol::Comma) {
                self.consume_semis();
                break;
            }
            self.consume_semis();
        }
        self.allow_composite_lit = prev;
        self.expect_symbol(Symbol::RBrace);
        Some(elems)
    }

    // An element value is a full expression or a nested type-elided
    // composite (`{1, 2}` inside `[][]int{...}`).
    fn parse_composite_value(&mut self) -> Option<Expr> {
        if self.at_symbol(Symbol::LBrace) {
            let span = self.span_here();
            let elems = self.parse_composite_body()?;
            return Some(self.new_expr(ExprKind::CompositeLit { ty: None, elems }, span));
        }
        self.parse_expr()
    }
}

fn strip_quotes(text: &str) -> String {
    let t = text.trim();
    if t.len() >= 2 && (t.starts_with('"') || t.starts_with('`')) {
        t[1..t.len() - 1].to_string()
    } else {
        t.to_string()
    }
}

fn stmt_span(stmt: &Stmt) -> Option<Span> {
    match stmt {
        Stmt::Expr { span, .. }
        | Stmt::Send { span, .. }
        | Stmt::IncDec { span, .. }
        | Stmt::Assign { span, .. }
        | Stmt::Go { span, .. }
        | Stmt::Defer { span, .. }
        | Stmt::Return { span, .. }
        | Stmt::Branch { span, .. }
        | Stmt::Labeled { span, .. }
        | Stmt::Empty { span } => Some(span.clone()),
        Stmt::Block(b) => Some(b.span.clone()),
        Stmt::If(s) => Some(s.span.clone()),
        Stmt::For(s) => Some(s.span.clone()),
        Stmt::Range(s) => Some(s.span.clone()),
        Stmt::Switch(s) => Some(s.span.clone()),
        Stmt::Select(s) => Some(s.span.clone()),
        Stmt::Decl(_) => None,
    }
}

fn type_start(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident(_)
            | TokenKind::Symbol(
                Symbol::Star | Symbol::LBracket | Symbol::LParen | Symbol::Ellipsis | Symbol::Arrow
            )
            | TokenKind::Keyword(
                Keyword::Map | Keyword::Chan | Keyword::Func | Keyword::Struct | Keyword::Interface
            )
    )
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    let pair = match kind {
        TokenKind::Symbol(Symbol::OrOr) => (BinaryOp::LOr, 1),
        TokenKind::Symbol(Symbol::AndAnd) => (BinaryOp::LAnd, 2),
        TokenKind::Symbol(Symbol::EqEq) => (BinaryOp::Eq, 3),
        TokenKind::Symbol(Symbol::NotEq) => (BinaryOp::NotEq, 3),
        TokenKind::Symbol(Symbol::Lt) => (BinaryOp::Lt, 3),
        TokenKind::Symbol(Symbol::Lte) => (BinaryOp::Lte, 3),
        TokenKind::Symbol(Symbol::Gt) => (BinaryOp::Gt, 3),
        TokenKind::Symbol(Symbol::Gte) => (BinaryOp::Gte, 3),
        TokenKind::Symbol(Symbol::Plus) => (BinaryOp::Add, 4),
        TokenKind::Symbol(Symbol::Minus) => (BinaryOp::Sub, 4),
        TokenKind::Symbol(Symbol::Pipe) => (BinaryOp::Or, 4),
        TokenKind::Symbol(Symbol::Caret) => (BinaryOp::Xor, 4),
        TokenKind::Symbol(Symbol::Star) => (BinaryOp::Mul, 5),
        TokenKind::Symbol(Symbol::Slash) => (BinaryOp::Div, 5),
        TokenKind::Symbol(Symbol::Percent) => (BinaryOp::Rem, 5),
        TokenKind::Symbol(Symbol::Shl) => (BinaryOp::Shl, 5),
        TokenKind::Symbol(Symbol::Shr) => (BinaryOp::Shr, 5),
        TokenKind::Symbol(Symbol::Amp) => (BinaryOp::And, 5),
        TokenKind::Symbol(Symbol::AmpCaret) => (BinaryOp::AndNot, 5),
        _ => return None,
    };
    Some(pair)
}

// Reinterprets an already-parsed operand as the type of a composite
// literal: a bare name or a package-qualified name.
fn expr_as_type(expr: &Expr) -> Option<TypeAst> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(TypeAst {
            kind: TypeAstKind::Named(name.clone()),
            span: expr.span.clone(),
        }),
        ExprKind::Selector { x, sel } => match &x.kind {
            ExprKind::Ident(pkg) => Some(TypeAst {
                kind: TypeAstKind::Qualified(pkg.clone(), sel.name.clone()),
                span: expr.span.clone(),
            }),
            _ => None,
        },
        _ => None,
    }
}

fn regroup_params(
    items: Vec<(Option<String>, TypeAst, Span)>,
    diags: &mut Diagnostics,
) -> Vec<Param> {
    let named = items.iter().any(|(n, _, _)| n.is_some());
    if !named {
        return items
            .into_iter()
            .map(|(_, ty, span)| Param {
                names: Vec::new(),
                ty,
                span,
            })
            .collect();
    }
    // `a, b int` arrives as an unnamed `a` item followed by a named
    // `b int` item; fold pending bare names into the next named group.
    let mut params = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for (name, ty, span) in items {
        match name {
            Some(name) => {
                let mut names = std::mem::take(&mut pending);
                names.push(name);
                params.push(Param { names, ty, span });
            }
            None => match ty.kind {
                TypeAstKind::Named(n) => pending.push(n),
                _ => {
                    diags.push("mixed named and unnamed parameters", Some(span.clone()));
                    params.push(Param {
                        names: Vec::new(),
                        ty,
                        span,
                    });
                }
            },
        }
    }
    if !pending.is_empty() {
        diags.push("parameter names without a type", None);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn parse(src: &str) -> FileAst {
        let tokens = Lexer::new(src).lex_all();
        let mut parser = Parser::new(tokens);
        let file = parser.parse_file().expect("parse file");
        assert!(
            parser.diags.is_empty(),
            "unexpected parser diagnostics: {:?}",
            parser
                .diags
                .iter()
                .map(|d| d.message.clone())
                .collect::<Vec<_>>()
        );
        file
    }

    fn main_body(file: &FileAst) -> &Block {
        for decl in &file.decls {
            if let Decl::Func(f) = decl {
                if f.name == "main" {
                    return f.body.as_ref().expect("main body");
                }
            }
        }
        panic!("no main function");
    }

    #[test]
    fn parses_package_imports_and_main() {
        let file = parse("package main\n\nimport (\n\t\"fmt\"\n\t\"time\"\n)\n\nfunc main() {\n\tfmt.Println(time.Now())\n}\n");
        assert_eq!(file.package, "main");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].path, "fmt");
        assert_eq!(main_body(&file).stmts.len(), 1);
    }

    #[test]
    fn parses_define_assign_and_incdec() {
        let file = parse("package main\nfunc main() {\n\tx := 10\n\tx = 20\n\tx++\n\tx--\n\tx += 5\n}\n");
        let body = main_body(&file);
        assert_eq!(body.stmts.len(), 5);
        assert!(matches!(
            body.stmts[0],
            Stmt::Assign {
                op: AssignOp::Define,
                ..
            }
        ));
        assert!(matches!(
            body.stmts[2],
            Stmt::IncDec {
                op: IncDecOp::Inc,
                ..
            }
        ));
        assert!(matches!(
            body.stmts[4],
            Stmt::Assign {
                op: AssignOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn parses_if_with_init_and_else_chain() {
        let file = parse(
            "package main\nfunc main() {\n\tif x := 1; x > 0 {\n\t} else if x < 0 {\n\t} else {\n\t}\n}\n",
        );
        let body = main_body(&file);
        let Stmt::If(ifstmt) = &body.stmts[0] else {
            panic!("expected if");
        };
        assert!(ifstmt.init.is_some());
        let Some(els) = &ifstmt.els else {
            panic!("expected else");
        };
        assert!(matches!(**els, Stmt::If(_)));
    }

    #[test]
    fn parses_three_clause_for_and_range() {
        let file = parse(
            "package main\nfunc main() {\n\tfor i := 0; i < 10; i++ {\n\t}\n\tfor k, v := range m {\n\t\t_ = k\n\t\t_ = v\n\t}\n}\n",
        );
        let body = main_body(&file);
        let Stmt::For(f) = &body.stmts[0] else {
            panic!("expected for");
        };
        assert!(f.init.is_some() && f.cond.is_some() && f.post.is_some());
        let Stmt::Range(r) = &body.stmts[1] else {
            panic!("expected range");
        };
        assert!(r.define && r.key.is_some() && r.value.is_some());
    }

    #[test]
    fn composite_literal_suppressed_in_if_header() {
        let file = parse("package main\nfunc main() {\n\tif x == y {\n\t\tz := Point{X: 1}\n\t\t_ = z\n\t}\n}\n");
        let body = main_body(&file);
        assert!(matches!(body.stmts[0], Stmt::If(_)));
    }

    #[test]
    fn parses_composite_literals_and_indexing() {
        let file = parse(
            "package main\nfunc main() {\n\tarr := []int{1, 2, 3}\n\tm := map[string]int{\"a\": 1}\n\tmatrix := [][]int{{1, 2}, {3, 4}}\n\tarr[0] = m[\"a\"] + matrix[1][0]\n}\n",
        );
        let body = main_body(&file);
        assert_eq!(body.stmts.len(), 4);
        let Stmt::Assign { rhs, .. } = &body.stmts[2] else {
            panic!("expected assign");
        };
        let ExprKind::CompositeLit { ty: Some(_), elems } = &rhs[0].kind else {
            panic!("expected composite literal");
        };
        assert_eq!(elems.len(), 2);
        assert!(matches!(
            elems[0].value.kind,
            ExprKind::CompositeLit { ty: None, .. }
        ));
    }

    #[test]
    fn parses_go_and_channel_statements() {
        let file = parse(
            "package main\nfunc main() {\n\tch := make(chan int)\n\tgo func() {\n\t\tch <- 100\n\t}()\n\td := <-ch\n\t_ = d\n}\n",
        );
        let body = main_body(&file);
        assert!(matches!(body.stmts[1], Stmt::Go { .. }));
        let Stmt::Assign { rhs, .. } = &body.stmts[2] else {
            panic!("expected receive assign");
        };
        assert!(matches!(
            rhs[0].kind,
            ExprKind::Unary {
                op: UnaryOp::Recv,
                ..
            }
        ));
    }

    #[test]
    fn parses_methods_and_struct_decls() {
        let file = parse(
            "package counter\n\ntype Counter struct {\n\tvalue int\n}\n\nfunc NewCounter() *Counter {\n\treturn &Counter{value: 0}\n}\n\nfunc (c *Counter) Increment() {\n\tc.value++\n}\n",
        );
        assert_eq!(file.decls.len(), 3);
        let Decl::Func(inc) = &file.decls[2] else {
            panic!("expected func");
        };
        assert!(inc.recv.is_some());
    }

    #[test]
    fn parses_switch_and_type_assert() {
        let file = parse(
            "package main\nfunc main() {\n\tswitch x {\n\tcase 1, 2:\n\t\ty := 1\n\t\t_ = y\n\tdefault:\n\t}\n\tvar i interface{} = 42\n\tnum, ok := i.(int)\n\t_, _ = num, ok\n}\n",
        );
        let body = main_body(&file);
        let Stmt::Switch(sw) = &body.stmts[0] else {
            panic!("expected switch");
        };
        assert_eq!(sw.cases.len(), 2);
        assert!(sw.cases[1].exprs.is_empty());
    }

    #[test]
    fn expr_ids_are_unique_and_monotonic() {
        let tokens = Lexer::new("package main\nfunc main() {\n\tx := y + z\n}\n").lex_all();
        let mut parser = Parser::new(tokens);
        let _ = parser.parse_file().expect("parse");
        assert!(parser.next_expr_id() > 0);
    }

    #[test]
    fn parses_variadic_and_multi_name_params() {
        let file = parse(
            "package main\nfunc add(a, b int, rest ...int) int {\n\treturn a + b\n}\nfunc main() {\n\t_ = add(1, 2)\n}\n",
        );
        let Decl::Func(add) = &file.decls[0] else {
            panic!("expected func");
        };
        assert_eq!(add.params.len(), 2);
        assert_eq!(add.params[0].names, vec!["a", "b"]);
        assert!(matches!(
            add.params[1].ty.kind,
            TypeAstKind::Ellipsis(_)
        ));
    }
}
