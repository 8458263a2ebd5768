use super::ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    IntLit(String),
    FloatLit(String),
    // Verbatim text, quotes included.
    StringLit(String),
    CharLit(String),
    Unknown(char),
    Keyword(Keyword),
    Symbol(Symbol),
    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Keyword {
    Package,
    Import,
    Func,
    Var,
    Const,
    Type,
    Struct,
    Interface,
    Map,
    Chan,
    If,
    Else,
    For,
    Range,
    Switch,
    Case,
    Default,
    Select,
    Go,
    Defer,
    Return,
    Break,
    Continue,
    Goto,
    Fallthrough,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Symbol {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    Ellipsis,
    Assign,
    Define,
    Arrow,
    Inc,
    Dec,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    AmpCaret,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    AmpCaretAssign,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    bytes: &'a [u8],
    idx: usize,
    line: usize,
    col: usize,
    prev_can_insert_semi: bool,
    pending_semi: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            bytes: src.as_bytes(),
            idx: 0,
            line: 1,
            col: 1,
            prev_can_insert_semi: false,
            pending_semi: false,
        }
    }

    pub fn lex_all(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn semi_token(&self) -> Token {
        Token {
            kind: TokenKind::Symbol(Symbol::Semi),
            span: Span {
                start: self.idx,
                end: self.idx,
                line: self.line,
                column: self.col,
            },
        }
    }

    fn next_token(&mut self) -> Token {
        if self.pending_semi {
            self.pending_semi = false;
            return self.semi_token();
        }
        self.skip_whitespace_and_comments();
        if self.pending_semi {
            self.pending_semi = false;
            return self.semi_token();
        }
        let start = self.idx;
        let (line, column) = (self.line, self.col);
        if self.idx >= self.bytes.len() {
            // A final automatic semicolon closes the last line.
            if self.prev_can_insert_semi {
                self.prev_can_insert_semi = false;
                return self.semi_token();
            }
            return Token {
                kind: TokenKind::Eof,
                span: Span {
                    start,
                    end: start,
                    line,
                    column,
                },
            };
        }
        let ch = self.peek_char();
        if is_ident_start(ch) {
            let ident = self.read_while(is_ident_continue);
            let kind = match ident.as_str() {
                "package" => TokenKind::Keyword(Keyword::Package),
                "import" => TokenKind::Keyword(Keyword::Import),
                "func" => TokenKind::Keyword(Keyword::Func),
                "var" => TokenKind::Keyword(Keyword::Var),
                "const" => TokenKind::Keyword(Keyword::Const),
                "type" => TokenKind::Keyword(Keyword::Type),
                "struct" => TokenKind::Keyword(Keyword::Struct),
                "interface" => TokenKind::Keyword(Keyword::Interface),
                "map" => TokenKind::Keyword(Keyword::Map),
                "chan" => TokenKind::Keyword(Keyword::Chan),
                "if" => TokenKind::Keyword(Keyword::If),
                "else" => TokenKind::Keyword(Keyword::Else),
                "for" => TokenKind::Keyword(Keyword::For),
                "range" => TokenKind::Keyword(Keyword::Range),
                "switch" => TokenKind::Keyword(Keyword::Switch),
                "case" => TokenKind::Keyword(Keyword::Case),
                "default" => TokenKind::Keyword(Keyword::Default),
                "select" => TokenKind::Keyword(Keyword::Select),
                "go" => TokenKind::Keyword(Keyword::Go),
                "defer" => TokenKind::Keyword(Keyword::Defer),
                "return" => TokenKind::Keyword(Keyword::Return),
                "break" => TokenKind::Keyword(Keyword::Break),
                "continue" => TokenKind::Keyword(Keyword::Continue),
                "goto" => TokenKind::Keyword(Keyword::Goto),
                "fallthrough" => TokenKind::Keyword(Keyword::Fallthrough),
                _ => TokenKind::Ident(ident),
            };
            let end = self.idx;
            self.prev_can_insert_semi = can_insert_semi_after(&kind);
            return Token {
                kind,
                span: Span {
                    start,
                    end,
                    line,
                    column,
                },
            };
        }
        if ch.is_ascii_digit() {
            let (text, is_float) = self.read_number();
            let kind = if is_float {
                TokenKind::FloatLit(text)
            } else {
                TokenKind::IntLit(text)
            };
            let end = self.idx;
            self.prev_can_insert_semi = can_insert_semi_after(&kind);
            return Token {
                kind,
                span: Span {
                    start,
                    end,
                    line,
                    column,
                },
            };
        }
        let kind = match ch {
            '"' => TokenKind::StringLit(self.read_string('"')),
            '`' => TokenKind::StringLit(self.read_raw_string()),
            '\'' => TokenKind::CharLit(self.read_string('\'')),
            '(' => {
                self.advance();
                TokenKind::Symbol(Symbol::LParen)
            }
            ')' => {
                self.advance();
                TokenKind::Symbol(Symbol::RParen)
            }
            '{' => {
                self.advance();
                TokenKind::Symbol(Symbol::LBrace)
            }
            '}' => {
                self.advance();
                TokenKind::Symbol(Symbol::RBrace)
            }
            '[' => {
                self.advance();
                TokenKind::Symbol(Symbol::LBracket)
            }
            ']' => {
                self.advance();
                TokenKind::Symbol(Symbol::RBracket)
            }
            ',' => {
                self.advance();
                TokenKind::Symbol(Symbol::Comma)
            }
            ';' => {
                self.advance();
                TokenKind::Symbol(Symbol::Semi)
            }
            ':' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::Define)
                } else {
                    TokenKind::Symbol(Symbol::Colon)
                }
            }
            '.' => {
                self.advance();
                if self.peek_char() == '.' && self.peek_next_char() == '.' {
                    self.advance();
                    self.advance();
                    TokenKind::Symbol(Symbol::Ellipsis)
                } else {
                    TokenKind::Symbol(Symbol::Dot)
                }
            }
            '+' => {
                self.advance();
                match self.peek_char() {
                    '+' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::Inc)
                    }
                    '=' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::PlusAssign)
                    }
                    _ => TokenKind::Symbol(Symbol::Plus),
                }
            }
            '-' => {
                self.advance();
                match self.peek_char() {
                    '-' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::Dec)
                    }
                    '=' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::MinusAssign)
                    }
                    _ => TokenKind::Symbol(Symbol::Minus),
                }
            }
            '*' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::StarAssign)
                } else {
                    TokenKind::Symbol(Symbol::Star)
                }
            }
            '/' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::SlashAssign)
                } else {
                    TokenKind::Symbol(Symbol::Slash)
                }
            }
            '%' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::PercentAssign)
                } else {
                    TokenKind::Symbol(Symbol::Percent)
                }
            }
            '&' => {
                self.advance();
                match self.peek_char() {
                    '&' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::AndAnd)
                    }
                    '^' => {
                        self.advance();
                        if self.peek_char() == '=' {
                            self.advance();
                            TokenKind::Symbol(Symbol::AmpCaretAssign)
                        } else {
                            TokenKind::Symbol(Symbol::AmpCaret)
                        }
                    }
                    '=' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::AmpAssign)
                    }
                    _ => TokenKind::Symbol(Symbol::Amp),
                }
            }
            '|' => {
                self.advance();
                match self.peek_char() {
                    '|' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::OrOr)
                    }
                    '=' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::PipeAssign)
                    }
                    _ => TokenKind::Symbol(Symbol::Pipe),
                }
            }
            '^' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::CaretAssign)
                } else {
                    TokenKind::Symbol(Symbol::Caret)
                }
            }
            '!' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::NotEq)
                } else {
                    TokenKind::Symbol(Symbol::Bang)
                }
            }
            '=' => {
                self.advance();
                if self.peek_char() == '=' {
                    self.advance();
                    TokenKind::Symbol(Symbol::EqEq)
                } else {
                    TokenKind::Symbol(Symbol::Assign)
                }
            }
            '<' => {
                self.advance();
                match self.peek_char() {
                    '-' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::Arrow)
                    }
                    '=' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::Lte)
                    }
                    '<' => {
                        self.advance();
                        if self.peek_char() == '=' {
                            self.advance();
                            TokenKind::Symbol(Symbol::ShlAssign)
                        } else {
                            TokenKind::Symbol(Symbol::Shl)
                        }
                    }
                    _ => TokenKind::Symbol(Symbol::Lt),
                }
            }
            '>' => {
                self.advance();
                match self.peek_char() {
                    '=' => {
                        self.advance();
                        TokenKind::Symbol(Symbol::Gte)
                    }
                    '>' => {
                        self.advance();
                        if self.peek_char() == '=' {
                            self.advance();
                            TokenKind::Symbol(Symbol::ShrAssign)
                        } else {
                            TokenKind::Symbol(Symbol::Shr)
                        }
                    }
                    _ => TokenKind::Symbol(Symbol::Gt),
                }
            }
            _ => {
                self.advance();
                TokenKind::Unknown(ch)
            }
        };
        let end = self.idx;
        self.prev_can_insert_semi = can_insert_semi_after(&kind);
        Token {
            kind,
            span: Span {
                start,
                end,
                line,
                column,
            },
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.idx >= self.bytes.len() {
                return;
            }
            let ch = self.peek_char();
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    if self.prev_can_insert_semi {
                        self.prev_can_insert_semi = false;
                        self.pending_semi = true;
                        return;
                    }
                }
                '/' if self.peek_next_char() == '/' => {
                    self.advance();
                    self.advance();
                    while self.idx < self.bytes.len() && self.peek_char() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_next_char() == '*' => {
                    self.advance();
                    self.advance();
                    let mut crossed_line = false;
                    while self.idx < self.bytes.len() {
                        if self.peek_char() == '\n' {
                            crossed_line = true;
                        }
                        if self.peek_char() == '*' && self.peek_next_char() == '/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                    // A block comment spanning lines acts as a newline.
                    if crossed_line && self.prev_can_insert_semi {
                        self.prev_can_insert_semi = false;
                        self.pending_semi = true;
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    // Reads a quoted literal verbatim, honoring backslash escapes. The
    // returned text includes the delimiters.
    fn read_string(&mut self, quote: char) -> String {
        let mut s = String::new();
        s.push(quote);
        self.advance();
        while self.idx < self.bytes.len() {
            let ch = self.peek_char();
            if ch == quote {
                s.push(ch);
                self.advance();
                break;
            }
            if ch == '\\' {
                s.push(ch);
                self.advance();
                if self.idx < self.bytes.len() {
                    s.push(self.peek_char());
                    self.advance();
                }
                continue;
            }
            if ch == '\n' {
                break;
            }
            s.push(ch);
            self.advance();
        }
        s
    }

    fn read_raw_string(&mut self) -> String {
        let mut s = String::new();
        s.push('`');
        self.advance();
        while self.idx < self.bytes.len() {
            let ch = self.peek_char();
            s.push(ch);
            self.advance();
            if ch == '`' {
                break;
            }
        }
        s
    }

    fn read_number(&mut self) -> (String, bool) {
        let mut s = String::new();
        let mut is_float = false;
        if self.peek_char() == '0'
            && matches!(self.peek_next_char(), 'x' | 'X' | 'b' | 'B' | 'o' | 'O')
        {
            s.push(self.peek_char());
            self.advance();
            s.push(self.peek_char());
            self.advance();
            s.push_str(&self.read_while(|c| c.is_ascii_hexdigit() || c == '_'));
            return (s, false);
        }
        s.push_str(&self.read_while(|c| c.is_ascii_digit() || c == '_'));
        if self.peek_char() == '.' && self.peek_next_char().is_ascii_digit() {
            is_float = true;
            s.push('.');
            self.advance();
            s.push_str(&self.read_while(|c| c.is_ascii_digit() || c == '_'));
        }
        if matches!(self.peek_char(), 'e' | 'E') {
            let sign_ok = matches!(self.peek_next_char(), '+' | '-')
                || self.peek_next_char().is_ascii_digit();
            if sign_ok {
                is_float = true;
                s.push(self.peek_char());
                self.advance();
                if matches!(self.peek_char(), '+' | '-') {
                    s.push(self.peek_char());
                    self.advance();
                }
                s.push_str(&self.read_while(|c| c.is_ascii_digit()));
            }
        }
        (s, is_float)
    }

    fn read_while<F>(&mut self, f: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut s = String::new();
        while self.idx < self.bytes.len() {
            let ch = self.peek_char();
            if !f(ch) {
                break;
            }
            s.push(ch);
            self.advance();
        }
        s
    }

    fn advance(&mut self) {
        if self.idx >= self.bytes.len() {
            return;
        }
        let ch = self.peek_char();
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    fn peek_char(&self) -> char {
        self.bytes.get(self.idx).copied().unwrap_or(b'\0') as char
    }

    fn peek_next_char(&self) -> char {
        self.bytes.get(self.idx + 1).copied().unwrap_or(b'\0') as char
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn can_insert_semi_after(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Ident(_) => true,
        TokenKind::IntLit(_) => true,
        TokenKind::FloatLit(_) => true,
        TokenKind::StringLit(_) => true,
        TokenKind::CharLit(_) => true,
        TokenKind::Keyword(
            Keyword::Return | Keyword::Break | Keyword::Continue | Keyword::Fallthrough,
        ) => true,
        TokenKind::Symbol(
            Symbol::RParen | Symbol::RBracket | Symbol::RBrace | Symbol::Inc | Symbol::Dec,
        ) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .lex_all()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn semicolon_inserted_at_line_end_after_value() {
        let ks = kinds("x := 10\ny := 20\n");
        let semis = ks
            .iter()
            .filter(|k| matches!(k, TokenKind::Symbol(Symbol::Semi)))
            .count();
        assert_eq!(semis, 2);
    }

    #[test]
    fn no_semicolon_after_binary_operator_at_line_end() {
        let ks = kinds("x := a +\nb\n");
        // Only the final line break produces a semicolon.
        let semis = ks
            .iter()
            .filter(|k| matches!(k, TokenKind::Symbol(Symbol::Semi)))
            .count();
        assert_eq!(semis, 1);
    }

    #[test]
    fn semicolon_inserted_after_inc_dec() {
        let ks = kinds("x++\n");
        assert!(matches!(ks[1], TokenKind::Symbol(Symbol::Inc)));
        assert!(matches!(ks[2], TokenKind::Symbol(Symbol::Semi)));
    }

    #[test]
    fn arrow_define_and_shift_tokens() {
        let ks = kinds("ch <- v; x := 1 << 2; y >>= 1");
        assert!(ks.contains(&TokenKind::Symbol(Symbol::Arrow)));
        assert!(ks.contains(&TokenKind::Symbol(Symbol::Define)));
        assert!(ks.contains(&TokenKind::Symbol(Symbol::Shl)));
        assert!(ks.contains(&TokenKind::Symbol(Symbol::ShrAssign)));
    }

    #[test]
    fn string_literal_keeps_raw_text() {
        let ks = kinds(r#"s := "a\"b""#);
        assert!(ks.contains(&TokenKind::StringLit(r#""a\"b""#.to_string())));
    }

    #[test]
    fn multiline_block_comment_acts_as_newline() {
        let ks = kinds("x = 1 /* spans\nlines */ y = 2");
        let semi_pos = ks
            .iter()
            .position(|k| matches!(k, TokenKind::Symbol(Symbol::Semi)));
        let y_pos = ks
            .iter()
            .position(|k| matches!(k, TokenKind::Ident(n) if n == "y"));
        assert!(semi_pos.unwrap() < y_pos.unwrap());
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        let ks = kinds("forward := mapping");
        assert!(matches!(&ks[0], TokenKind::Ident(n) if n == "forward"));
        assert!(matches!(&ks[2], TokenKind::Ident(n) if n == "mapping"));
    }
}
