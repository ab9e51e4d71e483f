/// Recursive-descent parser for the TSX subset generated components use.
/// Type syntax is recognised and discarded; JSX is lowered on the fly.
use std::sync::Arc;

use super::ast::{
    Arg, ArrayItem, AssignOp, BinaryOp, Expr, Function, FunctionBody, LogicalOp, MemberProp,
    ObjectPatternProp, ObjectProp, Param, Pattern, Program, PropKey, Stmt, SwitchCase,
    TemplatePart, UnaryOp, VarDeclarator, VarKind,
};
use super::error::SyntaxError;
use super::jsx::{self, JsxAttr};
use super::lexer::{self, TemplateChunk, Tok, Token};
use super::emit::number_to_string;

pub fn parse_program(src: &str) -> Result<Program, SyntaxError> {
    let mut p = Parser::new(src, 0, src.len());
    let mut body = Vec::new();
    while p.peek()?.tok != Tok::Eof {
        body.push(p.parse_statement()?);
    }
    Ok(Program { body })
}

// ──────────────────────────────────────────────
// Parser state
// ──────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    end: usize,
    peeked: Option<(usize, Token)>,
    depth: usize,
}

pub const MAX_NESTING: usize = 256;

enum Binop {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, start: usize, end: usize) -> Self {
        Parser {
            src,
            pos: start,
            end,
            peeked: None,
            depth: 0,
        }
    }

    fn peek(&mut self) -> Result<Token, SyntaxError> {
        if let Some((at, tok)) = &self.peeked {
            if *at == self.pos {
                return Ok(tok.clone());
            }
        }
        let tok = lexer::lex_at(self.src, self.pos, self.end)?;
        self.peeked = Some((self.pos, tok.clone()));
        Ok(tok)
    }

    /// The token after the next one.
    fn peek2(&mut self) -> Result<Token, SyntaxError> {
        let first = self.peek()?;
        lexer::lex_at(self.src, first.end, self.end)
    }

    fn bump(&mut self) -> Result<Token, SyntaxError> {
        let tok = self.peek()?;
        self.pos = tok.end;
        Ok(tok)
    }

    fn err(&self, offset: usize, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.src, offset, msg)
    }

    fn unexpected(&mut self, expected: &str) -> SyntaxError {
        match self.peek() {
            Ok(t) => {
                let found = describe(&t.tok);
                self.err(t.start, format!("expected {expected}, found {found}"))
            }
            Err(e) => e,
        }
    }

    fn is_punct(&mut self, p: &str) -> Result<bool, SyntaxError> {
        Ok(self.peek()?.is_punct(p))
    }

    fn is_ident(&mut self, w: &str) -> Result<bool, SyntaxError> {
        Ok(self.peek()?.is_ident(w))
    }

    fn eat_punct(&mut self, p: &str) -> Result<bool, SyntaxError> {
        if self.is_punct(p)? {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_ident(&mut self, w: &str) -> Result<bool, SyntaxError> {
        if self.is_ident(w)? {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), SyntaxError> {
        if self.eat_punct(p)? {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{p}'")))
        }
    }

    fn take_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek()?.tok {
            Tok::Ident(name) => {
                self.bump()?;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn consume_semicolon(&mut self) -> Result<(), SyntaxError> {
        let t = self.peek()?;
        if t.is_punct(";") {
            self.bump()?;
            return Ok(());
        }
        if t.is_punct("}") || t.tok == Tok::Eof || t.newline_before {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.err(self.pos, "source nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Raw character after trivia, for JSX punctuation that must not be
    /// merged into multi-character operators (`/>`, `>=`).
    fn raw_char(&mut self) -> Result<Option<char>, SyntaxError> {
        let (at, _) = lexer::skip_trivia(self.src, self.pos, self.end)?;
        self.pos = at;
        Ok(self.src[at..self.end].chars().next())
    }

    fn raw_expect(&mut self, c: char) -> Result<(), SyntaxError> {
        match self.raw_char()? {
            Some(found) if found == c => {
                self.pos += c.len_utf8();
                Ok(())
            }
            _ => Err(self.err(self.pos, format!("expected '{c}' in JSX"))),
        }
    }

    // ──────────────────────────────────────────────
    // Statements
    // ──────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.enter()?;
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, SyntaxError> {
        let t = self.peek()?;
        match &t.tok {
            Tok::Punct("{") => Ok(Stmt::Block(self.parse_block()?)),
            Tok::Punct(";") => {
                self.bump()?;
                Ok(Stmt::Empty)
            }
            Tok::Ident(word) => match word.as_str() {
                "const" | "let" | "var" => {
                    if word == "const" && self.peek2()?.is_ident("enum") {
                        self.bump()?;
                        return self.parse_enum();
                    }
                    let stmt = self.parse_var_decl()?;
                    self.consume_semicolon()?;
                    Ok(stmt)
                }
                "function" => {
                    let f = self.parse_function(true)?;
                    Ok(Stmt::Function(Arc::new(f)))
                }
                "async" if self.peek2()?.is_ident("function") => {
                    self.bump()?;
                    let f = self.parse_function(true)?;
                    Ok(Stmt::Function(Arc::new(f)))
                }
                "return" => {
                    self.bump()?;
                    let next = self.peek()?;
                    let arg = if next.is_punct(";")
                        || next.is_punct("}")
                        || next.tok == Tok::Eof
                        || next.newline_before
                    {
                        None
                    } else {
                        Some(self.parse_expression()?)
                    };
                    self.consume_semicolon()?;
                    Ok(Stmt::Return(arg))
                }
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => {
                    self.bump()?;
                    self.expect_punct("(")?;
                    let test = self.parse_expression()?;
                    self.expect_punct(")")?;
                    let body = Box::new(self.parse_statement()?);
                    Ok(Stmt::While { test, body })
                }
                "do" => {
                    self.bump()?;
                    let body = Box::new(self.parse_statement()?);
                    if !self.eat_ident("while")? {
                        return Err(self.unexpected("'while'"));
                    }
                    self.expect_punct("(")?;
                    let test = self.parse_expression()?;
                    self.expect_punct(")")?;
                    self.eat_punct(";")?;
                    Ok(Stmt::DoWhile { body, test })
                }
                "break" => {
                    self.bump()?;
                    self.consume_semicolon()?;
                    Ok(Stmt::Break)
                }
                "continue" => {
                    self.bump()?;
                    self.consume_semicolon()?;
                    Ok(Stmt::Continue)
                }
                "throw" => {
                    self.bump()?;
                    let arg = self.parse_expression()?;
                    self.consume_semicolon()?;
                    Ok(Stmt::Throw(arg))
                }
                "try" => self.parse_try(),
                "switch" => self.parse_switch(),
                "interface" if matches!(self.peek2()?.tok, Tok::Ident(_)) => {
                    self.skip_interface()?;
                    Ok(Stmt::Empty)
                }
                "type" if matches!(self.peek2()?.tok, Tok::Ident(_)) => {
                    self.skip_type_alias()?;
                    Ok(Stmt::Empty)
                }
                "enum" if matches!(self.peek2()?.tok, Tok::Ident(_)) => self.parse_enum(),
                "declare" if !self.peek2()?.newline_before => {
                    self.bump()?;
                    self.skip_declaration()?;
                    Ok(Stmt::Empty)
                }
                "class" | "abstract" => Err(self.err(
                    t.start,
                    "class components are not supported; expected a function component",
                )),
                "import" | "export" if !self.peek2()?.is_punct("(") => Err(self.err(
                    t.start,
                    format!("unexpected '{word}': module syntax is not available in the sandbox"),
                )),
                _ => self.parse_expression_statement(),
            },
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        loop {
            let t = self.peek()?;
            if t.is_punct("}") {
                self.bump()?;
                return Ok(body);
            }
            if t.tok == Tok::Eof {
                return Err(self.err(t.start, "unexpected end of input, expected '}'"));
            }
            body.push(self.parse_statement()?);
        }
    }

    fn var_kind(&mut self) -> Result<VarKind, SyntaxError> {
        let kind = match self.take_ident()?.as_str() {
            "const" => VarKind::Const,
            "let" => VarKind::Let,
            _ => VarKind::Var,
        };
        Ok(kind)
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, SyntaxError> {
        let kind = self.var_kind()?;
        let decls = self.parse_declarators()?;
        Ok(Stmt::Var { kind, decls })
    }

    fn parse_declarators(&mut self) -> Result<Vec<VarDeclarator>, SyntaxError> {
        let mut decls = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            self.eat_punct("!")?;
            if self.eat_punct(":")? {
                self.skip_type()?;
            }
            let init = if self.eat_punct("=")? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            decls.push(VarDeclarator { target, init });
            if !self.eat_punct(",")? {
                return Ok(decls);
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump()?;
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let cons = Box::new(self.parse_statement()?);
        let alt = if self.eat_ident("else")? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { test, cons, alt })
    }

    fn parse_for(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump()?;
        self.expect_punct("(")?;
        let mut init = None;
        let t = self.peek()?;
        if t.is_ident("const") || t.is_ident("let") || t.is_ident("var") {
            let kind = self.var_kind()?;
            let target = self.parse_binding_target()?;
            if self.eat_punct(":")? {
                self.skip_type()?;
            }
            if self.eat_ident("of")? {
                return self.finish_for_of(kind, target);
            }
            if self.eat_ident("in")? {
                return self.finish_for_in(kind, target);
            }
            let first_init = if self.eat_punct("=")? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            let mut decls = vec![VarDeclarator {
                target,
                init: first_init,
            }];
            if self.eat_punct(",")? {
                decls.extend(self.parse_declarators()?);
            }
            init = Some(Box::new(Stmt::Var { kind, decls }));
        } else if let Tok::Ident(name) = &t.tok {
            let next = self.peek2()?;
            if next.is_ident("of") || next.is_ident("in") {
                let name = name.clone();
                self.bump()?;
                let is_of = self.bump()?.is_ident("of");
                let target = Pattern::Ident(name);
                return if is_of {
                    self.finish_for_of(VarKind::Var, target)
                } else {
                    self.finish_for_in(VarKind::Var, target)
                };
            }
            init = Some(Box::new(Stmt::Expr(self.parse_expression()?)));
        } else if !t.is_punct(";") {
            init = Some(Box::new(Stmt::Expr(self.parse_expression()?)));
        }
        self.expect_punct(";")?;
        let test = if self.is_punct(";")? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")")? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn finish_for_of(&mut self, kind: VarKind, target: Pattern) -> Result<Stmt, SyntaxError> {
        let iter = self.parse_assignment()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::ForOf {
            kind,
            target,
            iter,
            body,
        })
    }

    fn finish_for_in(&mut self, kind: VarKind, target: Pattern) -> Result<Stmt, SyntaxError> {
        let object = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::ForIn {
            kind,
            target,
            object,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump()?;
        let block = self.parse_block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_ident("catch")? {
            if self.eat_punct("(")? {
                param = Some(self.parse_binding_target()?);
                if self.eat_punct(":")? {
                    self.skip_type()?;
                }
                self.expect_punct(")")?;
            }
            handler = Some(self.parse_block()?);
        }
        let finalizer = if self.eat_ident("finally")? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }
        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump()?;
        self.expect_punct("(")?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;
        let mut cases: Vec<SwitchCase> = Vec::new();
        loop {
            let t = self.peek()?;
            if t.is_punct("}") {
                self.bump()?;
                break;
            }
            if self.eat_ident("case")? {
                let test = self.parse_expression()?;
                self.expect_punct(":")?;
                cases.push(SwitchCase {
                    test: Some(test),
                    body: Vec::new(),
                });
            } else if self.eat_ident("default")? {
                self.expect_punct(":")?;
                cases.push(SwitchCase {
                    test: None,
                    body: Vec::new(),
                });
            } else {
                if t.tok == Tok::Eof {
                    return Err(self.err(t.start, "unterminated switch statement"));
                }
                let stmt = self.parse_statement()?;
                match cases.last_mut() {
                    Some(case) => case.body.push(stmt),
                    None => return Err(self.err(t.start, "statement before first case")),
                }
            }
        }
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    /// `enum E { A, B = "b" }` becomes `const E = { A: 0, B: "b" }`.
    fn parse_enum(&mut self) -> Result<Stmt, SyntaxError> {
        self.bump()?;
        let name = self.take_ident()?;
        self.expect_punct("{")?;
        let mut props = Vec::new();
        let mut next_value = 0.0;
        while !self.eat_punct("}")? {
            let key = match self.bump()?.tok {
                Tok::Ident(k) | Tok::Str(k) => k,
                _ => return Err(self.unexpected("enum member")),
            };
            let value = if self.eat_punct("=")? {
                let v = self.parse_assignment()?;
                if let Expr::Num(n) = v {
                    next_value = n + 1.0;
                }
                v
            } else {
                let v = Expr::Num(next_value);
                next_value += 1.0;
                v
            };
            props.push(ObjectProp::KeyValue(PropKey::Static(key), value));
            if !self.eat_punct(",")? {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Stmt::Var {
            kind: VarKind::Const,
            decls: vec![VarDeclarator {
                target: Pattern::Ident(name),
                init: Some(Expr::Object(props)),
            }],
        })
    }

    // ──────────────────────────────────────────────
    // Type erasure
    // ──────────────────────────────────────────────

    fn skip_interface(&mut self) -> Result<(), SyntaxError> {
        self.bump()?;
        loop {
            let t = self.peek()?;
            if t.is_punct("{") {
                return self.skip_balanced("{", "}");
            }
            if t.tok == Tok::Eof {
                return Err(self.err(t.start, "unterminated interface declaration"));
            }
            if t.is_punct("<") {
                self.skip_angle()?;
            } else {
                self.bump()?;
            }
        }
    }

    fn skip_type_alias(&mut self) -> Result<(), SyntaxError> {
        self.bump()?;
        self.take_ident()?;
        if self.is_punct("<")? {
            self.skip_angle()?;
        }
        self.expect_punct("=")?;
        self.skip_type()?;
        self.consume_semicolon()
    }

    fn skip_declaration(&mut self) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            let t = self.bump()?;
            match &t.tok {
                Tok::Eof => return Ok(()),
                Tok::Punct("{") => depth += 1,
                Tok::Punct("}") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.eat_punct(";")?;
                        return Ok(());
                    }
                }
                Tok::Punct(";") if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    fn skip_balanced(&mut self, open: &str, close: &str) -> Result<(), SyntaxError> {
        let start = self.peek()?.start;
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            let t = self.bump()?;
            if t.tok == Tok::Eof {
                return Err(self.err(start, format!("unbalanced '{open}'")));
            }
            if t.is_punct(open) {
                depth += 1;
            } else if t.is_punct(close) {
                depth -= 1;
            }
        }
        Ok(())
    }

    fn skip_angle(&mut self) -> Result<(), SyntaxError> {
        self.skip_balanced("<", ">")
    }

    /// Type arguments `<A, B<C>>` where every element must look like a type.
    fn skip_type_args(&mut self) -> Result<(), SyntaxError> {
        self.expect_punct("<")?;
        if self.eat_punct(">")? {
            return Ok(());
        }
        loop {
            self.skip_type()?;
            if self.eat_punct(",")? {
                continue;
            }
            return self.expect_punct(">");
        }
    }

    fn skip_type(&mut self) -> Result<(), SyntaxError> {
        self.enter()?;
        let result = self.skip_type_inner();
        self.leave();
        result
    }

    fn skip_type_inner(&mut self) -> Result<(), SyntaxError> {
        let _ = self.eat_punct("|")? || self.eat_punct("&")?;
        loop {
            self.skip_type_primary()?;
            while self.is_punct("[")? && !self.peek()?.newline_before {
                self.skip_balanced("[", "]")?;
            }
            if self.eat_ident("is")? {
                self.skip_type()?;
            }
            if self.eat_punct("|")? || self.eat_punct("&")? {
                continue;
            }
            if self.is_ident("extends")? {
                self.bump()?;
                self.skip_type()?;
                self.expect_punct("?")?;
                self.skip_type()?;
                self.expect_punct(":")?;
                self.skip_type()?;
            }
            return Ok(());
        }
    }

    fn skip_type_primary(&mut self) -> Result<(), SyntaxError> {
        let t = self.peek()?;
        match &t.tok {
            Tok::Punct("(") => {
                self.skip_balanced("(", ")")?;
                if self.eat_punct("=>")? {
                    self.skip_type()?;
                }
                Ok(())
            }
            Tok::Punct("{") => self.skip_balanced("{", "}"),
            Tok::Punct("[") => self.skip_balanced("[", "]"),
            Tok::Punct("<") => {
                self.skip_angle()?;
                self.skip_balanced("(", ")")?;
                self.expect_punct("=>")?;
                self.skip_type()
            }
            Tok::Str(_) | Tok::Num(_) | Tok::Template(_) => {
                self.bump()?;
                Ok(())
            }
            Tok::Punct("-") => {
                self.bump()?;
                match self.bump()?.tok {
                    Tok::Num(_) => Ok(()),
                    _ => Err(self.err(t.start, "expected numeric literal type")),
                }
            }
            Tok::Ident(word) => {
                match word.as_str() {
                    "typeof" => {
                        self.bump()?;
                        self.take_ident()?;
                        while self.eat_punct(".")? {
                            self.take_ident()?;
                        }
                    }
                    "keyof" | "readonly" | "unique" | "infer" | "new" | "asserts" => {
                        self.bump()?;
                        self.skip_type_primary()?;
                    }
                    _ => {
                        self.bump()?;
                        while self.eat_punct(".")? {
                            self.take_ident()?;
                        }
                        if self.is_punct("<")? {
                            self.skip_angle()?;
                        }
                    }
                }
                Ok(())
            }
            _ => Err(self.unexpected("type")),
        }
    }

    // ──────────────────────────────────────────────
    // Patterns and functions
    // ──────────────────────────────────────────────

    fn parse_binding_target(&mut self) -> Result<Pattern, SyntaxError> {
        let t = self.peek()?;
        match &t.tok {
            Tok::Punct("{") => self.parse_object_pattern(),
            Tok::Punct("[") => self.parse_array_pattern(),
            Tok::Ident(_) => Ok(Pattern::Ident(self.take_ident()?)),
            _ => Err(self.unexpected("binding pattern")),
        }
    }

    fn parse_binding_element(&mut self) -> Result<Pattern, SyntaxError> {
        let target = self.parse_binding_target()?;
        if self.eat_punct("=")? {
            let default = self.parse_assignment()?;
            return Ok(Pattern::Default(Box::new(target), Box::new(default)));
        }
        Ok(target)
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, SyntaxError> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        let mut rest = None;
        while !self.eat_punct("}")? {
            if self.eat_punct("...")? {
                rest = Some(self.take_ident()?);
                self.eat_punct(",")?;
                self.expect_punct("}")?;
                break;
            }
            let t = self.bump()?;
            let (key, shorthand) = match t.tok {
                Tok::Ident(name) => (PropKey::Static(name.clone()), Some(name)),
                Tok::Str(s) => (PropKey::Static(s), None),
                Tok::Num(n) => (PropKey::Static(number_to_string(n)), None),
                Tok::Punct("[") => {
                    let e = self.parse_assignment()?;
                    self.expect_punct("]")?;
                    (PropKey::Computed(Box::new(e)), None)
                }
                _ => return Err(self.err(t.start, "invalid object pattern key")),
            };
            let value = if self.eat_punct(":")? {
                self.parse_binding_element()?
            } else {
                let Some(name) = shorthand else {
                    return Err(self.err(t.start, "object pattern key needs a binding"));
                };
                let target = Pattern::Ident(name);
                if self.eat_punct("=")? {
                    let default = self.parse_assignment()?;
                    Pattern::Default(Box::new(target), Box::new(default))
                } else {
                    target
                }
            };
            props.push(ObjectPatternProp { key, value });
            if !self.eat_punct(",")? {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Pattern::Object { props, rest })
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, SyntaxError> {
        self.expect_punct("[")?;
        let mut elems = Vec::new();
        let mut rest = None;
        loop {
            if self.eat_punct("]")? {
                break;
            }
            if self.eat_punct(",")? {
                elems.push(None);
                continue;
            }
            if self.eat_punct("...")? {
                rest = Some(Box::new(self.parse_binding_target()?));
                self.expect_punct("]")?;
                break;
            }
            elems.push(Some(self.parse_binding_element()?));
            if !self.eat_punct(",")? {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(Pattern::Array { elems, rest })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, SyntaxError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")")? {
            let rest = self.eat_punct("...")?;
            if self.is_ident("this")? && params.is_empty() {
                // `this: Type` pseudo-parameter
                self.bump()?;
                self.expect_punct(":")?;
                self.skip_type()?;
                if !self.eat_punct(",")? {
                    self.expect_punct(")")?;
                    break;
                }
                continue;
            }
            let mut pattern = self.parse_binding_target()?;
            self.eat_punct("?")?;
            if self.eat_punct(":")? {
                self.skip_type()?;
            }
            if self.eat_punct("=")? {
                let default = self.parse_assignment()?;
                pattern = Pattern::Default(Box::new(pattern), Box::new(default));
            }
            params.push(Param { pattern, rest });
            if !self.eat_punct(",")? {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    fn parse_function(&mut self, require_name: bool) -> Result<Function, SyntaxError> {
        self.bump()?; // `function`
        self.eat_punct("*")?;
        let name = match self.peek()?.tok {
            Tok::Ident(_) => Some(self.take_ident()?),
            _ if require_name => return Err(self.unexpected("function name")),
            _ => None,
        };
        if self.is_punct("<")? {
            self.skip_angle()?;
        }
        let params = self.parse_params()?;
        if self.eat_punct(":")? {
            self.skip_type()?;
        }
        let body = FunctionBody::Block(self.parse_block()?);
        Ok(Function {
            name,
            params,
            body,
            is_arrow: false,
        })
    }

    /// Attempts to parse an arrow function at the current position; restores
    /// the position and returns `None` when the input is not one.
    fn try_arrow(&mut self) -> Result<Option<Expr>, SyntaxError> {
        let saved = self.pos;
        let t = self.peek()?;
        if t.is_ident("async") {
            let next = self.peek2()?;
            if !next.newline_before && (next.is_punct("(") || matches!(next.tok, Tok::Ident(_))) {
                self.bump()?;
                match self.try_arrow()? {
                    Some(f) => return Ok(Some(f)),
                    None => {
                        self.pos = saved;
                        return Ok(None);
                    }
                }
            }
        }
        let params = match &t.tok {
            Tok::Ident(name) => {
                let next = self.peek2()?;
                if !next.is_punct("=>") || next.newline_before {
                    return Ok(None);
                }
                let name = name.clone();
                self.bump()?;
                vec![Param {
                    pattern: Pattern::Ident(name),
                    rest: false,
                }]
            }
            Tok::Punct("(") | Tok::Punct("<") => {
                let attempt = (|| -> Result<Option<Vec<Param>>, SyntaxError> {
                    if self.is_punct("<")? {
                        self.skip_angle()?;
                    }
                    let params = self.parse_params()?;
                    if self.eat_punct(":")? {
                        self.skip_type()?;
                    }
                    let arrow = self.peek()?;
                    if arrow.is_punct("=>") && !arrow.newline_before {
                        Ok(Some(params))
                    } else {
                        Ok(None)
                    }
                })();
                match attempt {
                    Ok(Some(params)) => params,
                    _ => {
                        self.pos = saved;
                        return Ok(None);
                    }
                }
            }
            _ => return Ok(None),
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{")? {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assignment()?))
        };
        Ok(Some(Expr::Function(Arc::new(Function {
            name: None,
            params,
            body,
            is_arrow: true,
        }))))
    }

    // ──────────────────────────────────────────────
    // Expressions
    // ──────────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.parse_assignment()?;
        if !self.is_punct(",")? {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat_punct(",")? {
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(exprs))
    }

    fn parse_assignment(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.parse_assignment_inner();
        self.leave();
        result
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, SyntaxError> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }
        let start = self.peek()?.start;
        let left = self.parse_conditional()?;
        let t = self.peek()?;
        let op = match &t.tok {
            Tok::Punct("=") => AssignOp::Assign,
            Tok::Punct("+=") => AssignOp::Binary(BinaryOp::Add),
            Tok::Punct("-=") => AssignOp::Binary(BinaryOp::Sub),
            Tok::Punct("*=") => AssignOp::Binary(BinaryOp::Mul),
            Tok::Punct("/=") => AssignOp::Binary(BinaryOp::Div),
            Tok::Punct("%=") => AssignOp::Binary(BinaryOp::Rem),
            Tok::Punct("**=") => AssignOp::Binary(BinaryOp::Exp),
            Tok::Punct("||=") => AssignOp::Logical(LogicalOp::Or),
            Tok::Punct("&&=") => AssignOp::Logical(LogicalOp::And),
            Tok::Punct("??=") => AssignOp::Logical(LogicalOp::Nullish),
            _ => return Ok(left),
        };
        if !matches!(left, Expr::Ident(_) | Expr::Member { .. }) {
            return Err(self.err(start, "invalid assignment target"));
        }
        self.bump()?;
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.parse_binary(0)?;
        if !self.eat_punct("?")? {
            return Ok(test);
        }
        let cons = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alt = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            cons: Box::new(cons),
            alt: Box::new(alt),
        })
    }

    fn binary_op(tok: &Token) -> Option<(u8, Binop)> {
        use BinaryOp::*;
        let op = match &tok.tok {
            Tok::Punct(p) => match *p {
                "??" => (1, Binop::Logical(LogicalOp::Nullish)),
                "||" => (2, Binop::Logical(LogicalOp::Or)),
                "&&" => (3, Binop::Logical(LogicalOp::And)),
                "|" => (4, Binop::Binary(BitOr)),
                "^" => (5, Binop::Binary(BitXor)),
                "&" => (6, Binop::Binary(BitAnd)),
                "==" => (7, Binop::Binary(Eq)),
                "!=" => (7, Binop::Binary(NotEq)),
                "===" => (7, Binop::Binary(StrictEq)),
                "!==" => (7, Binop::Binary(StrictNotEq)),
                "<" => (8, Binop::Binary(Lt)),
                "<=" => (8, Binop::Binary(LtEq)),
                ">" => (8, Binop::Binary(Gt)),
                ">=" => (8, Binop::Binary(GtEq)),
                "+" => (9, Binop::Binary(Add)),
                "-" => (9, Binop::Binary(Sub)),
                "*" => (10, Binop::Binary(Mul)),
                "/" => (10, Binop::Binary(Div)),
                "%" => (10, Binop::Binary(Rem)),
                "**" => (11, Binop::Binary(Exp)),
                _ => return None,
            },
            Tok::Ident(w) if w == "in" => (8, Binop::Binary(In)),
            Tok::Ident(w) if w == "instanceof" => (8, Binop::Binary(InstanceOf)),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let t = self.peek()?;
            if (t.is_ident("as") || t.is_ident("satisfies")) && !t.newline_before && min_prec <= 8 {
                self.bump()?;
                if !self.eat_ident("const")? {
                    self.skip_type()?;
                }
                continue;
            }
            let Some((prec, op)) = Self::binary_op(&t) else {
                return Ok(left);
            };
            if prec < min_prec.max(1) {
                return Ok(left);
            }
            self.bump()?;
            let right = if prec == 11 {
                self.parse_binary(prec)?
            } else {
                self.parse_binary(prec + 1)?
            };
            left = match op {
                Binop::Binary(op) => Expr::Binary(op, Box::new(left), Box::new(right)),
                Binop::Logical(op) => Expr::Logical(op, Box::new(left), Box::new(right)),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.leave();
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, SyntaxError> {
        let t = self.peek()?;
        let op = match &t.tok {
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Punct("~") => Some(UnaryOp::BitNot),
            Tok::Ident(w) if w == "typeof" => Some(UnaryOp::Typeof),
            Tok::Ident(w) if w == "void" => Some(UnaryOp::Void),
            Tok::Ident(w) if w == "delete" => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let arg = self.parse_unary()?;
            return Ok(Expr::Unary(op, Box::new(arg)));
        }
        if t.is_punct("++") || t.is_punct("--") {
            self.bump()?;
            let target = self.parse_unary()?;
            return Ok(Expr::Update {
                increment: t.is_punct("++"),
                prefix: true,
                target: Box::new(target),
            });
        }
        if t.is_ident("await") {
            // Evaluation is synchronous; `await x` yields `x`.
            self.bump()?;
            return self.parse_unary();
        }
        let expr = self.parse_call_member()?;
        let next = self.peek()?;
        if (next.is_punct("++") || next.is_punct("--")) && !next.newline_before {
            self.bump()?;
            return Ok(Expr::Update {
                increment: next.is_punct("++"),
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, SyntaxError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")")? {
            if self.eat_punct("...")? {
                args.push(Arg::Spread(self.parse_assignment()?));
            } else {
                args.push(Arg::Expr(self.parse_assignment()?));
            }
            if !self.eat_punct(",")? {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn member_name(&mut self) -> Result<String, SyntaxError> {
        if self.eat_punct("#")? {
            return Ok(format!("#{}", self.take_ident()?));
        }
        self.take_ident()
    }

    /// Generic call arguments `f<T>(...)`; restores position if absent.
    fn try_type_args_before_call(&mut self) -> Result<bool, SyntaxError> {
        let saved = self.pos;
        let ok = self.skip_type_args().is_ok() && self.is_punct("(").unwrap_or(false);
        if !ok {
            self.pos = saved;
        }
        Ok(ok)
    }

    fn parse_call_member(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = if self.is_ident("new")? {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut optional_chain = false;
        loop {
            let t = self.peek()?;
            match &t.tok {
                Tok::Punct(".") => {
                    self.bump()?;
                    let name = self.member_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop: MemberProp::Static(name),
                        optional: false,
                    };
                }
                Tok::Punct("?.") => {
                    self.bump()?;
                    optional_chain = true;
                    if self.is_punct("(")? {
                        let args = self.parse_args()?;
                        expr = Expr::Call {
                            callee: Box::new(expr),
                            args,
                            optional: true,
                        };
                    } else if self.eat_punct("[")? {
                        let prop = self.parse_expression()?;
                        self.expect_punct("]")?;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            prop: MemberProp::Computed(Box::new(prop)),
                            optional: true,
                        };
                    } else {
                        let name = self.member_name()?;
                        expr = Expr::Member {
                            object: Box::new(expr),
                            prop: MemberProp::Static(name),
                            optional: true,
                        };
                    }
                }
                Tok::Punct("[") => {
                    self.bump()?;
                    let prop = self.parse_expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop: MemberProp::Computed(Box::new(prop)),
                        optional: false,
                    };
                }
                Tok::Punct("(") => {
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    };
                }
                Tok::Punct("!") if !t.newline_before => {
                    // non-null assertion
                    self.bump()?;
                }
                Tok::Punct("<") => {
                    if !self.try_type_args_before_call()? {
                        break;
                    }
                }
                _ => break,
            }
        }
        if optional_chain {
            expr = Expr::OptionalChain(Box::new(expr));
        }
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<Expr, SyntaxError> {
        self.bump()?;
        let mut callee = self.parse_primary()?;
        loop {
            if self.eat_punct(".")? {
                let name = self.member_name()?;
                callee = Expr::member(callee, &name);
            } else if self.is_punct("<")? {
                if !self.try_type_args_before_call()? {
                    break;
                }
            } else {
                break;
            }
        }
        let args = if self.is_punct("(")? {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let t = self.peek()?;
        match t.tok {
            Tok::Num(n) => {
                self.bump()?;
                Ok(Expr::Num(n))
            }
            Tok::Str(s) => {
                self.bump()?;
                Ok(Expr::Str(s))
            }
            Tok::Template(chunks) => {
                self.bump()?;
                self.parse_template(chunks)
            }
            Tok::Ident(word) => match word.as_str() {
                "true" => {
                    self.bump()?;
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.bump()?;
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.bump()?;
                    Ok(Expr::Null)
                }
                "this" => {
                    self.bump()?;
                    Ok(Expr::This)
                }
                "function" => Ok(Expr::Function(Arc::new(self.parse_function(false)?))),
                "async" if self.peek2()?.is_ident("function") => {
                    self.bump()?;
                    Ok(Expr::Function(Arc::new(self.parse_function(false)?)))
                }
                "class" => Err(self.err(t.start, "class expressions are not supported")),
                _ => {
                    self.bump()?;
                    Ok(Expr::Ident(word.clone()))
                }
            },
            Tok::Punct("(") => {
                self.bump()?;
                let e = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(e)
            }
            Tok::Punct("[") => self.parse_array_literal(),
            Tok::Punct("{") => self.parse_object_literal(),
            Tok::Punct("<") => self.parse_jsx_element(),
            Tok::Punct("/") | Tok::Punct("/=") => {
                let (tok, stop) = lexer::lex_regex(self.src, t.start, self.end)?;
                self.pos = stop;
                match tok {
                    Tok::Regex { pattern, flags } => Ok(Expr::Regex { pattern, flags }),
                    other => Err(self.err(t.start, format!("unexpected {}", describe(&other)))),
                }
            }
            Tok::Eof => Err(self.err(t.start, "unexpected end of input")),
            other => Err(self.err(t.start, format!("unexpected {}", describe(&other)))),
        }
    }

    fn parse_template(&mut self, chunks: Vec<TemplateChunk>) -> Result<Expr, SyntaxError> {
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match chunk {
                TemplateChunk::Text(s) => parts.push(TemplatePart::Text(s)),
                TemplateChunk::Expr(start, end) => {
                    let mut sub = Parser::new(self.src, start, end);
                    sub.depth = self.depth;
                    let e = sub.parse_expression()?;
                    let rest = sub.peek()?;
                    if rest.tok != Tok::Eof {
                        return Err(sub.err(rest.start, "unexpected token in template expression"));
                    }
                    parts.push(TemplatePart::Expr(e));
                }
            }
        }
        Ok(Expr::Template(parts))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        self.expect_punct("[")?;
        let mut items = Vec::new();
        loop {
            if self.eat_punct("]")? {
                break;
            }
            if self.eat_punct(",")? {
                items.push(ArrayItem::Hole);
                continue;
            }
            if self.eat_punct("...")? {
                items.push(ArrayItem::Spread(self.parse_assignment()?));
            } else {
                items.push(ArrayItem::Expr(self.parse_assignment()?));
            }
            if !self.eat_punct(",")? {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(Expr::Array(items))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, SyntaxError> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.eat_punct("}")? {
            if self.eat_punct("...")? {
                props.push(ObjectProp::Spread(self.parse_assignment()?));
            } else {
                let t = self.bump()?;
                let (key, shorthand) = match t.tok {
                    Tok::Ident(name) => (PropKey::Static(name.clone()), Some(name)),
                    Tok::Str(s) => (PropKey::Static(s), None),
                    Tok::Num(n) => (PropKey::Static(number_to_string(n)), None),
                    Tok::Punct("[") => {
                        let e = self.parse_assignment()?;
                        self.expect_punct("]")?;
                        (PropKey::Computed(Box::new(e)), None)
                    }
                    _ => return Err(self.err(t.start, "invalid object literal key")),
                };
                if self.is_punct("(")? || self.is_punct("<")? {
                    if self.is_punct("<")? {
                        self.skip_angle()?;
                    }
                    let params = self.parse_params()?;
                    if self.eat_punct(":")? {
                        self.skip_type()?;
                    }
                    let body = FunctionBody::Block(self.parse_block()?);
                    let name = match &key {
                        PropKey::Static(k) => Some(k.clone()),
                        PropKey::Computed(_) => None,
                    };
                    let f = Function {
                        name,
                        params,
                        body,
                        is_arrow: false,
                    };
                    props.push(ObjectProp::KeyValue(key, Expr::Function(Arc::new(f))));
                } else if self.eat_punct(":")? {
                    props.push(ObjectProp::KeyValue(key, self.parse_assignment()?));
                } else {
                    match shorthand {
                        Some(name) => props.push(ObjectProp::Shorthand(name)),
                        None => return Err(self.unexpected("':'")),
                    }
                }
            }
            if !self.eat_punct(",")? {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(props))
    }

    // ──────────────────────────────────────────────
    // JSX
    // ──────────────────────────────────────────────

    fn parse_jsx_element(&mut self) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let result = self.parse_jsx_element_inner();
        self.leave();
        result
    }

    fn parse_jsx_element_inner(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.peek()?.start;
        self.raw_expect('<')?;
        if self.raw_char()? == Some('>') {
            self.pos += 1;
            let children = self.parse_jsx_children(None)?;
            return Ok(jsx::lower_element(jsx::tag_expr(None), Vec::new(), children));
        }
        let Some((name, _, stop)) = lexer::jsx_name(self.src, self.pos, self.end)? else {
            return Err(self.err(open, "expected JSX tag name"));
        };
        self.pos = stop;
        let mut attrs = Vec::new();
        loop {
            match self.raw_char()? {
                Some('/') => {
                    self.pos += 1;
                    self.raw_expect('>')?;
                    return Ok(jsx::lower_element(jsx::tag_expr(Some(&name)), attrs, Vec::new()));
                }
                Some('>') => {
                    self.pos += 1;
                    let children = self.parse_jsx_children(Some(&name))?;
                    return Ok(jsx::lower_element(jsx::tag_expr(Some(&name)), attrs, children));
                }
                Some('{') => {
                    self.pos += 1;
                    self.expect_punct("...")?;
                    let e = self.parse_assignment()?;
                    self.expect_punct("}")?;
                    attrs.push(JsxAttr::Spread(e));
                }
                Some(_) => {
                    let Some((attr, at, stop)) = lexer::jsx_name(self.src, self.pos, self.end)?
                    else {
                        return Err(self.err(self.pos, format!("malformed attribute in <{name}>")));
                    };
                    self.pos = stop;
                    if self.raw_char()? != Some('=') {
                        attrs.push(JsxAttr::Named(attr, Expr::Bool(true)));
                        continue;
                    }
                    self.pos += 1;
                    if let Some((s, stop)) = lexer::jsx_attr_string(self.src, self.pos, self.end)? {
                        self.pos = stop;
                        attrs.push(JsxAttr::Named(attr, Expr::Str(jsx::decode_entities(&s))));
                        continue;
                    }
                    match self.raw_char()? {
                        Some('{') => {
                            self.pos += 1;
                            let e = self.parse_assignment()?;
                            self.expect_punct("}")?;
                            attrs.push(JsxAttr::Named(attr, e));
                        }
                        Some('<') => {
                            let e = self.parse_jsx_element()?;
                            attrs.push(JsxAttr::Named(attr, e));
                        }
                        _ => return Err(self.err(at, format!("attribute '{attr}' has no value"))),
                    }
                }
                None => return Err(self.err(open, format!("unterminated <{name}> tag"))),
            }
        }
    }

    fn parse_jsx_children(&mut self, tag: Option<&str>) -> Result<Vec<Expr>, SyntaxError> {
        let open = self.pos;
        let mut children = Vec::new();
        loop {
            let (text, stop) = lexer::jsx_text(self.src, self.pos, self.end);
            self.pos = stop;
            if let Some(cleaned) = jsx::clean_text(&text) {
                children.push(Expr::Str(cleaned));
            }
            if self.pos >= self.end {
                let label = tag.unwrap_or("<>");
                return Err(self.err(open, format!("unterminated JSX element {label}")));
            }
            if self.src.as_bytes()[self.pos] == b'{' {
                self.pos += 1;
                if self.raw_char()? == Some('}') {
                    // empty expression container, usually a comment
                    self.pos += 1;
                    continue;
                }
                self.eat_punct("...")?;
                let e = self.parse_expression()?;
                self.expect_punct("}")?;
                children.push(e);
                continue;
            }
            // '<': closing tag or nested element
            let (after, _) = lexer::skip_trivia(self.src, self.pos + 1, self.end)?;
            if self.src.as_bytes().get(after) == Some(&b'/') {
                self.pos = after + 1;
                let closing = lexer::jsx_name(self.src, self.pos, self.end)?;
                let closing_name = closing.as_ref().map(|(n, _, _)| n.as_str());
                if closing_name != tag {
                    let expected = tag.map(|t| format!("</{t}>")).unwrap_or_else(|| "</>".into());
                    let found = closing_name.unwrap_or("");
                    return Err(self.err(self.pos, format!("expected {expected}, found </{found}>")));
                }
                if let Some((_, _, stop)) = closing {
                    self.pos = stop;
                }
                self.raw_expect('>')?;
                return Ok(children);
            }
            children.push(self.parse_jsx_element()?);
        }
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(w) => format!("'{w}'"),
        Tok::Num(n) => format!("number {}", number_to_string(*n)),
        Tok::Str(_) => "string literal".to_string(),
        Tok::Template(_) => "template literal".to_string(),
        Tok::Regex { .. } => "regular expression".to_string(),
        Tok::Jsx => "JSX element".to_string(),
        Tok::Punct(p) => format!("'{p}'"),
        Tok::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parses(src: &str) -> Program {
        match parse_program(src) {
            Ok(p) => p,
            Err(e) => panic!("failed to parse: {e}\n{src}"),
        }
    }

    #[test]
    fn erases_type_annotations() {
        let p = parses(
            r#"
            interface Props { items: GameInfo[]; onSelect?: (id: number) => void }
            type Status = 'Active' | 'Maintenance';
            const label: Record<string, string> = { Active: 'On' };
            function Card({ item, index }: { item: GameInfo; index: number }): JSX.Element {
                const value = item.price as number;
                return item!.name;
            }
            "#,
        );
        assert_eq!(p.body.len(), 4);
        assert!(matches!(p.body[3], Stmt::Function(_)));
    }

    #[test]
    fn arrow_functions_with_typed_params() {
        let p = parses("const Foo: React.FC<Props> = ({ items = [] }: Props) => items.length;");
        let Stmt::Var { decls, .. } = &p.body[0] else { panic!("expected var") };
        assert!(matches!(decls[0].init, Some(Expr::Function(ref f)) if f.is_arrow));
    }

    #[test]
    fn conditional_is_not_mistaken_for_arrow() {
        let p = parses("const x = ok ? (a) : b;");
        let Stmt::Var { decls, .. } = &p.body[0] else { panic!("expected var") };
        assert!(matches!(decls[0].init, Some(Expr::Conditional { .. })));
    }

    #[test]
    fn generic_call_and_comparison() {
        parses("const [v, setV] = useState<string | null>(null); const lt = a < b || c > (d);");
    }

    #[test]
    fn jsx_lowers_to_create_element() {
        let p = parses(
            r#"const el = (
                <div className="card" data-id={1} {...rest}>
                    Hello {name}!
                    <Star size={16} />
                    <>frag</>
                </div>
            );"#,
        );
        let Stmt::Var { decls, .. } = &p.body[0] else { panic!("expected var") };
        let Some(Expr::Call { args, .. }) = &decls[0].init else { panic!("expected call") };
        // type, props, "Hello ", name, "!", <Star/>, <>frag</>
        assert_eq!(args.len(), 7);
    }

    #[test]
    fn jsx_text_may_contain_apostrophes_and_operators() {
        parses("const a = <p>Don't stop => 5 >= 3</p>;");
    }

    #[test]
    fn mismatched_closing_tag_is_an_error() {
        let err = parse_program("const a = <div><span></div></span>;").unwrap_err();
        assert!(err.message.contains("expected </span>"), "{}", err.message);
    }

    #[test]
    fn enum_becomes_object() {
        let p = parses("enum Tier { Bronze, Silver = 5, Gold }");
        assert!(matches!(&p.body[0], Stmt::Var { kind: VarKind::Const, .. }));
    }

    #[test]
    fn optional_chain_is_wrapped() {
        let p = parses("a?.b.c();");
        assert!(matches!(&p.body[0], Stmt::Expr(Expr::OptionalChain(_))));
    }

    #[test]
    fn module_syntax_is_rejected() {
        let err = parse_program("import React from 'react';").unwrap_err();
        assert!(err.message.contains("module syntax"));
    }

    #[test]
    fn regex_literals_are_operands() {
        let p = parses("const s = name.replace(/a\\/b/g, 'b') / 2;");
        let Stmt::Var { decls, .. } = &p.body[0] else { panic!("expected var") };
        let Some(Expr::Binary(BinaryOp::Div, call, _)) = &decls[0].init else {
            panic!("expected division")
        };
        let Expr::Call { args, .. } = call.as_ref() else { panic!("expected call") };
        assert!(matches!(
            &args[0],
            Arg::Expr(Expr::Regex { pattern, flags }) if pattern == "a\\/b" && flags == "g"
        ));
    }

    #[test]
    fn nesting_limit_is_a_syntax_error() {
        // Each parenthesis costs an assignment and a unary level.
        let nested = |n: usize| format!("const v = {}1{};", "(".repeat(n), ")".repeat(n));
        parses(&nested(MAX_NESTING / 2 - 4));
        let beyond = nested(MAX_NESTING / 2 + 4);
        let err = parse_program(&beyond).unwrap_err();
        assert!(err.message.contains("nested"), "{}", err.message);
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse_program("const a = 1;\nconst b = ;").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
