//! Prints the transpiled AST back out as plain JavaScript for the engine.
//!
//! Compound expressions are always parenthesized, so the printer needs no
//! precedence table and the output parses back to the same tree.

use std::fmt::Write as _;

use super::ast::{
    Arg, ArrayItem, AssignOp, BinaryOp, Expr, Function, FunctionBody, LogicalOp, MemberProp,
    ObjectProp, Param, Pattern, Program, PropKey, Stmt, TemplatePart, UnaryOp, VarDeclarator,
    VarKind,
};
use super::lexer::{is_ident_part, is_ident_start};

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

pub fn emit_program(program: &Program) -> String {
    let mut emitter = Emitter {
        out: String::new(),
        indent: 0,
    };
    for stmt in &program.body {
        emitter.stmt(stmt);
    }
    emitter.out
}

/// JavaScript `Number.prototype.toString()` for radix 10.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let s = format!("{n:e}");
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        };
    }
    if n.fract() == 0.0 {
        return format!("{n:.0}");
    }
    format!("{n}")
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_part)
}

pub(crate) fn is_binding_name(name: &str) -> bool {
    is_identifier_name(name) && !RESERVED.contains(&name)
}

fn quote(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn template_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

fn var_kind(kind: VarKind) -> &'static str {
    match kind {
        VarKind::Var => "var",
        VarKind::Let => "let",
        VarKind::Const => "const",
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Exp => "**",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::StrictEq => "===",
        BinaryOp::StrictNotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::In => "in",
        BinaryOp::InstanceOf => "instanceof",
    }
}

fn logical_op(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "&&",
        LogicalOp::Or => "||",
        LogicalOp::Nullish => "??",
    }
}

fn unary_op(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "!",
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::BitNot => "~",
        UnaryOp::Typeof => "typeof ",
        UnaryOp::Void => "void ",
        UnaryOp::Delete => "delete ",
    }
}

/// Expressions that can stand as a member object or callee without parens.
fn is_atom(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_)
            | Expr::This
            | Expr::Str(_)
            | Expr::Template(_)
            | Expr::Regex { .. }
            | Expr::Array(_)
            | Expr::Bool(_)
            | Expr::Null
            | Expr::Member { .. }
            | Expr::Call { .. }
    )
}

struct Emitter {
    out: String,
    indent: usize,
}

impl Emitter {
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.line_start();
        self.stmt_body(stmt);
        self.out.push('\n');
    }

    fn stmt_body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var { kind, decls } => {
                self.var_decl(*kind, decls);
                self.push(";");
            }
            Stmt::Function(f) => self.function(f, true),
            Stmt::Return(value) => {
                self.push("return");
                if let Some(value) = value {
                    self.push(" ");
                    self.expr(value);
                }
                self.push(";");
            }
            Stmt::If { test, cons, alt } => {
                self.push("if (");
                self.expr(test);
                self.push(") ");
                self.body(cons);
                if let Some(alt) = alt {
                    self.push(" else ");
                    self.body(alt);
                }
            }
            Stmt::Block(stmts) => self.block(stmts),
            Stmt::Expr(expr) => {
                self.expr(expr);
                self.push(";");
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.push("for (");
                match init.as_deref() {
                    Some(Stmt::Var { kind, decls }) => self.var_decl(*kind, decls),
                    Some(Stmt::Expr(expr)) => self.expr(expr),
                    _ => {}
                }
                self.push("; ");
                if let Some(test) = test {
                    self.expr(test);
                }
                self.push("; ");
                if let Some(update) = update {
                    self.expr(update);
                }
                self.push(") ");
                self.body(body);
            }
            Stmt::ForOf {
                kind,
                target,
                iter,
                body,
            } => self.for_each(*kind, target, "of", iter, body),
            Stmt::ForIn {
                kind,
                target,
                object,
                body,
            } => self.for_each(*kind, target, "in", object, body),
            Stmt::While { test, body } => {
                self.push("while (");
                self.expr(test);
                self.push(") ");
                self.body(body);
            }
            Stmt::DoWhile { body, test } => {
                self.push("do ");
                self.body(body);
                self.push(" while (");
                self.expr(test);
                self.push(");");
            }
            Stmt::Break => self.push("break;"),
            Stmt::Continue => self.push("continue;"),
            Stmt::Throw(value) => {
                self.push("throw ");
                self.expr(value);
                self.push(";");
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                self.push("try ");
                self.block(block);
                if let Some(handler) = handler {
                    self.push(" catch ");
                    if let Some(param) = param {
                        self.push("(");
                        self.pattern(param);
                        self.push(") ");
                    }
                    self.block(handler);
                }
                if let Some(finalizer) = finalizer {
                    self.push(" finally ");
                    self.block(finalizer);
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.push("switch (");
                self.expr(discriminant);
                self.push(") {\n");
                self.indent += 1;
                for case in cases {
                    self.line_start();
                    match &case.test {
                        Some(test) => {
                            self.push("case ");
                            self.expr(test);
                            self.push(":\n");
                        }
                        None => self.push("default:\n"),
                    }
                    self.indent += 1;
                    for stmt in &case.body {
                        self.stmt(stmt);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line_start();
                self.push("}");
            }
            Stmt::Empty => self.push(";"),
        }
    }

    fn for_each(&mut self, kind: VarKind, target: &Pattern, word: &str, source: &Expr, body: &Stmt) {
        self.push("for (");
        self.push(var_kind(kind));
        self.push(" ");
        self.pattern(target);
        self.push(" ");
        self.push(word);
        self.push(" ");
        self.expr(source);
        self.push(") ");
        self.body(body);
    }

    fn block(&mut self, stmts: &[Stmt]) {
        self.push("{\n");
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.push("}");
    }

    /// Loop and branch bodies are always braced.
    fn body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => self.block(stmts),
            other => self.block(std::slice::from_ref(other)),
        }
    }

    fn var_decl(&mut self, kind: VarKind, decls: &[VarDeclarator]) {
        self.push(var_kind(kind));
        self.push(" ");
        for (i, decl) in decls.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.pattern(&decl.target);
            if let Some(init) = &decl.init {
                self.push(" = ");
                self.expr(init);
            }
        }
    }

    fn function(&mut self, f: &Function, declaration: bool) {
        if f.is_arrow {
            self.push("((");
            self.params(&f.params);
            self.push(") => ");
            match &f.body {
                FunctionBody::Block(stmts) => self.block(stmts),
                FunctionBody::Expr(expr) => self.expr(expr),
            }
            self.push(")");
            return;
        }
        if !declaration {
            self.push("(");
        }
        self.push("function");
        match f.name.as_deref() {
            Some(name) if declaration || is_binding_name(name) => {
                self.push(" ");
                self.push(name);
            }
            _ => {}
        }
        self.push("(");
        self.params(&f.params);
        self.push(") ");
        match &f.body {
            FunctionBody::Block(stmts) => self.block(stmts),
            FunctionBody::Expr(expr) => {
                self.push("{ return ");
                self.expr(expr);
                self.push("; }");
            }
        }
        if !declaration {
            self.push(")");
        }
    }

    fn params(&mut self, params: &[Param]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            if param.rest {
                self.push("...");
            }
            self.pattern(&param.pattern);
        }
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(name) => self.push(name),
            Pattern::Object { props, rest } => {
                self.push("{ ");
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.key(&prop.key);
                    self.push(": ");
                    self.pattern(&prop.value);
                }
                if let Some(rest) = rest {
                    if !props.is_empty() {
                        self.push(", ");
                    }
                    self.push("...");
                    self.push(rest);
                }
                self.push(" }");
            }
            Pattern::Array { elems, rest } => {
                self.push("[");
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    if let Some(elem) = elem {
                        self.pattern(elem);
                    }
                }
                if let Some(rest) = rest {
                    if !elems.is_empty() {
                        self.push(", ");
                    }
                    self.push("...");
                    self.pattern(rest);
                } else if matches!(elems.last(), Some(None)) {
                    self.push(",");
                }
                self.push("]");
            }
            Pattern::Default(target, default) => {
                self.pattern(target);
                self.push(" = ");
                self.expr(default);
            }
        }
    }

    fn key(&mut self, key: &PropKey) {
        match key {
            PropKey::Static(name) => quote(name, &mut self.out),
            PropKey::Computed(expr) => {
                self.push("[");
                self.expr(expr);
                self.push("]");
            }
        }
    }

    fn args(&mut self, args: &[Arg]) {
        self.push("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            match arg {
                Arg::Expr(expr) => self.expr(expr),
                Arg::Spread(expr) => {
                    self.push("...");
                    self.expr(expr);
                }
            }
        }
        self.push(")");
    }

    /// Member objects and callees.
    fn operand(&mut self, expr: &Expr) {
        if is_atom(expr) {
            self.expr(expr);
        } else {
            self.push("(");
            self.expr(expr);
            self.push(")");
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Num(n) => {
                let text = number_to_string(*n);
                self.push(&text);
            }
            Expr::Str(s) => quote(s, &mut self.out),
            Expr::Bool(b) => self.push(if *b { "true" } else { "false" }),
            Expr::Null => self.push("null"),
            Expr::This => self.push("this"),
            Expr::Template(parts) => {
                self.push("`");
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => template_text(text, &mut self.out),
                        TemplatePart::Expr(expr) => {
                            self.push("${");
                            self.expr(expr);
                            self.push("}");
                        }
                    }
                }
                self.push("`");
            }
            Expr::Regex { pattern, flags } => {
                let _ = write!(self.out, "(/{pattern}/{flags})");
            }
            Expr::Ident(name) => self.push(name),
            Expr::Array(items) => {
                self.push("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    match item {
                        ArrayItem::Expr(expr) => self.expr(expr),
                        ArrayItem::Spread(expr) => {
                            self.push("...");
                            self.expr(expr);
                        }
                        ArrayItem::Hole => {}
                    }
                }
                if matches!(items.last(), Some(ArrayItem::Hole)) {
                    self.push(",");
                }
                self.push("]");
            }
            Expr::Object(props) => {
                self.push("({");
                for (i, prop) in props.iter().enumerate() {
                    self.push(if i > 0 { ", " } else { " " });
                    match prop {
                        ObjectProp::KeyValue(key, value) => {
                            self.key(key);
                            self.push(": ");
                            self.expr(value);
                        }
                        ObjectProp::Shorthand(name) => self.push(name),
                        ObjectProp::Spread(expr) => {
                            self.push("...");
                            self.expr(expr);
                        }
                    }
                }
                self.push(if props.is_empty() { "})" } else { " })" });
            }
            Expr::Function(f) => self.function(f, false),
            Expr::Unary(op, arg) => {
                self.push("(");
                self.push(unary_op(*op));
                self.expr(arg);
                self.push(")");
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let op = if *increment { "++" } else { "--" };
                self.push("(");
                if *prefix {
                    self.push(op);
                }
                self.expr(target);
                if !*prefix {
                    self.push(op);
                }
                self.push(")");
            }
            Expr::Binary(op, left, right) => self.infix(left, binary_op(*op), right),
            Expr::Logical(op, left, right) => self.infix(left, logical_op(*op), right),
            Expr::Assign { op, target, value } => {
                let op = match op {
                    AssignOp::Assign => "=".to_string(),
                    AssignOp::Binary(op) => format!("{}=", binary_op(*op)),
                    AssignOp::Logical(op) => format!("{}=", logical_op(*op)),
                };
                self.infix(target, &op, value);
            }
            Expr::Conditional { test, cons, alt } => {
                self.push("(");
                self.expr(test);
                self.push(" ? ");
                self.expr(cons);
                self.push(" : ");
                self.expr(alt);
                self.push(")");
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                self.operand(callee);
                if *optional {
                    self.push("?.");
                }
                self.args(args);
            }
            Expr::New { callee, args } => {
                self.push("(new (");
                self.expr(callee);
                self.push(")");
                self.args(args);
                self.push(")");
            }
            Expr::Member {
                object,
                prop,
                optional,
            } => {
                self.operand(object);
                match prop {
                    MemberProp::Static(name) if is_identifier_name(name) => {
                        self.push(if *optional { "?." } else { "." });
                        self.push(name);
                    }
                    MemberProp::Static(name) => {
                        self.push(if *optional { "?.[" } else { "[" });
                        quote(name, &mut self.out);
                        self.push("]");
                    }
                    MemberProp::Computed(expr) => {
                        self.push(if *optional { "?.[" } else { "[" });
                        self.expr(expr);
                        self.push("]");
                    }
                }
            }
            Expr::OptionalChain(inner) => {
                self.push("(");
                self.expr(inner);
                self.push(")");
            }
            Expr::Sequence(items) => {
                self.push("(");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(item);
                }
                self.push(")");
            }
        }
    }

    fn infix(&mut self, left: &Expr, op: &str, right: &Expr) {
        self.push("(");
        self.expr(left);
        self.push(" ");
        self.push(op);
        self.push(" ");
        self.expr(right);
        self.push(")");
    }
}
