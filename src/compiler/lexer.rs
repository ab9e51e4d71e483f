//! On-demand tokenizer for the TSX surface syntax.
//!
//! The lexer is position based rather than stream based: callers ask for the
//! token at a byte offset and get back its span. The parser uses this to
//! backtrack cheaply (arrow functions, generic call arguments) and to switch
//! into JSX text mode without a lookahead buffer getting in the way.

use super::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    /// Cooked literal text.
    Text(String),
    /// Byte range of a `${ ... }` expression in the enclosing source.
    Expr(usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifiers and keywords, distinguished by the parser.
    Ident(String),
    Num(f64),
    Str(String),
    Template(Vec<TemplateChunk>),
    Regex {
        pattern: String,
        flags: String,
    },
    /// A whole JSX element, only produced by [`tokenize_lenient`].
    Jsx,
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub start: usize,
    pub end: usize,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.tok, Tok::Punct(x) if *x == p)
    }

    pub fn is_ident(&self, w: &str) -> bool {
        matches!(&self.tok, Tok::Ident(x) if x == w)
    }
}

// Longest first.
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "??=", "||=", "&&=", "=>", "==", "!=", "<=", ">=", "&&", "||",
    "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "**", "{", "}", "(", ")", "[", "]",
    ";", ",", "<", ">", "+", "-", "*", "/", "%", "!", "?", ":", "=", ".", "&", "|", "^", "~",
    "@", "#",
];

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn char_at(src: &str, pos: usize) -> Option<char> {
    src.get(pos..).and_then(|s| s.chars().next())
}

/// Skips whitespace and comments. Returns the new offset and whether a line
/// terminator was crossed.
pub fn skip_trivia(src: &str, mut pos: usize, end: usize) -> Result<(usize, bool), SyntaxError> {
    let bytes = src.as_bytes();
    let mut newline = false;
    while pos < end {
        let b = bytes[pos];
        if b == b'\n' {
            newline = true;
            pos += 1;
        } else if b.is_ascii_whitespace() {
            pos += 1;
        } else if b == b'/' && pos + 1 < end && bytes[pos + 1] == b'/' {
            while pos < end && bytes[pos] != b'\n' {
                pos += 1;
            }
        } else if b == b'/' && pos + 1 < end && bytes[pos + 1] == b'*' {
            let start = pos;
            pos += 2;
            loop {
                if pos + 1 >= end {
                    return Err(SyntaxError::new(src, start, "unterminated block comment"));
                }
                if bytes[pos] == b'\n' {
                    newline = true;
                }
                if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
        } else if b >= 0x80 {
            match char_at(src, pos) {
                Some(c) if c.is_whitespace() => {
                    if c == '\u{2028}' || c == '\u{2029}' {
                        newline = true;
                    }
                    pos += c.len_utf8();
                }
                _ => break,
            }
        } else {
            break;
        }
    }
    Ok((pos, newline))
}

/// Lexes the token starting at (or after trivia following) `pos`.
pub fn lex_at(src: &str, pos: usize, end: usize) -> Result<Token, SyntaxError> {
    let (pos, newline_before) = skip_trivia(src, pos, end)?;
    if pos >= end {
        return Ok(Token {
            tok: Tok::Eof,
            start: end,
            end,
            newline_before,
        });
    }
    let bytes = src.as_bytes();
    let c = match char_at(src, pos) {
        Some(c) => c,
        None => return Err(SyntaxError::new(src, pos, "invalid source offset")),
    };

    let (tok, stop) = if is_ident_start(c) {
        let mut stop = pos;
        while stop < end {
            match char_at(src, stop) {
                Some(ch) if is_ident_part(ch) => stop += ch.len_utf8(),
                _ => break,
            }
        }
        (Tok::Ident(src[pos..stop].to_string()), stop)
    } else if c.is_ascii_digit()
        || (c == '.' && pos + 1 < end && bytes[pos + 1].is_ascii_digit())
    {
        lex_number(src, pos, end)?
    } else if c == '"' || c == '\'' {
        lex_string(src, pos, end, c)?
    } else if c == '`' {
        lex_template(src, pos, end)?
    } else {
        let rest = &src[pos..end];
        let mut found = None;
        for p in PUNCTUATORS {
            if rest.starts_with(p) {
                // `a?.5:1` is a conditional, not optional chaining.
                if *p == "?." && rest.as_bytes().get(2).is_some_and(|b| b.is_ascii_digit()) {
                    continue;
                }
                found = Some(*p);
                break;
            }
        }
        match found {
            Some(p) => (Tok::Punct(p), pos + p.len()),
            None => {
                return Err(SyntaxError::new(
                    src,
                    pos,
                    format!("unexpected character '{c}'"),
                ))
            }
        }
    };

    Ok(Token {
        tok,
        start: pos,
        end: stop,
        newline_before,
    })
}

fn lex_number(src: &str, pos: usize, end: usize) -> Result<(Tok, usize), SyntaxError> {
    let bytes = src.as_bytes();
    let mut stop = pos;
    if bytes[pos] == b'0' && pos + 1 < end && matches!(bytes[pos + 1], b'x' | b'X') {
        stop += 2;
        while stop < end && (bytes[stop].is_ascii_hexdigit() || bytes[stop] == b'_') {
            stop += 1;
        }
        let digits: String = src[pos + 2..stop].chars().filter(|c| *c != '_').collect();
        let n = u64::from_str_radix(&digits, 16)
            .map_err(|_| SyntaxError::new(src, pos, "invalid hex literal"))?;
        return Ok((Tok::Num(n as f64), stop));
    }
    while stop < end && (bytes[stop].is_ascii_digit() || bytes[stop] == b'_') {
        stop += 1;
    }
    if stop < end && bytes[stop] == b'.' {
        stop += 1;
        while stop < end && (bytes[stop].is_ascii_digit() || bytes[stop] == b'_') {
            stop += 1;
        }
    }
    if stop < end && matches!(bytes[stop], b'e' | b'E') {
        let mut probe = stop + 1;
        if probe < end && matches!(bytes[probe], b'+' | b'-') {
            probe += 1;
        }
        if probe < end && bytes[probe].is_ascii_digit() {
            stop = probe;
            while stop < end && bytes[stop].is_ascii_digit() {
                stop += 1;
            }
        }
    }
    // BigInt suffix is accepted and dropped.
    let text: String = src[pos..stop].chars().filter(|c| *c != '_').collect();
    if stop < end && bytes[stop] == b'n' {
        stop += 1;
    }
    let n = text
        .parse::<f64>()
        .map_err(|_| SyntaxError::new(src, pos, format!("invalid number literal '{text}'")))?;
    Ok((Tok::Num(n), stop))
}

/// Reads an escape sequence after a backslash at `pos`. Returns the cooked
/// text (possibly empty for line continuations) and the offset after it.
fn read_escape(src: &str, pos: usize, end: usize) -> Result<(String, usize), SyntaxError> {
    let Some(c) = char_at(src, pos).filter(|_| pos < end) else {
        return Err(SyntaxError::new(src, pos, "unterminated escape sequence"));
    };
    let simple = match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' => Some('\0'),
        _ => None,
    };
    if let Some(s) = simple {
        return Ok((s.to_string(), pos + 1));
    }
    match c {
        '\n' => Ok((String::new(), pos + 1)),
        '\r' => {
            let next = if src.as_bytes().get(pos + 1) == Some(&b'\n') { pos + 2 } else { pos + 1 };
            Ok((String::new(), next))
        }
        'x' => {
            let hex = src.get(pos + 1..pos + 3).unwrap_or("");
            let code = u32::from_str_radix(hex, 16)
                .map_err(|_| SyntaxError::new(src, pos, "invalid \\x escape"))?;
            let ch = char::from_u32(code).unwrap_or('\u{fffd}');
            Ok((ch.to_string(), pos + 3))
        }
        'u' => {
            if src.as_bytes().get(pos + 1) == Some(&b'{') {
                let close = src[pos..end]
                    .find('}')
                    .map(|i| pos + i)
                    .ok_or_else(|| SyntaxError::new(src, pos, "invalid \\u{} escape"))?;
                let code = u32::from_str_radix(&src[pos + 2..close], 16)
                    .map_err(|_| SyntaxError::new(src, pos, "invalid \\u{} escape"))?;
                let ch = char::from_u32(code).unwrap_or('\u{fffd}');
                Ok((ch.to_string(), close + 1))
            } else {
                let hex = src.get(pos + 1..pos + 5).unwrap_or("");
                let code = u32::from_str_radix(hex, 16)
                    .map_err(|_| SyntaxError::new(src, pos, "invalid \\u escape"))?;
                let ch = char::from_u32(code).unwrap_or('\u{fffd}');
                Ok((ch.to_string(), pos + 5))
            }
        }
        other => Ok((other.to_string(), pos + other.len_utf8())),
    }
}

fn lex_string(src: &str, pos: usize, end: usize, quote: char) -> Result<(Tok, usize), SyntaxError> {
    let mut out = String::new();
    let mut i = pos + 1;
    loop {
        let Some(c) = char_at(src, i).filter(|_| i < end) else {
            return Err(SyntaxError::new(src, pos, "unterminated string literal"));
        };
        if c == quote {
            return Ok((Tok::Str(out), i + 1));
        }
        match c {
            '\\' => {
                let (cooked, next) = read_escape(src, i + 1, end)?;
                out.push_str(&cooked);
                i = next;
            }
            '\n' => return Err(SyntaxError::new(src, pos, "unterminated string literal")),
            _ => {
                out.push(c);
                i += c.len_utf8();
            }
        }
    }
}

fn lex_template(src: &str, pos: usize, end: usize) -> Result<(Tok, usize), SyntaxError> {
    let mut chunks = Vec::new();
    let mut text = String::new();
    let mut i = pos + 1;
    loop {
        let Some(c) = char_at(src, i).filter(|_| i < end) else {
            return Err(SyntaxError::new(src, pos, "unterminated template literal"));
        };
        match c {
            '`' => {
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(text));
                }
                return Ok((Tok::Template(chunks), i + 1));
            }
            '\\' => {
                let (cooked, next) = read_escape(src, i + 1, end)?;
                text.push_str(&cooked);
                i = next;
            }
            '$' if src.as_bytes().get(i + 1) == Some(&b'{') => {
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                }
                let expr_start = i + 2;
                let expr_end = matching_brace(src, expr_start, end)?;
                chunks.push(TemplateChunk::Expr(expr_start, expr_end));
                i = expr_end + 1;
            }
            _ => {
                text.push(c);
                i += c.len_utf8();
            }
        }
    }
}

/// Finds the `}` closing a brace whose body starts at `start`, stepping over
/// nested strings, templates and comments.
pub fn matching_brace(src: &str, start: usize, end: usize) -> Result<usize, SyntaxError> {
    let mut depth = 0usize;
    let mut pos = start;
    loop {
        let tok = lex_at(src, pos, end)?;
        match &tok.tok {
            Tok::Eof => return Err(SyntaxError::new(src, start, "unterminated '${' in template")),
            Tok::Punct("{") => depth += 1,
            Tok::Punct("}") => {
                if depth == 0 {
                    return Ok(tok.start);
                }
                depth -= 1;
            }
            _ => {}
        }
        pos = tok.end;
    }
}

/// A regular expression literal whose opening `/` is at `pos`. The parser
/// calls this when a `/` appears where an operand is expected.
pub fn lex_regex(src: &str, pos: usize, end: usize) -> Result<(Tok, usize), SyntaxError> {
    let bytes = src.as_bytes();
    let mut i = pos + 1;
    let mut in_class = false;
    loop {
        if i >= end || bytes[i] == b'\n' || bytes[i] == b'\r' {
            return Err(SyntaxError::new(src, pos, "unterminated regular expression"));
        }
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => break,
            _ => i += 1,
        }
    }
    let mut stop = i + 1;
    while stop < end && bytes[stop].is_ascii_alphabetic() {
        stop += 1;
    }
    let flags = &src[i + 1..stop];
    if let Some(bad) = flags.chars().find(|c| !"dgimsuyv".contains(*c)) {
        return Err(SyntaxError::new(
            src,
            i + 1,
            format!("invalid regular expression flag '{bad}'"),
        ));
    }
    let tok = Tok::Regex {
        pattern: src[pos + 1..i].to_string(),
        flags: flags.to_string(),
    };
    Ok((tok, stop))
}

/// Raw JSX text up to the next `{` or `<`.
pub fn jsx_text(src: &str, pos: usize, end: usize) -> (String, usize) {
    let stop = src[pos..end]
        .find(['{', '<'])
        .map(|i| pos + i)
        .unwrap_or(end);
    (src[pos..stop].to_string(), stop)
}

/// A JSX tag or attribute name (`div`, `aria-label`, `Lucide.Star`, `xlink:href`).
pub fn jsx_name(src: &str, pos: usize, end: usize) -> Result<Option<(String, usize, usize)>, SyntaxError> {
    let (start, _) = skip_trivia(src, pos, end)?;
    match char_at(src, start) {
        Some(c) if start < end && is_ident_start(c) => {}
        _ => return Ok(None),
    }
    let mut stop = start;
    while stop < end {
        match char_at(src, stop) {
            Some(c) if is_ident_part(c) || c == '-' || c == '.' || c == ':' => stop += c.len_utf8(),
            _ => break,
        }
    }
    Ok(Some((src[start..stop].to_string(), start, stop)))
}

/// A quoted JSX attribute value. JSX attribute strings do not process escapes.
pub fn jsx_attr_string(src: &str, pos: usize, end: usize) -> Result<Option<(String, usize)>, SyntaxError> {
    let (start, _) = skip_trivia(src, pos, end)?;
    let quote = match char_at(src, start) {
        Some(q @ ('"' | '\'')) if start < end => q,
        _ => return Ok(None),
    };
    match src[start + 1..end].find(quote) {
        Some(i) => Ok(Some((src[start + 1..start + 1 + i].to_string(), start + 2 + i))),
        None => Err(SyntaxError::new(src, start, "unterminated JSX attribute string")),
    }
}

/// Tokenizes a whole source text, stopping at the first error.
pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let tok = lex_at(src, pos, src.len())?;
        if tok.tok == Tok::Eof {
            return Ok(out);
        }
        pos = tok.end;
        out.push(tok);
    }
}

/// Tokenizes with error recovery: an offending character is skipped and
/// scanning resumes after it. Regex literals and JSX elements in operand
/// position are returned as single tokens, so their text (`http://x`,
/// `Don't`) never reaches the JS token rules.
pub fn tokenize_lenient(src: &str) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    let mut pos = 0;
    while let Some(tok) = lenient_token(src, pos, src.len(), out.last(), 0) {
        pos = tok.end;
        out.push(tok);
    }
    out
}

const MAX_JSX_DEPTH: usize = 128;

/// Whether a `/` or `<` after `prev` starts an operand rather than an operator.
fn operand_expected(prev: Option<&Token>) -> bool {
    match prev.map(|t| &t.tok) {
        None => true,
        Some(Tok::Punct(p)) => !matches!(*p, ")" | "]" | "}" | "++" | "--"),
        Some(Tok::Ident(w)) => matches!(
            w.as_str(),
            "return" | "typeof" | "case" | "do" | "else" | "in" | "of" | "new" | "delete"
                | "void" | "throw" | "yield" | "await" | "instanceof"
        ),
        _ => false,
    }
}

fn lenient_token(
    src: &str,
    mut pos: usize,
    end: usize,
    prev: Option<&Token>,
    depth: usize,
) -> Option<Token> {
    let mut newline = false;
    loop {
        let (at, crossed) = skip_trivia(src, pos, end).ok()?;
        newline |= crossed;
        if at >= end {
            return None;
        }
        if operand_expected(prev) {
            let special = match src.as_bytes()[at] {
                b'<' => skip_jsx_element(src, at, end, depth).map(|stop| (Tok::Jsx, stop)),
                b'/' => lex_regex(src, at, end).ok(),
                _ => None,
            };
            if let Some((tok, stop)) = special {
                return Some(Token {
                    tok,
                    start: at,
                    end: stop,
                    newline_before: newline,
                });
            }
        }
        match lex_at(src, at, end) {
            Ok(tok) if tok.tok == Tok::Eof => return None,
            Ok(mut tok) => {
                tok.newline_before |= newline;
                return Some(tok);
            }
            Err(_) => {
                let width = char_at(src, at).map(char::len_utf8).unwrap_or(1);
                pos = at + width;
            }
        }
    }
}

/// Offset just past the JSX element opening at `pos`, or `None` when the
/// text there is not a well-formed element.
fn skip_jsx_element(src: &str, pos: usize, end: usize, depth: usize) -> Option<usize> {
    if depth > MAX_JSX_DEPTH {
        return None;
    }
    let bytes = src.as_bytes();
    let (mut at, _) = skip_trivia(src, pos + 1, end).ok()?;
    let tag = if bytes.get(at) == Some(&b'>') {
        at += 1;
        None
    } else {
        let (name, _, stop) = jsx_name(src, at, end).ok()??;
        at = stop;
        loop {
            let (next, _) = skip_trivia(src, at, end).ok()?;
            match bytes.get(next)? {
                b'/' => {
                    let (close, _) = skip_trivia(src, next + 1, end).ok()?;
                    return (bytes.get(close) == Some(&b'>')).then_some(close + 1);
                }
                b'>' => {
                    at = next + 1;
                    break;
                }
                b'{' => at = skip_braced(src, next + 1, end, depth)?,
                _ => {
                    let (_, _, stop) = jsx_name(src, next, end).ok()??;
                    let (eq, _) = skip_trivia(src, stop, end).ok()?;
                    if bytes.get(eq) != Some(&b'=') {
                        at = stop;
                        continue;
                    }
                    if let Some((_, stop)) = jsx_attr_string(src, eq + 1, end).ok()? {
                        at = stop;
                        continue;
                    }
                    let (value, _) = skip_trivia(src, eq + 1, end).ok()?;
                    at = match bytes.get(value)? {
                        b'{' => skip_braced(src, value + 1, end, depth)?,
                        b'<' => skip_jsx_element(src, value, end, depth + 1)?,
                        _ => return None,
                    };
                }
            }
        }
        Some(name)
    };
    loop {
        let (_, stop) = jsx_text(src, at, end);
        if stop >= end {
            return None;
        }
        if bytes[stop] == b'{' {
            at = skip_braced(src, stop + 1, end, depth)?;
            continue;
        }
        let (after, _) = skip_trivia(src, stop + 1, end).ok()?;
        if bytes.get(after) == Some(&b'/') {
            let closing = jsx_name(src, after + 1, end).ok()?;
            if closing.as_ref().map(|(n, _, _)| n.as_str()) != tag.as_deref() {
                return None;
            }
            let name_end = closing.map(|(_, _, stop)| stop).unwrap_or(after + 1);
            let (close, _) = skip_trivia(src, name_end, end).ok()?;
            return (bytes.get(close) == Some(&b'>')).then_some(close + 1);
        }
        at = skip_jsx_element(src, stop, end, depth + 1)?;
    }
}

/// Offset just past the `}` closing a JSX expression container whose body
/// starts at `pos`.
fn skip_braced(src: &str, pos: usize, end: usize, depth: usize) -> Option<usize> {
    let mut open = 0usize;
    let mut prev: Option<Token> = None;
    let mut at = pos;
    loop {
        let tok = lenient_token(src, at, end, prev.as_ref(), depth + 1)?;
        match tok.tok {
            Tok::Punct("{") => open += 1,
            Tok::Punct("}") if open == 0 => return Some(tok.end),
            Tok::Punct("}") => open -= 1,
            _ => {}
        }
        at = tok.end;
        prev = Some(tok);
    }
}
