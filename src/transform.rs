//! Removes module syntax from generated component source.
//!
//! The sandbox has no module loader, so `import` statements are dropped and
//! `export` qualifiers are stripped. `export default <expr>` is captured
//! under a unique binding the loader looks for first. Statements are located
//! with the compiler's tokenizer, so text inside strings, templates and
//! comments is never rewritten.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::compiler::lexer::{tokenize_lenient, Tok, Token};

pub const DEFAULT_EXPORT_PREFIX: &str = "__defaultExport_";

static DEFAULT_EXPORT_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedSource {
    pub code: String,
    /// Binding holding the captured default export, if the source had one.
    pub default_export: Option<String>,
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

pub fn transform(source: &str) -> TransformedSource {
    let text = strip_fence_lines(source);
    let tokens = tokenize_lenient(&text);

    let mut edits: Vec<Edit> = Vec::new();
    let mut trailer = String::new();
    let mut default_export: Option<String> = None;
    let mut depth: usize = 0;
    let mut i = 0;

    while i < tokens.len() {
        let t = &tokens[i];
        if depth == 0 && at_statement_start(&tokens, i) {
            if t.is_ident("import") && !next_is_punct(&tokens, i, &["(", "."]) {
                let last = module_statement_end(&tokens, i);
                edits.push(Edit {
                    start: t.start,
                    end: tokens[last].end,
                    replacement: String::new(),
                });
                i = last + 1;
                continue;
            }
            if t.is_ident("export") {
                if let Some((edit, skip_to, captured)) = rewrite_export(&tokens, i, &mut trailer) {
                    edits.push(edit);
                    if captured.is_some() {
                        default_export = captured;
                    }
                    if let Some(next) = skip_to {
                        i = next;
                        continue;
                    }
                }
            }
            if t.is_ident("const") && default_export.is_none() {
                if let Some(Tok::Ident(name)) = tokens.get(i + 1).map(|n| &n.tok) {
                    if name.starts_with(DEFAULT_EXPORT_PREFIX) {
                        default_export = Some(name.clone());
                    }
                }
            }
        }
        match &t.tok {
            Tok::Punct("{" | "(" | "[") => depth += 1,
            Tok::Punct("}" | ")" | "]") => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }

    let mut code = String::with_capacity(text.len() + trailer.len());
    let mut cursor = 0;
    for edit in &edits {
        code.push_str(&text[cursor..edit.start]);
        code.push_str(&edit.replacement);
        cursor = edit.end;
    }
    code.push_str(&text[cursor..]);
    code.push_str(&trailer);

    if !edits.is_empty() {
        debug!(edits = edits.len(), default_export = ?default_export, "✂️ Stripped module syntax");
    }
    TransformedSource {
        code,
        default_export,
    }
}

/// Drops lines that are nothing but a markdown fence (```` ``` ```` or ```` ```tsx ````).
fn strip_fence_lines(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        let is_fence = trimmed
            .strip_prefix("```")
            .is_some_and(|tag| tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')));
        if !is_fence {
            out.push_str(line);
        }
    }
    out
}

fn at_statement_start(tokens: &[Token], i: usize) -> bool {
    match i.checked_sub(1).map(|p| &tokens[p]) {
        None => true,
        Some(prev) => prev.is_punct(";") || prev.is_punct("}") || tokens[i].newline_before,
    }
}

fn next_is_punct(tokens: &[Token], i: usize, puncts: &[&str]) -> bool {
    tokens
        .get(i + 1)
        .is_some_and(|n| puncts.iter().any(|p| n.is_punct(p)))
}

fn is_str(token: Option<&Token>) -> bool {
    matches!(token.map(|t| &t.tok), Some(Tok::Str(_)))
}

/// Index of the last token of an `import …` / `export … from` statement:
/// the module specifier string (plus a trailing `;`).
fn module_statement_end(tokens: &[Token], start: usize) -> usize {
    let mut j = start + 1;
    let mut last = start;
    let mut depth = 0usize;
    while j < tokens.len() {
        let t = &tokens[j];
        if depth == 0 {
            if j == start + 1 && is_str(Some(t)) {
                last = j;
                break;
            }
            if t.is_ident("from") && is_str(tokens.get(j + 1)) {
                last = j + 1;
                break;
            }
            if t.is_punct(";") {
                return j;
            }
            // A new line starting a fresh statement ends an unterminated one.
            if j > start + 1 && t.newline_before && !t.is_punct("}") && !t.is_ident("from") && !t.is_punct(",") && !tokens[j - 1].is_punct(",") && !tokens[j - 1].is_punct("{") {
                return j - 1;
            }
        }
        match &t.tok {
            Tok::Punct("{" | "(" | "[") => depth += 1,
            Tok::Punct("}" | ")" | "]") => depth = depth.saturating_sub(1),
            _ => {}
        }
        last = j;
        j += 1;
    }
    match tokens.get(last + 1) {
        Some(t) if t.is_punct(";") => last + 1,
        _ => last,
    }
}

fn matching_close(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (j, t) in tokens.iter().enumerate().skip(open) {
        match &t.tok {
            Tok::Punct("{" | "(" | "[") => depth += 1,
            Tok::Punct("}" | ")" | "]") => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return j;
                }
            }
            _ => {}
        }
    }
    tokens.len().saturating_sub(1)
}

fn next_binding() -> String {
    format!(
        "{DEFAULT_EXPORT_PREFIX}{}",
        DEFAULT_EXPORT_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Plans the edit for an `export` at token `i`. Returns the edit, an optional
/// token index to resume scanning from, and the captured default binding.
fn rewrite_export(
    tokens: &[Token],
    i: usize,
    trailer: &mut String,
) -> Option<(Edit, Option<usize>, Option<String>)> {
    let export = &tokens[i];
    let next = tokens.get(i + 1)?;

    if next.is_ident("default") {
        let after = tokens.get(i + 2)?;
        let binding = next_binding();
        let (decl_kw, name_at) = if after.is_ident("async") && tokens.get(i + 3).is_some_and(|t| t.is_ident("function")) {
            (true, i + 4)
        } else if after.is_ident("function") || after.is_ident("class") {
            (true, i + 3)
        } else {
            (false, 0)
        };
        let name_at = if tokens.get(name_at).is_some_and(|t| t.is_punct("*")) {
            name_at + 1
        } else {
            name_at
        };
        let declared_name = match tokens.get(name_at).map(|t| &t.tok) {
            Some(Tok::Ident(name)) if decl_kw => Some(name.clone()),
            _ => None,
        };
        let edit = match declared_name {
            Some(name) => {
                trailer.push_str(&format!("\nconst {binding} = {name};\n"));
                Edit {
                    start: export.start,
                    end: after.start,
                    replacement: String::new(),
                }
            }
            None => Edit {
                start: export.start,
                end: after.start,
                replacement: format!("const {binding} = "),
            },
        };
        return Some((edit, Some(i + 2), Some(binding)));
    }

    // `export { a, b }`, `export type { T }`, `export * from '…'`
    let list_at = if next.is_ident("type") && tokens.get(i + 2).is_some_and(|t| t.is_punct("{")) {
        Some(i + 2)
    } else if next.is_punct("{") {
        Some(i + 1)
    } else {
        None
    };
    if let Some(open) = list_at {
        let close = matching_close(tokens, open);
        let last = if tokens.get(close + 1).is_some_and(|t| t.is_ident("from")) {
            module_statement_end(tokens, close)
        } else if tokens.get(close + 1).is_some_and(|t| t.is_punct(";")) {
            close + 1
        } else {
            close
        };
        return Some((
            Edit {
                start: export.start,
                end: tokens[last].end,
                replacement: String::new(),
            },
            Some(last + 1),
            None,
        ));
    }
    if next.is_punct("*") {
        let last = module_statement_end(tokens, i);
        return Some((
            Edit {
                start: export.start,
                end: tokens[last].end,
                replacement: String::new(),
            },
            Some(last + 1),
            None,
        ));
    }

    // `export const …`, `export function …`, `export interface …`
    Some((
        Edit {
            start: export.start,
            end: next.start,
            replacement: String::new(),
        },
        Some(i + 1),
        None,
    ))
}
