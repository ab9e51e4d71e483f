//! JSX lowering: elements become `React.createElement(type, props, ...children)`.

use super::ast::{Arg, Expr, ObjectProp, PropKey};

pub const FACTORY_BINDING: &str = "React";

#[derive(Debug, Clone)]
pub enum JsxAttr {
    Named(String, Expr),
    Spread(Expr),
}

/// Builds the element type expression for a tag name. Lowercase names are
/// intrinsic (`"div"`), capitalized or dotted names refer to bindings.
pub fn tag_expr(name: Option<&str>) -> Expr {
    let Some(name) = name else {
        return Expr::member(Expr::ident(FACTORY_BINDING), "Fragment");
    };
    if name.contains('.') {
        let mut parts = name.split('.');
        let head = parts.next().unwrap_or_default();
        return parts.fold(Expr::ident(head), Expr::member);
    }
    let intrinsic = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        || name.contains('-')
        || name.contains(':');
    if intrinsic {
        Expr::Str(name.to_string())
    } else {
        Expr::ident(name)
    }
}

pub fn lower_element(tag: Expr, attrs: Vec<JsxAttr>, children: Vec<Expr>) -> Expr {
    let props = if attrs.is_empty() {
        Expr::Null
    } else {
        Expr::Object(
            attrs
                .into_iter()
                .map(|a| match a {
                    JsxAttr::Named(k, v) => ObjectProp::KeyValue(PropKey::Static(k), v),
                    JsxAttr::Spread(e) => ObjectProp::Spread(e),
                })
                .collect(),
        )
    };
    let mut args = vec![Arg::Expr(tag), Arg::Expr(props)];
    args.extend(children.into_iter().map(Arg::Expr));
    Expr::Call {
        callee: Box::new(Expr::member(Expr::ident(FACTORY_BINDING), "createElement")),
        args,
        optional: false,
    }
}

/// Collapses JSX text whitespace the way JSX compilers do: lines are trimmed,
/// blank lines dropped, and the remaining lines joined by single spaces.
pub fn clean_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|l| l.chars().any(|c| c != ' ' && c != '\t'))
        .unwrap_or(0);
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.replace('\t', " ");
        let is_first = i == 0;
        let is_last = i == lines.len() - 1;
        let mut trimmed: &str = &line;
        if !is_first {
            trimmed = trimmed.trim_start_matches(' ');
        }
        if !is_last {
            trimmed = trimmed.trim_end_matches(' ');
        }
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(trimmed);
        if i != last_non_empty {
            out.push(' ');
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(decode_entities(&out))
    }
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let Some(semi) = tail.find(';').filter(|s| *s <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            "copy" => Some('©'),
            "middot" => Some('·'),
            "bull" => Some('•'),
            "hellip" => Some('…'),
            "mdash" => Some('—'),
            "ndash" => Some('–'),
            "times" => Some('×'),
            "rarr" => Some('→'),
            "larr" => Some('←'),
            _ => entity
                .strip_prefix("#x")
                .and_then(|h| u32::from_str_radix(h, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiline_text_collapses_to_single_spaces() {
        let raw = "\n        Play now\n        and win\n    ";
        assert_eq!(clean_text(raw).as_deref(), Some("Play now and win"));
    }

    #[test]
    fn inline_text_keeps_edge_spaces() {
        assert_eq!(clean_text(" players ").as_deref(), Some(" players "));
    }

    #[test]
    fn single_space_between_expressions_is_kept() {
        assert_eq!(clean_text(" ").as_deref(), Some(" "));
    }

    #[test]
    fn whitespace_only_text_is_dropped() {
        assert_eq!(clean_text("\n    \n  "), None);
    }

    #[test]
    fn entities_decode() {
        assert_eq!(decode_entities("Tom &amp; Jerry&nbsp;&#65;&#x42; & co"), "Tom & Jerry\u{a0}AB & co");
    }

    #[test]
    fn tag_classification() {
        assert!(matches!(tag_expr(Some("div")), Expr::Str(s) if s == "div"));
        assert!(matches!(tag_expr(Some("Card")), Expr::Ident(s) if s == "Card"));
        assert!(matches!(tag_expr(Some("Lucide.Star")), Expr::Member { .. }));
        assert!(matches!(tag_expr(None), Expr::Member { .. }));
    }
}
