//! Offline stand-in for the generation service.
//!
//! Reads the first C# class of the entity source and builds the same record
//! the model would return: a TypeScript interface, deterministic mock items,
//! property descriptors, a layout choice, a TSX component and a short design
//! rationale. The reply is wrapped in a fenced block with a preamble so it
//! goes through the same sanitizer path as a live reply.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::error::ServiceError;
use crate::models::{GenerationResult, LayoutStrategy, Locale, PropertyDescriptor};

static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(
            r"(?m)^\s*(?:(?:public|internal|private|protected|sealed|abstract|static|partial)\s+)*class\s+([A-Za-z_]\w*)",
        )
        .expect("class pattern is valid")
    });

static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|internal|protected|private|virtual|override|required|new)\s+)+(?P<ty>[A-Za-z_][\w.]*(?:<[^{};=]*?>)?(?:\[\])?\??)\s+(?P<name>[A-Za-z_]\w*)\s*\{[^}]*\bget\b[^}]*\}(?:\s*=\s*[^;]*;)?\s*(?://\s*(?P<comment>.*?))?\s*$",
    )
    .expect("property pattern is valid")
});

static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([A-Za-z0-9 _-]+)""#).expect("quoted pattern is valid"));

const COLLECTIONS: &[&str] = &[
    "List", "IList", "ICollection", "IEnumerable", "IReadOnlyList", "IReadOnlyCollection",
    "Collection", "HashSet", "ISet",
];
const DICTIONARIES: &[&str] = &["Dictionary", "IDictionary", "IReadOnlyDictionary"];

const NAME_WORDS: [&str; 5] = ["Aurora", "Nebula", "Quantum", "Eclipse", "Zenith"];
const TAG_WORDS: [&str; 5] = ["Featured", "New", "Popular", "Classic", "Live"];
const STATUS_FALLBACK: [&str; 5] = ["Active", "Pending", "Inactive", "Active", "Maintenance"];
const MONEY: [f64; 5] = [1_250_000.5, 85_432.75, 2_500.0, 999_999.99, 15_230.4];
const RATINGS: [f64; 5] = [4.8, 4.5, 3.9, 4.2, 5.0];
const PERCENTS: [f64; 5] = [12.5, 37.5, 50.0, 75.0, 98.5];
const COUNTS: [u64; 5] = [1520, 845, 12034, 67, 3310];

pub const MOCK_ITEM_COUNT: usize = 5;
/// Index of the mock item whose nullable fields are `null`.
const NULL_ITEM: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityField {
    /// Name as declared in C#.
    pub name: String,
    /// camelCase key used in TypeScript and the mock data.
    pub key: String,
    /// TypeScript element type (without `[]`).
    pub ts_type: String,
    pub is_array: bool,
    pub is_nullable: bool,
    pub is_integral: bool,
    pub is_date: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityModel {
    pub class_name: String,
    pub fields: Vec<EntityField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Id,
    Money,
    Rating,
    Percent,
    Count,
    Number,
    Flag,
    Bool,
    Image,
    Email,
    Status,
    Title,
    Date,
    Text,
    List,
    Map,
}

pub fn parse_entity(source: &str) -> Option<EntityModel> {
    let class = CLASS_RE.captures(source)?;
    let class_name = class.get(1)?.as_str().to_string();
    let after = class.get(0)?.end();
    let body = class_body(&source[after..]);

    let fields = body
        .lines()
        .filter_map(|line| PROPERTY_RE.captures(line))
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().to_string();
            let raw_type = caps.name("ty")?.as_str();
            let comment = caps
                .name("comment")
                .map(|c| c.as_str().trim().to_string())
                .filter(|c| !c.is_empty());
            Some(build_field(name, raw_type, comment))
        })
        .collect();
    Some(EntityModel { class_name, fields })
}

/// Text between the class's opening brace and its matching close.
fn class_body(rest: &str) -> &str {
    let Some(open) = rest.find('{') else {
        return "";
    };
    let mut depth = 0usize;
    for (i, c) in rest[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &rest[open + 1..open + i];
                }
            }
            _ => {}
        }
    }
    &rest[open + 1..]
}

fn generic_arg<'a>(ty: &'a str, names: &[&str]) -> Option<&'a str> {
    let (head, rest) = ty.split_once('<')?;
    let head = head.rsplit('.').next()?;
    let inner = rest.strip_suffix('>')?;
    names.contains(&head).then(|| inner.trim())
}

fn build_field(name: String, raw_type: &str, comment: Option<String>) -> EntityField {
    let mut ty = raw_type.trim();
    let mut is_nullable = false;
    if let Some(inner) = ty.strip_suffix('?') {
        ty = inner;
        is_nullable = true;
    }
    if let Some(inner) = generic_arg(ty, &["Nullable"]) {
        ty = inner;
        is_nullable = true;
    }

    let (element, is_array) = if let Some(inner) = ty.strip_suffix("[]") {
        (inner, true)
    } else if let Some(inner) = generic_arg(ty, COLLECTIONS) {
        (inner, true)
    } else {
        (ty, false)
    };

    let (ts_type, is_integral, is_date) = match generic_arg(element, DICTIONARIES) {
        Some(args) => {
            let value = args.split_once(',').map_or("object", |(_, v)| v.trim());
            (format!("Record<string, {}>", scalar_type(value).0), false, false)
        }
        None => scalar_type(element),
    };

    EntityField {
        key: camel_case(&name),
        name,
        ts_type,
        is_array,
        is_nullable,
        is_integral,
        is_date,
        comment,
    }
}

/// Maps a C# scalar type to `(ts type, integral, date)`. Unknown types are
/// treated as string-valued enums.
fn scalar_type(cs: &str) -> (String, bool, bool) {
    let cs = cs.trim().trim_end_matches('?');
    let cs = cs.rsplit('.').next().unwrap_or(cs);
    let (ts, integral, date) = match cs {
        "int" | "long" | "short" | "byte" | "sbyte" | "uint" | "ulong" | "ushort" | "Int16"
        | "Int32" | "Int64" | "UInt16" | "UInt32" | "UInt64" | "Byte" => ("number", true, false),
        "float" | "double" | "decimal" | "Single" | "Double" | "Decimal" => {
            ("number", false, false)
        }
        "bool" | "Boolean" => ("boolean", false, false),
        "DateTime" | "DateTimeOffset" | "DateOnly" => ("string", false, true),
        "object" | "dynamic" => ("unknown", false, false),
        _ => ("string", false, false),
    };
    (ts.to_string(), integral, date)
}

/// `GameId` -> `gameId`, `URLPath` -> `urlPath`, `ID` -> `id`
pub fn camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut leading = true;
    for (i, &c) in chars.iter().enumerate() {
        if leading && c.is_ascii_uppercase() {
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if next_lower && i > 0 {
                leading = false;
                out.push(c);
            } else {
                out.push(c.to_ascii_lowercase());
            }
        } else {
            leading = false;
            out.push(c);
        }
    }
    out
}

/// `DisplayName` -> `Display Name`
fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev_lower = chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev_lower || (next_lower && chars[i - 1].is_ascii_uppercase()) {
                out.push(' ');
            }
        }
        if c != '_' {
            out.push(c);
        } else {
            out.push(' ');
        }
    }
    out
}

fn contains_any(name: &str, words: &[&str]) -> bool {
    words.iter().any(|w| name.contains(w))
}

fn classify(field: &EntityField) -> FieldKind {
    let n = field.name.to_ascii_lowercase();
    if field.is_array {
        return FieldKind::List;
    }
    if field.ts_type.starts_with("Record<") {
        return FieldKind::Map;
    }
    match field.ts_type.as_str() {
        "number" => {
            if n == "id" || n.ends_with("id") {
                FieldKind::Id
            } else if contains_any(&n, &["price", "amount", "cost", "jackpot", "balance", "salary", "revenue", "fee", "total"]) {
                FieldKind::Money
            } else if contains_any(&n, &["rating", "score", "stars"]) {
                FieldKind::Rating
            } else if contains_any(&n, &["percent", "rate", "ratio", "progress"]) {
                FieldKind::Percent
            } else if contains_any(&n, &["count", "quantity", "qty", "players", "stock", "views"]) {
                FieldKind::Count
            } else {
                FieldKind::Number
            }
        }
        "boolean" => {
            if n.starts_with("is") || n.starts_with("has") || n.starts_with("can") {
                FieldKind::Flag
            } else {
                FieldKind::Bool
            }
        }
        _ if field.is_date => FieldKind::Date,
        "string" => {
            if contains_any(&n, &["url", "image", "thumbnail", "photo", "avatar", "picture", "cover", "logo"]) {
                FieldKind::Image
            } else if n.contains("email") {
                FieldKind::Email
            } else if contains_any(&n, &["status", "state", "stage", "tier", "level", "category"]) {
                FieldKind::Status
            } else if contains_any(&n, &["name", "title", "label"]) {
                FieldKind::Title
            } else {
                FieldKind::Text
            }
        }
        _ => FieldKind::Text,
    }
}

fn status_values(field: &EntityField) -> Vec<String> {
    let from_comment: Vec<String> = field
        .comment
        .as_deref()
        .map(|c| {
            QUOTED_RE
                .captures_iter(c)
                .filter_map(|m| m.get(1).map(|v| v.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default();
    if from_comment.is_empty() {
        STATUS_FALLBACK.iter().map(|s| s.to_string()).collect()
    } else {
        from_comment
    }
}

fn scalar_mock(field: &EntityField, kind: FieldKind, i: usize, class_name: &str) -> Value {
    match kind {
        FieldKind::Id => json!(1001 + i),
        FieldKind::Money => json!(MONEY[i % 5]),
        FieldKind::Rating => json!(RATINGS[i % 5]),
        FieldKind::Percent => json!(PERCENTS[i % 5]),
        FieldKind::Count => json!(COUNTS[i % 5]),
        FieldKind::Number if field.is_integral => json!((i + 1) * 10),
        FieldKind::Number => json!((i + 1) as f64 * 10.5),
        FieldKind::Flag | FieldKind::Bool => json!(i % 2 == 0),
        FieldKind::Image => json!(format!(
            "https://picsum.photos/seed/{}-{}/400/300",
            class_name.to_ascii_lowercase(),
            i + 1
        )),
        FieldKind::Email => json!(format!("user{}@example.com", i + 1)),
        FieldKind::Status => {
            let values = status_values(field);
            json!(values[i % values.len()])
        }
        FieldKind::Title => json!(format!("{} {}", NAME_WORDS[i % 5], humanize(class_name))),
        FieldKind::Date => json!(format!("2024-{:02}-{:02}T10:30:00Z", i + 1, 5 + i * 5)),
        FieldKind::Map => json!({ "primary": i + 1 }),
        FieldKind::Text | FieldKind::List => json!(format!("{} {}", humanize(&field.name), i + 1)),
    }
}

fn mock_value(field: &EntityField, kind: FieldKind, i: usize, class_name: &str) -> Value {
    if field.is_nullable && i == NULL_ITEM && kind != FieldKind::Id {
        return Value::Null;
    }
    if kind != FieldKind::List {
        return scalar_mock(field, kind, i, class_name);
    }
    match field.ts_type.as_str() {
        "number" => json!([i + 1, i + 2]),
        "boolean" => json!([true, false]),
        "string" if !field.is_date => json!([TAG_WORDS[i % 5], TAG_WORDS[(i + 2) % 5]]),
        _ => {
            let element = EntityField {
                is_array: false,
                ..field.clone()
            };
            let kind = classify(&element);
            json!([scalar_mock(&element, kind, i, class_name)])
        }
    }
}

pub fn mock_items(model: &EntityModel) -> Vec<Value> {
    (0..MOCK_ITEM_COUNT)
        .map(|i| {
            let mut item = Map::new();
            for field in &model.fields {
                let kind = classify(field);
                item.insert(field.key.clone(), mock_value(field, kind, i, &model.class_name));
            }
            Value::Object(item)
        })
        .collect()
}

pub fn choose_layout(model: &EntityModel) -> LayoutStrategy {
    if model
        .fields
        .iter()
        .any(|f| !f.is_array && classify(f) == FieldKind::Image)
    {
        LayoutStrategy::Gallery
    } else if model.fields.len() > 8 {
        LayoutStrategy::Table
    } else {
        LayoutStrategy::SimpleCard
    }
}

fn ts_type_of(field: &EntityField) -> String {
    let mut ty = field.ts_type.clone();
    if field.is_array {
        ty.push_str("[]");
    }
    if field.is_nullable {
        ty.push_str(" | null");
    }
    ty
}

pub fn ts_interface(model: &EntityModel) -> String {
    let mut out = format!("export interface {} {{\n", model.class_name);
    for field in &model.fields {
        let _ = write!(out, "  {}: {};", field.key, ts_type_of(field));
        if let Some(comment) = &field.comment {
            let _ = write!(out, " // {comment}");
        }
        out.push('\n');
    }
    out.push('}');
    out
}

pub fn property_descriptors(model: &EntityModel) -> Vec<PropertyDescriptor> {
    model
        .fields
        .iter()
        .map(|f| PropertyDescriptor {
            name: f.key.clone(),
            ty: if f.is_array {
                format!("{}[]", f.ts_type)
            } else {
                f.ts_type.clone()
            },
            is_array: f.is_array,
            is_nullable: f.is_nullable,
            comment: f.comment.clone(),
        })
        .collect()
}

// --- component generation ---

fn status_style(value: &str) -> &'static str {
    let v = value.to_ascii_lowercase().replace([' ', '_', '-'], "");
    if contains_any(&v, &["active", "online", "available", "open", "complete", "success", "approved", "paid"])
        && !v.contains("inactive")
    {
        "bg-emerald-500/20 text-emerald-400 border border-emerald-500/30"
    } else if contains_any(&v, &["maintenance", "pending", "warning", "paused", "review", "processing"]) {
        "bg-amber-500/20 text-amber-400 border border-amber-500/30"
    } else if contains_any(&v, &["inactive", "offline", "closed", "error", "failed", "banned", "cancel", "suspend"]) {
        "bg-red-500/20 text-red-400 border border-red-500/30"
    } else if contains_any(&v, &["soon", "new", "draft", "beta", "upcoming"]) {
        "bg-sky-500/20 text-sky-400 border border-sky-500/30"
    } else {
        "bg-slate-700/50 text-slate-300 border border-slate-600"
    }
}

fn icon_for(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Id => "Hash",
        FieldKind::Money => "DollarSign",
        FieldKind::Rating => "Star",
        FieldKind::Percent => "Percent",
        FieldKind::Count => "Users",
        FieldKind::Number => "BarChart3",
        FieldKind::Flag | FieldKind::Bool => "Check",
        FieldKind::Image => "Link",
        FieldKind::Email => "Mail",
        FieldKind::Date => "Calendar",
        FieldKind::List | FieldKind::Map => "Layers",
        FieldKind::Status | FieldKind::Title | FieldKind::Text => "Tag",
    }
}

struct ComponentWriter<'a> {
    model: &'a EntityModel,
    fields: Vec<(&'a EntityField, FieldKind)>,
    icons: BTreeSet<&'static str>,
}

impl<'a> ComponentWriter<'a> {
    fn new(model: &'a EntityModel) -> Self {
        Self {
            model,
            fields: model.fields.iter().map(|f| (f, classify(f))).collect(),
            icons: BTreeSet::new(),
        }
    }

    fn icon(&mut self, name: &'static str, size: u32, class: &str) -> String {
        self.icons.insert(name);
        if class.is_empty() {
            format!("<{name} size={{{size}}} />")
        } else {
            format!("<{name} size={{{size}}} className=\"{class}\" />")
        }
    }

    fn has(&self, kind: FieldKind) -> bool {
        self.fields.iter().any(|(_, k)| *k == kind)
    }

    fn first(&self, kind: FieldKind) -> Option<&'a EntityField> {
        self.fields.iter().find(|(_, k)| *k == kind).map(|(f, _)| *f)
    }

    fn item_key(&self) -> String {
        match self.first(FieldKind::Id) {
            Some(id) => format!("item.{}", id.key),
            None => "index".to_string(),
        }
    }

    /// A JSX expression container showing the field's value.
    fn value(&mut self, field: &EntityField, kind: FieldKind) -> String {
        let access = format!("item.{}", field.key);
        let shown = match kind {
            FieldKind::Money => format!("currency.format({access})"),
            FieldKind::Count => format!("{access}.toLocaleString()"),
            FieldKind::Rating => format!("{access}.toFixed(1)"),
            FieldKind::Percent => format!("`${{{access}.toFixed(1)}}%`"),
            FieldKind::Date => format!("new Date({access}).toLocaleDateString()"),
            FieldKind::Flag | FieldKind::Bool => format!("{access} ? 'Yes' : 'No'"),
            FieldKind::Map => format!("`${{Object.keys({access}).length}} entries`"),
            FieldKind::List => format!("{access}.map((v) => String(v)).join(', ')"),
            FieldKind::Id => format!("`#${{{access}}}`"),
            _ => access.clone(),
        };
        if field.is_nullable {
            format!("{{{access} != null ? {shown} : 'N/A'}}")
        } else {
            format!("{{{shown}}}")
        }
    }

    fn status_badge(&self, field: &EntityField) -> String {
        format!(
            "<span className={{`rounded-full px-2 py-0.5 text-xs font-medium ${{statusStyles[item.{key}] ?? 'bg-slate-700/50 text-slate-300'}}`}}>{{item.{key}}}</span>",
            key = field.key
        )
    }

    fn title(&self) -> String {
        match self.first(FieldKind::Title) {
            Some(f) if f.is_nullable => format!("{{item.{} ?? '{} #' + (index + 1)}}", f.key, humanize(&self.model.class_name)),
            Some(f) => format!("{{item.{}}}", f.key),
            None => format!("{} #{{index + 1}}", humanize(&self.model.class_name)),
        }
    }

    fn preamble(&self, interface: &str) -> String {
        let mut out = String::from("import React from 'react';\n");
        let icons: Vec<&str> = self.icons.iter().copied().collect();
        let _ = writeln!(out, "import {{ {} }} from 'lucide-react';\n", icons.join(", "));
        out.push_str(interface);
        out.push_str("\n\n");
        if self.has(FieldKind::Money) {
            out.push_str("const currency = new Intl.NumberFormat('en-US', { style: 'currency', currency: 'USD' });\n\n");
        }
        if let Some(status) = self.first(FieldKind::Status) {
            out.push_str("const statusStyles: Record<string, string> = {\n");
            let mut seen = BTreeSet::new();
            for value in status_values(status) {
                if seen.insert(value.clone()) {
                    let _ = writeln!(out, "  '{value}': '{}',", status_style(&value));
                }
            }
            out.push_str("};\n\n");
        }
        out
    }

    fn empty_state(&self) -> String {
        format!(
            "  if (!items || items.length === 0) {{\n    return <div className=\"p-8 text-center text-slate-500\">No {} records to display.</div>;\n  }}\n",
            humanize(&self.model.class_name).to_lowercase()
        )
    }

    fn detail_row(&mut self, field: &EntityField, kind: FieldKind) -> String {
        let icon = self.icon(icon_for(kind), 14, "");
        let value = self.value(field, kind);
        format!(
            "              <div className=\"flex items-center justify-between text-sm\">\n                <span className=\"flex items-center gap-1 text-slate-400\">{icon} {label}</span>\n                <span className=\"font-medium text-slate-200\">{value}</span>\n              </div>\n",
            label = humanize(&field.name)
        )
    }

    fn cards(&mut self, with_image: bool) -> String {
        let image = if with_image { self.first(FieldKind::Image) } else { None };
        let title_field = self.first(FieldKind::Title);
        let status_field = self.first(FieldKind::Status);
        let title = self.title();

        let mut card = String::new();
        let _ = writeln!(
            card,
            "        <div key={{{}}} className=\"flex flex-col overflow-hidden rounded-xl border border-slate-800 bg-slate-900 shadow-lg\">",
            self.item_key()
        );
        if let Some(img) = image {
            let placeholder = self.icon("Image", 32, "text-slate-600");
            let _ = writeln!(
                card,
                "          {{item.{key} ? (\n            <img src={{item.{key}}} alt=\"{alt}\" className=\"h-40 w-full object-cover\" />\n          ) : (\n            <div className=\"flex h-40 w-full items-center justify-center bg-slate-800\">{placeholder}</div>\n          )}}",
                key = img.key,
                alt = humanize(&self.model.class_name),
            );
        }
        card.push_str("          <div className=\"flex flex-1 flex-col p-4\">\n");
        card.push_str("            <div className=\"mb-3 flex items-start justify-between gap-2\">\n");
        let _ = writeln!(card, "              <h3 className=\"text-lg font-semibold text-white\">{title}</h3>");
        if let Some(status) = status_field {
            let _ = writeln!(card, "              {}", self.status_badge(status));
        }
        card.push_str("            </div>\n");

        let flags: Vec<&EntityField> = self
            .fields
            .iter()
            .filter(|(_, k)| *k == FieldKind::Flag)
            .map(|(f, _)| *f)
            .collect();
        if !flags.is_empty() {
            card.push_str("            <div className=\"mb-3 flex flex-wrap gap-2\">\n");
            for flag in flags {
                let label = humanize(flag.name.trim_start_matches("Is").trim_start_matches("Has"));
                let sparkle = self.icon("Sparkles", 12, "");
                let _ = writeln!(
                    card,
                    "              {{item.{} && (<span className=\"flex items-center gap-1 rounded bg-blue-500/20 px-2 py-0.5 text-xs text-blue-300\">{sparkle} {}</span>)}}",
                    flag.key,
                    if label.is_empty() { humanize(&flag.name) } else { label }
                );
            }
            card.push_str("            </div>\n");
        }

        card.push_str("            <div className=\"space-y-2\">\n");
        let details: Vec<(&EntityField, FieldKind)> = self
            .fields
            .iter()
            .filter(|(f, k)| {
                !matches!(k, FieldKind::Flag | FieldKind::List)
                    && Some(*f) != title_field
                    && Some(*f) != status_field
                    && Some(*f) != image
            })
            .copied()
            .collect();
        for (field, kind) in details {
            let row = self.detail_row(field, kind);
            card.push_str(&row);
        }
        card.push_str("            </div>\n");

        let lists: Vec<&EntityField> = self
            .fields
            .iter()
            .filter(|(_, k)| *k == FieldKind::List)
            .map(|(f, _)| *f)
            .collect();
        for list in lists {
            let _ = writeln!(
                card,
                "            <div className=\"mt-3 flex flex-wrap gap-1\">\n              {{(item.{} ?? []).map((entry) => (\n                <span key={{String(entry)}} className=\"rounded bg-slate-800 px-2 py-0.5 text-xs text-slate-300\">{{String(entry)}}</span>\n              ))}}\n            </div>",
                list.key
            );
        }

        let play = self.icon("Play", 14, "");
        let _ = writeln!(
            card,
            "            <div className=\"mt-auto pt-4\">\n              <button className=\"flex w-full items-center justify-center gap-2 rounded-lg bg-blue-600 py-2 text-sm font-medium text-white hover:bg-blue-500\">\n                {play} View Details\n              </button>\n            </div>"
        );
        card.push_str("          </div>\n        </div>\n");

        let mut body = String::new();
        body.push_str(&self.empty_state());
        body.push_str("  return (\n    <div className=\"grid grid-cols-1 gap-6 sm:grid-cols-2 lg:grid-cols-3\">\n");
        body.push_str("      {items.map((item, index) => (\n");
        body.push_str(&card);
        body.push_str("      ))}\n    </div>\n  );\n");
        body
    }

    fn table(&mut self) -> String {
        let mut head = String::new();
        let mut cells = String::new();
        let fields = self.fields.clone();
        for (field, kind) in fields {
            let _ = writeln!(head, "            <th className=\"px-4 py-3\">{}</th>", humanize(&field.name));
            let cell = match kind {
                FieldKind::Status => self.status_badge(field),
                FieldKind::Flag | FieldKind::Bool => {
                    let yes = self.icon("Check", 14, "text-emerald-400");
                    let no = self.icon("X", 14, "text-slate-600");
                    format!("{{item.{} ? {yes} : {no}}}", field.key)
                }
                _ => self.value(field, kind),
            };
            let _ = writeln!(cells, "              <td className=\"px-4 py-3\">{cell}</td>");
        }
        let edit = self.icon("Edit", 12, "");
        format!(
            "{empty}  return (\n    <div className=\"overflow-x-auto rounded-xl border border-slate-800\">\n      <table className=\"w-full text-left text-sm\">\n        <thead className=\"bg-slate-900 text-xs uppercase text-slate-400\">\n          <tr>\n{head}            <th className=\"px-4 py-3 text-right\">Actions</th>\n          </tr>\n        </thead>\n        <tbody>\n          {{items.map((item, index) => (\n            <tr key={{{key}}} className=\"border-t border-slate-800 hover:bg-slate-900/50\">\n{cells}              <td className=\"px-4 py-3 text-right\">\n                <button className=\"inline-flex items-center gap-1 rounded bg-blue-600 px-3 py-1 text-xs text-white\">{edit} Edit</button>\n              </td>\n            </tr>\n          ))}}\n        </tbody>\n      </table>\n    </div>\n  );\n",
            empty = self.empty_state(),
            key = self.item_key(),
        )
    }

    fn write(mut self, layout: &LayoutStrategy, interface: &str) -> String {
        let body = match layout {
            LayoutStrategy::Table => self.table(),
            LayoutStrategy::Gallery => self.cards(true),
            _ => self.cards(false),
        };
        let mut out = self.preamble(interface);
        let _ = write!(
            out,
            "export default function GeneratedComponent({{ items }}: {{ items: {}[] }}) {{\n{body}}}\n",
            self.model.class_name
        );
        out
    }
}

pub fn component_source(model: &EntityModel, layout: &LayoutStrategy) -> String {
    ComponentWriter::new(model).write(layout, &ts_interface(model))
}

pub fn design_rationale(model: &EntityModel, layout: &LayoutStrategy, locale: Locale) -> String {
    let count = model.fields.len();
    match locale {
        Locale::En => {
            let (name, reason) = match layout {
                LayoutStrategy::Gallery => ("gallery", "the entity carries an image, so each item leads with its visual"),
                LayoutStrategy::Table => ("table", "with this many properties a dense, scannable grid reads best"),
                _ => ("simple card", "the entity is compact enough to show every property on one card"),
            };
            format!(
                "{} is presented as a {name} layout because {reason} ({count} properties). Status values use semantic badge colours and the primary action is pinned to the bottom of each card.",
                model.class_name
            )
        }
        Locale::Zh => {
            let (name, reason) = match layout {
                LayoutStrategy::Gallery => ("圖庫", "此實體包含圖片欄位，因此每個項目以圖片為主"),
                LayoutStrategy::Table => ("表格", "屬性數量較多，使用緊湊的表格最便於瀏覽"),
                _ => ("簡潔卡片", "此實體屬性精簡，可在單一卡片中完整呈現"),
            };
            format!(
                "{} 採用{name}版面，因為{reason}（共 {count} 個屬性）。狀態欄位使用語意化的徽章顏色，主要操作按鈕固定於卡片底部。",
                model.class_name
            )
        }
    }
}

/// Builds the full record for an entity source.
pub fn synthesize_result(source: &str, locale: Locale) -> Result<GenerationResult, ServiceError> {
    let model = parse_entity(source)
        .ok_or_else(|| ServiceError::Other("No C# class declaration found in the entity source.".into()))?;
    let layout = choose_layout(&model);
    let items = mock_items(&model);
    let json_code =
        serde_json::to_string_pretty(&items).map_err(|e| ServiceError::Other(e.to_string()))?;
    Ok(GenerationResult {
        class_name: model.class_name.clone(),
        ts_code: ts_interface(&model),
        json_code,
        properties: property_descriptors(&model),
        react_component_code: component_source(&model, &layout),
        design_rationale: design_rationale(&model, &layout, locale),
        layout_strategy: layout,
    })
}

/// The reply text as a chat model would send it.
pub fn synthesize_reply(source: &str, locale: Locale) -> Result<String, ServiceError> {
    let result = synthesize_result(source, locale)?;
    let body = serde_json::to_string_pretty(&result).map_err(|e| ServiceError::Other(e.to_string()))?;
    Ok(format!(
        "Here is the generated bridge for `{}`:\n\n```json\n{body}\n```\n",
        result.class_name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::DEFAULT_SOURCE;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_default_entity() {
        let model = parse_entity(DEFAULT_SOURCE).unwrap();
        assert_eq!(model.class_name, "GameInfo");
        let keys: Vec<&str> = model.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "gameId",
                "displayName",
                "thumbnailUrl",
                "currentJackpot",
                "status",
                "tags",
                "playerCount",
                "isNew"
            ]
        );
        let thumb = &model.fields[2];
        assert!(thumb.is_nullable);
        let tags = &model.fields[5];
        assert!(tags.is_array);
        assert_eq!(tags.ts_type, "string");
        assert_eq!(
            model.fields[4].comment.as_deref(),
            Some("\"Active\", \"Maintenance\", \"ComingSoon\"")
        );
    }

    #[test]
    fn type_mapping_covers_common_shapes() {
        let model = parse_entity(
            "public class Order {\n  public Guid Id { get; init; }\n  public int[] Scores { get; set; }\n  public IEnumerable<decimal> Prices { get; set; }\n  public Dictionary<string, int> Stock { get; set; } = new();\n  public DateTime? ShippedAt { get; set; }\n  public Nullable<bool> Paid { get; set; }\n  public static int Counter { get; set; }\n  private string secret;\n}",
        )
        .unwrap();
        let shapes: Vec<(String, bool, bool)> = model
            .fields
            .iter()
            .map(|f| (f.ts_type.clone(), f.is_array, f.is_nullable))
            .collect();
        assert_eq!(
            shapes,
            vec![
                ("string".to_string(), false, false),
                ("number".to_string(), true, false),
                ("number".to_string(), true, false),
                ("Record<string, number>".to_string(), false, false),
                ("string".to_string(), false, true),
                ("boolean".to_string(), false, true),
            ]
        );
        assert!(model.fields[4].is_date);
    }

    #[test]
    fn camel_and_human_names() {
        assert_eq!(camel_case("GameId"), "gameId");
        assert_eq!(camel_case("URLPath"), "urlPath");
        assert_eq!(camel_case("ID"), "id");
        assert_eq!(camel_case("already"), "already");
        assert_eq!(humanize("DisplayName"), "Display Name");
        assert_eq!(humanize("GameInfo"), "Game Info");
    }

    #[test]
    fn mock_items_are_deterministic() {
        let model = parse_entity(DEFAULT_SOURCE).unwrap();
        let items = mock_items(&model);
        assert_eq!(items.len(), 5);
        assert_eq!(items, mock_items(&model));
        assert_eq!(items[0]["gameId"], 1001);
        assert_eq!(items[0]["status"], "Active");
        assert_eq!(items[1]["status"], "Maintenance");
        assert_eq!(items[2]["status"], "ComingSoon");
        assert_eq!(items[3]["thumbnailUrl"], Value::Null);
        assert_eq!(items[0]["tags"], json!(["Featured", "Popular"]));
        assert_eq!(items[0]["isNew"], true);
        assert_eq!(items[0]["displayName"], "Aurora Game Info");
    }

    #[test]
    fn layout_rules() {
        let gallery = parse_entity(DEFAULT_SOURCE).unwrap();
        assert_eq!(choose_layout(&gallery), LayoutStrategy::Gallery);

        let small = parse_entity("class Tag { public string Name { get; set; } }").unwrap();
        assert_eq!(choose_layout(&small), LayoutStrategy::SimpleCard);

        let wide: String = (0..9)
            .map(|i| format!("public int Field{i} {{ get; set; }}\n"))
            .collect();
        let wide = parse_entity(&format!("class Metrics {{\n{wide}}}")).unwrap();
        assert_eq!(choose_layout(&wide), LayoutStrategy::Table);
    }

    #[test]
    fn rationale_follows_locale() {
        let model = parse_entity(DEFAULT_SOURCE).unwrap();
        let en = design_rationale(&model, &LayoutStrategy::Gallery, Locale::En);
        assert!(en.starts_with("GameInfo is presented as a gallery layout"));
        let zh = design_rationale(&model, &LayoutStrategy::Gallery, Locale::Zh);
        assert!(zh.contains("圖庫"));
    }

    #[test]
    fn reply_is_fenced_json() {
        let reply = synthesize_reply(DEFAULT_SOURCE, Locale::En).unwrap();
        assert!(reply.starts_with("Here is the generated bridge for `GameInfo`"));
        assert!(reply.contains("```json\n{"));
        assert!(reply.trim_end().ends_with("```"));
    }

    #[test]
    fn source_without_class_is_rejected() {
        assert!(matches!(
            synthesize_result("just some text", Locale::En),
            Err(ServiceError::Other(_))
        ));
    }

    #[test]
    fn component_imports_the_icons_it_uses() {
        let model = parse_entity(DEFAULT_SOURCE).unwrap();
        let code = component_source(&model, &LayoutStrategy::Gallery);
        assert!(code.starts_with("import React from 'react';\nimport { "));
        for icon in ["DollarSign", "Image", "Play", "Sparkles", "Users", "Hash"] {
            assert!(code.contains(&format!("<{icon} ")), "{icon} missing");
        }
        assert!(code.contains("export default function GeneratedComponent({ items }: { items: GameInfo[] })"));
        assert!(code.contains("mt-auto"));
    }
}
