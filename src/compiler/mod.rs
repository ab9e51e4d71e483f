//! Dynamic compiler/loader for generated TSX components.
//!
//! Source goes through three stages: the parser erases types and lowers JSX,
//! the emitter prints the result as plain JavaScript, and a fresh QuickJS
//! [`Realm`](sandbox::Realm) evaluates it with only React, Lucide and the
//! icon bindings in scope. The component binding is then resolved from the
//! names the program defined.
//!
//! A [`CompiledComponent`] is plain data: the emitted program and the
//! resolved binding. Each render evaluates the program again in its own
//! realm, so nothing generated code does survives a render.

pub mod ast;
pub mod emit;
pub mod error;
mod icons;
pub mod jsx;
pub mod lexer;
pub mod parser;
pub mod sandbox;

use tracing::{debug, warn};

use crate::error::DemoError;
use crate::transform::TransformedSource;

use self::sandbox::Realm;

pub use self::sandbox::SandboxLimits;

/// Name the generation prompt asks the component to be declared under.
pub const PRIMARY_COMPONENT: &str = "GeneratedComponent";

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Entity class name, used for the `<Class>Gallery` / `<Class>Table` fallbacks.
    pub class_name: Option<String>,
    pub limits: SandboxLimits,
}

#[derive(Debug, Clone)]
pub struct CompiledComponent {
    program: String,
    binding: String,
    limits: SandboxLimits,
}

impl CompiledComponent {
    /// The top-level name the component was resolved from.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Renders the component once with `{ items }` and returns its HTML.
    pub fn render(&self, items: &[serde_json::Value]) -> Result<String, DemoError> {
        let items = serde_json::to_string(items)
            .and_then(|json| serde_json::to_string(&json))
            .map_err(|e| DemoError::Render(e.to_string()))?;
        let call = format!("__sandbox.render({}, {items})", self.binding);
        sandbox::isolated(|| {
            let realm = Realm::new(self.limits)?;
            realm.eval::<()>(self.program.clone())?;
            realm.eval::<String>(call)
        })
        .map_err(DemoError::Render)
    }
}

/// Transpiles, evaluates and resolves a transformed component source.
pub fn compile(
    source: &TransformedSource,
    options: &CompileOptions,
) -> Result<CompiledComponent, DemoError> {
    let resolution = resolution_script(
        source.default_export.as_deref(),
        options.class_name.as_deref(),
    );
    let (program, mut found) = sandbox::isolated(|| {
        let program = parser::parse_program(&source.code).map_err(|e| e.to_string())?;
        let program = emit::emit_program(&program);
        let realm = Realm::new(options.limits)?;
        realm.eval::<()>(program.clone())?;
        let found: Vec<String> = realm.eval(resolution)?;
        Ok((program, found))
    })
    .map_err(DemoError::Compilation)?;

    match found.len() {
        0 => Err(DemoError::ComponentNotFound),
        1 => {
            let binding = found.remove(0);
            debug!(%binding, "🔍 Resolved component binding");
            Ok(CompiledComponent {
                program,
                binding,
                limits: options.limits,
            })
        }
        _ => {
            warn!(candidates = ?found, "⚠️ Several fallback components resolved");
            Err(DemoError::AmbiguousComponent(found))
        }
    }
}

/// Resolution order: captured default export, then the primary name, then
/// the fallback names. Several distinct fallbacks are ambiguous.
fn resolution_script(default_export: Option<&str>, class_name: Option<&str>) -> String {
    let explicit: Vec<String> = default_export
        .into_iter()
        .chain([PRIMARY_COMPONENT])
        .map(str::to_string)
        .collect();

    let mut fallbacks = Vec::new();
    if let Some(class) = class_name.filter(|c| !c.is_empty()) {
        fallbacks.push(format!("{class}Gallery"));
        fallbacks.push(format!("{class}Table"));
    }
    fallbacks.extend(["App", "Gallery", "Table"].map(str::to_string));

    format!(
        "__sandbox.resolve([{}], [{}])",
        candidate_list(&explicit),
        candidate_list(&fallbacks)
    )
}

fn candidate_list(names: &[String]) -> String {
    names
        .iter()
        .filter(|name| emit::is_binding_name(name))
        .map(|name| {
            format!("[\"{name}\", typeof {name} === \"undefined\" ? undefined : {name}]")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;
    use pretty_assertions::assert_eq;

    fn build(code: &str, class_name: Option<&str>) -> Result<CompiledComponent, DemoError> {
        let source = transform(code);
        compile(
            &source,
            &CompileOptions {
                class_name: class_name.map(str::to_string),
                ..Default::default()
            },
        )
    }

    /// Evaluates a TSX expression and returns it converted with `String()`.
    fn eval_str(expr: &str) -> String {
        evaluate(expr, "String(__result)").unwrap()
    }

    /// Evaluates a TSX expression and mounts the result as HTML.
    fn html(expr: &str) -> Result<String, String> {
        evaluate(expr, "__sandbox.html(__result)")
    }

    fn evaluate(expr: &str, finish: &str) -> Result<String, String> {
        let program = parser::parse_program(&format!("const __result = ({expr});"))
            .map_err(|e| e.to_string())?;
        let program = emit::emit_program(&program);
        let finish = finish.to_string();
        sandbox::isolated(move || {
            let realm = Realm::new(SandboxLimits::default())?;
            realm.eval::<()>(program)?;
            realm.eval::<String>(finish)
        })
    }

    #[test]
    fn default_export_wins() {
        let compiled = build(
            "const GeneratedComponent = () => <p>named</p>;\nexport default function Foo({ items }) { return <p>{items.length}</p>; }",
            None,
        )
        .unwrap();
        assert!(compiled.binding().starts_with("__defaultExport_"));
        assert_eq!(compiled.render(&[serde_json::json!({"a": 1})]).unwrap(), "<p>1</p>");
    }

    #[test]
    fn primary_name_then_class_fallbacks() {
        let compiled = build("function GeneratedComponent() { return null; }", None).unwrap();
        assert_eq!(compiled.binding(), "GeneratedComponent");

        let compiled = build("const HeroGallery = () => <div />;", Some("Hero")).unwrap();
        assert_eq!(compiled.binding(), "HeroGallery");
    }

    #[test]
    fn missing_component_is_reported() {
        let err = build("const helper = 1;", None).unwrap_err();
        assert_eq!(err, DemoError::ComponentNotFound);
        assert_eq!(
            err.to_string(),
            "Could not find a valid React Component in the generated code."
        );
    }

    #[test]
    fn non_callable_candidates_are_ignored() {
        let err = build("const GeneratedComponent = { render: 1 };", None).unwrap_err();
        assert_eq!(err, DemoError::ComponentNotFound);
    }

    #[test]
    fn distinct_fallbacks_are_ambiguous() {
        let err = build("const App = () => null; const Table = () => null;", None).unwrap_err();
        assert_eq!(
            err,
            DemoError::AmbiguousComponent(vec!["App".to_string(), "Table".to_string()])
        );
        // Aliases of one function are not ambiguous.
        let ok = build("const App = () => null; const Gallery = App;", None).unwrap();
        assert_eq!(ok.binding(), "App");
    }

    #[test]
    fn class_names_that_are_not_identifiers_are_skipped() {
        let ok = build("const App = () => null;", Some("x]; throw 1; [")).unwrap();
        assert_eq!(ok.binding(), "App");
    }

    #[test]
    fn syntax_and_runtime_errors_become_compilation_errors() {
        let err = build("const GeneratedComponent = () => <div>;", None).unwrap_err();
        assert!(matches!(err, DemoError::Compilation(ref m) if m.contains("SyntaxError")), "{err}");

        let err = build("const x = window.location; const GeneratedComponent = () => null;", None)
            .unwrap_err();
        assert!(
            matches!(err, DemoError::Compilation(ref m) if m.starts_with("ReferenceError") && m.contains("window")),
            "{err}"
        );
    }

    #[test]
    fn runaway_top_level_code_exhausts_the_budget() {
        let source = transform("while (true) {}\nconst GeneratedComponent = () => null;");
        let err = compile(
            &source,
            &CompileOptions {
                class_name: None,
                limits: SandboxLimits {
                    step_budget: 5_000,
                    ..Default::default()
                },
            },
        )
        .unwrap_err();
        assert!(matches!(err, DemoError::Compilation(ref m) if m.contains("budget")));
    }

    #[test]
    fn deep_recursion_and_nesting_at_the_limits_compile() {
        let parens = "(".repeat(parser::MAX_NESTING / 2 - 4) + "1" + &")".repeat(parser::MAX_NESTING / 2 - 4);
        let code = format!(
            "function depth(n) {{ return n === 0 ? 0 : 1 + depth(n - 1); }}\n\
             const reached = depth(200) + {parens};\n\
             const GeneratedComponent = () => <b>{{reached}}</b>;"
        );
        let compiled = build(&code, None).unwrap();
        assert_eq!(compiled.render(&[]).unwrap(), "<b>201</b>");
    }

    #[test]
    fn runaway_recursion_is_a_compilation_error() {
        let err = build(
            "function f(n) { return f(n + 1) + 1; }\nf(0);\nconst GeneratedComponent = () => null;",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DemoError::Compilation(ref m) if m.contains("stack overflow")), "{err}");
    }

    #[test]
    fn string_doubling_is_stopped() {
        let err = build(
            "let s = 'xxxxxxxx'; for (let i = 0; i < 40; i++) { s = s + s; }\nconst GeneratedComponent = () => null;",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DemoError::Compilation(_)), "{err}");
    }

    #[test]
    fn render_exceptions_are_render_errors() {
        let compiled =
            build("const GeneratedComponent = ({ items }) => <p>{items[0].missing.deep}</p>;", None)
                .unwrap();
        let err = compiled.render(&[serde_json::json!({})]).unwrap_err();
        assert!(
            matches!(err, DemoError::Render(ref m) if m.starts_with("TypeError") && m.contains("deep")),
            "{err}"
        );
    }

    #[test]
    fn renders_do_not_share_state() {
        let compiled = build(
            "let renders = 0;\nconst GeneratedComponent = () => { renders++; return <i>{renders}</i>; };",
            None,
        )
        .unwrap();
        assert_eq!(compiled.render(&[]).unwrap(), "<i>1</i>");
        assert_eq!(compiled.render(&[]).unwrap(), "<i>1</i>");
    }

    #[test]
    fn regex_literals_run() {
        let compiled = build(
            "const GeneratedComponent = ({ items }) => <ul>{items.map(i => <li key={i.name}>{i.name.replace(/a/g, 'b')}</li>)}</ul>;",
            None,
        )
        .unwrap();
        let html = compiled
            .render(&[serde_json::json!({"name": "banana"})])
            .unwrap();
        assert_eq!(html, "<ul><li>bbnbnb</li></ul>");
    }

    #[test]
    fn item_strings_reach_the_component_verbatim() {
        let compiled =
            build("const GeneratedComponent = ({ items }) => <p>{items[0].note}</p>;", None).unwrap();
        let html = compiled
            .render(&[serde_json::json!({"note": "a \"quoted\" </p> \u{2028} line"})])
            .unwrap();
        assert_eq!(html, "<p>a \"quoted\" &lt;/p&gt; \u{2028} line</p>");
    }

    #[test]
    fn typical_generated_component_renders() {
        let code = r#"
import React, { useState } from 'react';
import { Star, Zap } from 'lucide-react';

interface GameInfo { title: string; rating: number; tags?: string[] }

export default function GeneratedComponent({ items }: { items: GameInfo[] }) {
  const [filter] = React.useState<string>('');
  const visible = items.filter((g) => g.title.toLowerCase().includes(filter));
  return (
    <div className="grid grid-cols-3 gap-4">
      {visible.map((game, i) => (
        <div key={i} className="flex flex-col">
          <h3>{game.title}</h3>
          <span><Star size={12} /> {game.rating.toFixed(1)}</span>
          {game.tags?.length ? <ul>{game.tags.map(t => <li key={t}>{t}</li>)}</ul> : null}
          <button className="mt-auto" onClick={() => alert('x')}>Play</button>
        </div>
      ))}
    </div>
  );
}
"#;
        let compiled = build(code, Some("GameInfo")).unwrap();
        let html = compiled
            .render(&[
                serde_json::json!({"title": "Hades", "rating": 4.85, "tags": ["rogue"]}),
                serde_json::json!({"title": "Celeste", "rating": 4.5}),
            ])
            .unwrap();
        assert!(html.starts_with(r#"<div class="grid grid-cols-3 gap-4">"#));
        assert!(html.contains("<h3>Hades</h3>"));
        assert!(html.contains("<li>rogue</li>"));
        assert!(html.contains(" 4.5</span>"));
        assert!(html.contains(r#"<button class="mt-auto">Play</button>"#));
        assert_eq!(html.matches("lucide-star").count(), 2);
    }

    #[test]
    fn language_features_survive_type_erasure() {
        assert_eq!(
            eval_str("(() => { const make = (base: number) => ({ add: (n: number) => base + n }); const { add } = make(10); const [first, , third = 'z', ...others] = [1, 2, undefined, 4, 5]; return `${add(first) + others.length}${third}`; })()"),
            "13z"
        );
        assert_eq!(
            eval_str("(() => { let sum = 0; for (let i = 0; i < 10; i++) { if (i % 2) continue; if (i > 6) break; sum += i; } return sum; })()"),
            "12"
        );
        assert_eq!(eval_str("(() => { const a: any = null; return a?.b.c.d ?? 'none'; })()"), "none");
        assert_eq!(eval_str("[5, 1, 4].map(n => n * 2).filter(n => n > 2).sort((a, b) => a - b).join('|')"), "8|10");
        assert_eq!(eval_str("(4.85).toFixed(1)"), "4.8");
        assert_eq!(eval_str("'x_y_z'.replaceAll('_', ' ')"), "x y z");
    }

    #[test]
    fn numbers_format_the_same_in_every_locale() {
        assert_eq!(eval_str("(1234567.891).toLocaleString()"), "1,234,567.891");
        assert_eq!(eval_str("(1234567.891).toLocaleString('de-DE')"), "1,234,567.891");
        assert_eq!(
            eval_str("new Intl.NumberFormat('en-US', { style: 'currency', currency: 'USD' }).format(1234.5)"),
            "$1,234.50"
        );
        assert_eq!(eval_str("(0.256).toLocaleString('en-US', { style: 'percent' })"), "26%");
    }

    #[test]
    fn dates_need_explicit_input_and_are_utc() {
        assert_eq!(eval_str("new Date('2024-03-05').getFullYear()"), "2024");
        assert_eq!(eval_str("new Date('2024-03-05T10:00:00').getHours()"), "10");
        assert_eq!(eval_str("new Date('2024-03-05').toISOString()"), "2024-03-05T00:00:00.000Z");
        assert_eq!(eval_str("new Date('2024-03-05').toLocaleDateString()"), "3/5/2024");
        assert_eq!(
            eval_str("new Date('2024-03-05').toLocaleDateString('en-US', { year: 'numeric', month: 'short', day: 'numeric' })"),
            "Mar 5, 2024"
        );
        assert_eq!(eval_str("new Date(2024, 0, 31).getDate()"), "31");
        assert_eq!(eval_str("new Date().toString()"), "Invalid Date");
    }

    #[test]
    fn hooks_render_statically() {
        assert_eq!(eval_str("React.useState(() => 7)[0]"), "7");
        assert_eq!(eval_str("React.useMemo(() => [1, 2].length, [])"), "2");
        assert_eq!(eval_str("typeof React.useState(0)[1]"), "function");
        assert_eq!(eval_str("React.useEffect(() => { throw 1; }, [])"), "undefined");
        assert_eq!(eval_str("typeof useState"), "undefined");
    }

    #[test]
    fn create_element_extracts_key() {
        assert_eq!(
            eval_str("(() => { const el = React.createElement('li', { key: 3, className: 'row' }, 'a', 'b'); return [el.key, 'key' in el.props, el.children.length].join(); })()"),
            "3,false,2"
        );
    }

    #[test]
    fn attributes_follow_react_naming() {
        let out = html(
            r#"<label htmlFor="n" className="a b" onClick={() => 1} hidden={false} disabled>
                 x &lt; y
               </label>"#,
        )
        .unwrap();
        assert_eq!(out, r#"<label for="n" class="a b" disabled="">x &lt; y</label>"#);
    }

    #[test]
    fn style_objects_become_css() {
        let out = html(r#"<div style={{ width: 120, opacity: 0.5, backgroundColor: 'red', margin: 0, WebkitLineClamp: 2 }} />"#)
            .unwrap();
        assert_eq!(
            out,
            r#"<div style="width:120px;opacity:0.5;background-color:red;margin:0;-webkit-line-clamp:2"></div>"#
        );
    }

    #[test]
    fn components_and_fragments_expand() {
        let out = html(
            r#"(() => {
                const Badge = ({ label, children }) => <span>{label}:{children}</span>;
                return <><Badge label="HP">{10 * 2}</Badge><br />{[1, 2].map(n => <i key={n}>{n}</i>)}{null}{false}</>;
            })()"#,
        )
        .unwrap();
        assert_eq!(out, "<span>HP:20</span><br><i>1</i><i>2</i>");
    }

    #[test]
    fn icons_render_as_svg() {
        let out = html("<Zap size={14} className=\"text-yellow-400\" />").unwrap();
        assert!(out.starts_with("<svg "));
        assert!(out.contains(r#"class="lucide lucide-zap text-yellow-400""#));
        assert!(out.contains(r#"stroke-width="2""#));
        assert!(out.contains(r#"width="14""#));
        assert_eq!(html("<Lucide.BarChart3 />").unwrap().matches("lucide-bar-chart-3").count(), 1);
    }

    #[test]
    fn plain_objects_are_not_renderable() {
        let err = html("<div>{{ a: 1 }}</div>").unwrap_err();
        assert!(err.contains("Objects are not valid as a React child"), "{err}");
    }
}
