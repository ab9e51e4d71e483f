//! QuickJS realm for generated components.
//!
//! Every run gets its own runtime and context on a dedicated thread with a
//! large native stack. The runtime's memory limit, stack limit and interrupt
//! handler bound what generated code can consume; an exhausted step budget
//! ends the run with an interrupt that generated code cannot catch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rquickjs::{Context, Ctx, FromJs, Function, Runtime, Value};
use tracing::debug;

use super::icons::{kebab_name, ICON_NAMES};

const PRELUDE: &str = include_str!("runtime.js");

/// Native stack for the sandbox thread. QuickJS stops at
/// [`SandboxLimits::max_stack_size`] long before this is used up.
const THREAD_STACK_SIZE: usize = 32 * 1024 * 1024;

/// QuickJS polls the interrupt handler once per this many calls and jumps.
const STEPS_PER_POLL: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Calls and loop iterations allowed per run.
    pub step_budget: u64,
    /// Heap ceiling of one runtime, in bytes.
    pub memory_limit: usize,
    /// JavaScript stack ceiling, in bytes.
    pub max_stack_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        SandboxLimits {
            step_budget: 2_000_000,
            memory_limit: 64 * 1024 * 1024,
            max_stack_size: 4 * 1024 * 1024,
        }
    }
}

/// Runs `job` on a fresh thread sized for deep recursion and waits for it.
pub fn isolated<T: Send>(job: impl FnOnce() -> Result<T, String> + Send) -> Result<T, String> {
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("sandbox".to_string())
            .stack_size(THREAD_STACK_SIZE)
            .spawn_scoped(scope, job)
            .map_err(|e| format!("could not start sandbox thread: {e}"))?;
        handle
            .join()
            .map_err(|_| "sandbox thread panicked".to_string())?
    })
}

/// One runtime plus context with the React, Lucide and polyfill globals.
pub struct Realm {
    context: Context,
    exhausted: Arc<AtomicBool>,
    _runtime: Runtime,
}

impl Realm {
    pub fn new(limits: SandboxLimits) -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|e| format!("could not create runtime: {e}"))?;
        runtime.set_memory_limit(limits.memory_limit);
        runtime.set_max_stack_size(limits.max_stack_size);

        let exhausted = Arc::new(AtomicBool::new(false));
        let flag = exhausted.clone();
        let mut polls_left = (limits.step_budget / STEPS_PER_POLL).max(1);
        runtime.set_interrupt_handler(Some(Box::new(move || {
            if polls_left == 0 {
                flag.store(true, Ordering::Relaxed);
                return true;
            }
            polls_left -= 1;
            false
        })));

        let context =
            Context::full(&runtime).map_err(|e| format!("could not create context: {e}"))?;
        let realm = Realm {
            context,
            exhausted,
            _runtime: runtime,
        };
        realm
            .context
            .with(|ctx| install(&ctx).map_err(|e| realm.describe(&ctx, e)))?;
        Ok(realm)
    }

    /// Evaluates `code` as a global script and converts its completion value.
    pub fn eval<T>(&self, code: String) -> Result<T, String>
    where
        T: for<'js> FromJs<'js>,
    {
        self.context.with(|ctx| {
            let result: rquickjs::Result<T> = ctx.eval(code);
            result.map_err(|e| self.describe(&ctx, e))
        })
    }

    fn describe(&self, ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
        if self.exhausted.load(Ordering::Relaxed) {
            return "step budget exhausted".to_string();
        }
        match error {
            rquickjs::Error::Exception => describe_thrown(&ctx.catch()),
            other => other.to_string(),
        }
    }
}

fn install(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let installer: Function = ctx.eval(PRELUDE)?;
    let host_log = Function::new(ctx.clone(), |method: String, line: String| {
        debug!(target: "sandbox", method = %method, "{line}");
    })?;
    let icons: Vec<Vec<String>> = ICON_NAMES
        .iter()
        .map(|name| vec![name.to_string(), kebab_name(name)])
        .collect();
    installer.call::<_, ()>((host_log, icons))
}

/// `Name: message` for error objects, the value itself for anything else.
fn describe_thrown(thrown: &Value<'_>) -> String {
    if let Some(object) = thrown.as_object() {
        let name: Option<String> = object.get("name").ok().flatten();
        let message: Option<String> = object.get("message").ok().flatten();
        return match (name, message) {
            (Some(name), Some(message)) if !message.is_empty() => format!("{name}: {message}"),
            (Some(name), _) => name,
            (None, Some(message)) => message,
            (None, None) => "Uncaught exception".to_string(),
        };
    }
    if let Some(text) = thrown.as_string().and_then(|s| s.to_string().ok()) {
        return format!("Uncaught {text}");
    }
    if let Some(n) = thrown.as_number() {
        return format!("Uncaught {n}");
    }
    "Uncaught exception".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str, limits: SandboxLimits) -> Result<String, String> {
        let script = script.to_string();
        isolated(move || Realm::new(limits)?.eval::<String>(script))
    }

    #[test]
    fn realm_exposes_only_sandbox_globals() {
        let out = run(
            "[typeof React.createElement, typeof Lucide.Star, typeof Zap, typeof Math.random, \
             typeof Date.now, typeof eval, typeof window, typeof require].join()",
            SandboxLimits::default(),
        )
        .unwrap();
        assert_eq!(out, "function,function,function,undefined,undefined,undefined,undefined,undefined");
    }

    #[test]
    fn recursion_within_the_stack_limit_completes() {
        let out = run(
            "function f(n) { return n === 0 ? 0 : 1 + f(n - 1); } String(f(190))",
            SandboxLimits::default(),
        )
        .unwrap();
        assert_eq!(out, "190");
    }

    #[test]
    fn runaway_recursion_is_a_stack_overflow() {
        let err = run(
            "function f(n) { return n === 0 ? 0 : 1 + f(n - 1); } String(f(1e7))",
            SandboxLimits::default(),
        )
        .unwrap_err();
        assert!(err.contains("stack overflow"), "{err}");
    }

    #[test]
    fn unbounded_string_growth_is_stopped() {
        let err = run(
            "let s = 'xxxxxxxx'; for (let i = 0; i < 40; i++) { s = s + s; } String(s.length)",
            SandboxLimits::default(),
        );
        assert!(err.is_err(), "{err:?}");
    }

    #[test]
    fn memory_limit_stops_allocation_loops() {
        let err = run(
            "const keep = []; while (true) { keep.push(new Array(1024).fill(keep.length)); }",
            SandboxLimits {
                step_budget: u64::MAX,
                ..Default::default()
            },
        );
        assert!(err.is_err(), "{err:?}");
    }

    #[test]
    fn step_budget_interrupts_even_inside_try() {
        let err = run(
            "try { while (true) {} } catch (e) { 'caught' }",
            SandboxLimits {
                step_budget: 5_000,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, "step budget exhausted");
    }

    #[test]
    fn thrown_values_are_described() {
        let limits = SandboxLimits::default();
        assert_eq!(run("throw new TypeError('bad')", limits).unwrap_err(), "TypeError: bad");
        assert_eq!(run("throw 'plain'", limits).unwrap_err(), "Uncaught plain");
        assert!(run("window.location", limits)
            .unwrap_err()
            .starts_with("ReferenceError"));
    }
}
