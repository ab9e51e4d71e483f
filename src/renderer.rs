//! Runtime renderer: owns the single compiled component slot of a preview.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::compiler::SandboxLimits;
use crate::compiler::{compile, CompileOptions, CompiledComponent};
use crate::error::{DemoError, ErrorKind};
use crate::transform::transform;

pub const LOADING_MESSAGE: &str = "Mounting Bridge...";
pub const COMPILATION_TITLE: &str = "Compilation Warning";
pub const RUNTIME_TITLE: &str = "Runtime Render Error";
pub const REGENERATE_HINT: &str = "AI generated code might have syntax issues. Try 'Generate' again.";

#[derive(Debug, Default)]
pub enum RendererState {
    #[default]
    Idle,
    Compiling,
    Mounted {
        component: CompiledComponent,
        data: Vec<Value>,
    },
    Errored {
        kind: ErrorKind,
        message: String,
    },
}

/// What the preview area shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewPanel {
    Loading {
        message: String,
    },
    Live {
        html: String,
    },
    Error {
        kind: ErrorKind,
        title: String,
        message: String,
        hint: Option<String>,
    },
}

impl PreviewPanel {
    fn from_error(kind: ErrorKind, message: &str) -> Self {
        let (title, hint) = match kind {
            ErrorKind::Render => (RUNTIME_TITLE, None),
            _ => (COMPILATION_TITLE, Some(REGENERATE_HINT.to_string())),
        };
        PreviewPanel::Error {
            kind,
            title: title.to_string(),
            message: message.to_string(),
            hint,
        }
    }
}

/// Summary of the renderer state for session snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RendererStatus {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct RuntimeRenderer {
    source: String,
    data: Vec<Value>,
    options: CompileOptions,
    state: RendererState,
}

impl RuntimeRenderer {
    pub fn new(data: Vec<Value>, class_name: Option<String>, limits: SandboxLimits) -> Self {
        Self {
            source: String::new(),
            data,
            options: CompileOptions { class_name, limits },
            state: RendererState::Idle,
        }
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Feeds new component source. The previous component is dropped before
    /// the new one is compiled.
    pub fn set_source(&mut self, source: &str) {
        if source.trim().is_empty() {
            self.source.clear();
            self.state = RendererState::Idle;
            return;
        }
        if source == self.source && !matches!(self.state, RendererState::Idle) {
            return;
        }
        self.source = source.to_string();
        self.state = RendererState::Compiling;

        let transformed = transform(source);
        self.state = match compile(&transformed, &self.options) {
            Ok(component) => {
                info!(binding = component.binding(), "✅ Component mounted");
                RendererState::Mounted {
                    component,
                    data: self.data.clone(),
                }
            }
            Err(e) => {
                warn!("❌ Component failed to compile: {e}");
                errored(&e)
            }
        };
    }

    /// Renders the current state. A runtime exception moves the renderer to
    /// `Errored` and drops the component.
    pub fn render(&mut self) -> PreviewPanel {
        let outcome = match &self.state {
            RendererState::Idle | RendererState::Compiling => {
                return PreviewPanel::Loading {
                    message: LOADING_MESSAGE.to_string(),
                }
            }
            RendererState::Errored { kind, message } => {
                return PreviewPanel::from_error(*kind, message)
            }
            RendererState::Mounted { component, data } => component.render(data),
        };
        match outcome {
            Ok(html) => PreviewPanel::Live { html },
            Err(e) => {
                warn!("❌ Runtime render error: {e}");
                self.state = errored(&e);
                PreviewPanel::from_error(e.kind(), &e.to_string())
            }
        }
    }

    pub fn status(&self) -> RendererStatus {
        match &self.state {
            RendererState::Idle => RendererStatus {
                state: "idle",
                binding: None,
                error: None,
            },
            RendererState::Compiling => RendererStatus {
                state: "compiling",
                binding: None,
                error: None,
            },
            RendererState::Mounted { component, .. } => RendererStatus {
                state: "mounted",
                binding: Some(component.binding().to_string()),
                error: None,
            },
            RendererState::Errored { message, .. } => RendererStatus {
                state: "errored",
                binding: None,
                error: Some(message.clone()),
            },
        }
    }
}

fn errored(e: &DemoError) -> RendererState {
    RendererState::Errored {
        kind: e.kind(),
        message: e.to_string(),
    }
}

/// One-shot compile and render, used by the stateless preview endpoint.
pub fn render_once(
    code: &str,
    data: Vec<Value>,
    class_name: Option<String>,
    limits: SandboxLimits,
) -> PreviewPanel {
    let mut renderer = RuntimeRenderer::new(data, class_name, limits);
    renderer.set_source(code);
    renderer.render()
}
