//! The three-step demo wizard as a value with consuming transitions.
//!
//! Every transition takes the flow by value and either returns the next
//! state or hands the unchanged state back inside [`Rejected`].

use tracing::info;

use crate::compiler::SandboxLimits;
use crate::error::{DemoError, ErrorKind, FlowError};
use crate::models::{GenerationAssets, GenerationRequest, Locale};
use crate::renderer::RuntimeRenderer;

pub const DEFAULT_SOURCE: &str = r#"namespace AFBPlay.Entities
{
    /// <summary>
    /// Core game definition for Casino Lobby
    /// </summary>
    public class GameInfo
    {
        public int GameId { get; set; }
        public string DisplayName { get; set; }
        public string? ThumbnailUrl { get; set; }
        public decimal CurrentJackpot { get; set; }
        public string Status { get; set; } // "Active", "Maintenance", "ComingSoon"
        public List<string> Tags { get; set; }
        public int PlayerCount { get; set; }
        public bool IsNew { get; set; }
    }
}"#;

/// Entity source and locale, carried through every state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub source: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug)]
pub enum DemoFlow {
    /// Step 1. `held` keeps a previous result after backward navigation.
    Editing {
        draft: Draft,
        banner: Option<ErrorBanner>,
        held: Option<GenerationAssets>,
    },
    /// Step 1 with a request in flight.
    Awaiting { draft: Draft },
    /// Step 2: generated assets are shown.
    Generated {
        draft: Draft,
        assets: GenerationAssets,
    },
    /// Step 3: the component is mounted in a renderer.
    Previewing {
        draft: Draft,
        assets: GenerationAssets,
        renderer: RuntimeRenderer,
    },
}

#[derive(Debug)]
pub struct Rejected {
    pub flow: DemoFlow,
    pub error: FlowError,
}

pub type Transition<T = DemoFlow> = Result<T, Rejected>;

impl Default for DemoFlow {
    fn default() -> Self {
        DemoFlow::new(DEFAULT_SOURCE.to_string(), Locale::En)
    }
}

impl DemoFlow {
    pub fn new(source: String, locale: Locale) -> Self {
        DemoFlow::Editing {
            draft: Draft { source, locale },
            banner: None,
            held: None,
        }
    }

    pub fn step(&self) -> u8 {
        match self {
            DemoFlow::Editing { .. } | DemoFlow::Awaiting { .. } => 1,
            DemoFlow::Generated { .. } => 2,
            DemoFlow::Previewing { .. } => 3,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            DemoFlow::Editing { .. } => "editing",
            DemoFlow::Awaiting { .. } => "awaiting",
            DemoFlow::Generated { .. } => "generated",
            DemoFlow::Previewing { .. } => "previewing",
        }
    }

    pub fn draft(&self) -> &Draft {
        match self {
            DemoFlow::Editing { draft, .. }
            | DemoFlow::Awaiting { draft }
            | DemoFlow::Generated { draft, .. }
            | DemoFlow::Previewing { draft, .. } => draft,
        }
    }

    pub fn banner(&self) -> Option<&ErrorBanner> {
        match self {
            DemoFlow::Editing { banner, .. } => banner.as_ref(),
            _ => None,
        }
    }

    /// The current or held generation result.
    pub fn assets(&self) -> Option<&GenerationAssets> {
        match self {
            DemoFlow::Editing { held, .. } => held.as_ref(),
            DemoFlow::Awaiting { .. } => None,
            DemoFlow::Generated { assets, .. } | DemoFlow::Previewing { assets, .. } => Some(assets),
        }
    }

    pub fn renderer(&self) -> Option<&RuntimeRenderer> {
        match self {
            DemoFlow::Previewing { renderer, .. } => Some(renderer),
            _ => None,
        }
    }

    pub fn renderer_mut(&mut self) -> Option<&mut RuntimeRenderer> {
        match self {
            DemoFlow::Previewing { renderer, .. } => Some(renderer),
            _ => None,
        }
    }

    fn reject(self, action: &'static str) -> Rejected {
        let error = match self {
            DemoFlow::Awaiting { .. } => FlowError::Busy,
            _ => FlowError::InvalidTransition {
                action,
                state: self.state_name(),
            },
        };
        Rejected { flow: self, error }
    }

    fn edit_draft(self, action: &'static str, edit: impl FnOnce(&mut Draft)) -> Transition {
        match self {
            DemoFlow::Editing {
                mut draft,
                banner,
                held,
            } => {
                edit(&mut draft);
                Ok(DemoFlow::Editing {
                    draft,
                    banner,
                    held,
                })
            }
            other => Err(other.reject(action)),
        }
    }

    pub fn edit_source(self, source: String) -> Transition {
        self.edit_draft("edit the source", |d| d.source = source)
    }

    pub fn set_locale(self, locale: Locale) -> Transition {
        self.edit_draft("change the locale", |d| d.locale = locale)
    }

    pub fn reset_source(self) -> Transition {
        self.edit_draft("reset the source", |d| d.source = DEFAULT_SOURCE.to_string())
    }

    /// Starts a generation request. Any held result and banner are discarded.
    pub fn submit(self) -> Transition<(DemoFlow, GenerationRequest)> {
        match self {
            DemoFlow::Editing { draft, .. } => {
                let request = GenerationRequest::new(draft.source.clone(), draft.locale);
                info!("🚀 Submitting entity source ({} chars)", draft.source.len());
                Ok((DemoFlow::Awaiting { draft }, request))
            }
            other => Err(other.reject("submit")),
        }
    }

    pub fn complete(self, outcome: Result<GenerationAssets, DemoError>) -> Transition {
        match self {
            DemoFlow::Awaiting { draft } => Ok(match outcome {
                Ok(assets) => {
                    info!("✅ Generated assets for {}", assets.result.class_name);
                    DemoFlow::Generated { draft, assets }
                }
                Err(e) => {
                    info!("❌ Generation failed: {e}");
                    DemoFlow::Editing {
                        draft,
                        banner: Some(ErrorBanner {
                            kind: e.kind(),
                            message: e.to_string(),
                        }),
                        held: None,
                    }
                }
            }),
            other => Err(other.reject("complete a generation")),
        }
    }

    /// Moves to `step`. Forward movement is only Generated → Previewing,
    /// which mounts the generated component; backward movement is free.
    pub fn navigate(self, step: u8, limits: SandboxLimits) -> Transition {
        if !(1..=3).contains(&step) {
            return Err(self.reject("navigate to an unknown step"));
        }
        if matches!(self, DemoFlow::Awaiting { .. }) {
            return Err(self.reject("navigate"));
        }
        if step == self.step() {
            return Ok(self);
        }
        match (self, step) {
            (DemoFlow::Generated { draft, assets }, 3) => {
                let mut renderer = RuntimeRenderer::new(
                    assets.mock_data.clone(),
                    Some(assets.result.class_name.clone()).filter(|c| !c.is_empty()),
                    limits,
                );
                renderer.set_source(&assets.result.react_component_code);
                info!("🔀 Previewing {}", assets.result.class_name);
                Ok(DemoFlow::Previewing {
                    draft,
                    assets,
                    renderer,
                })
            }
            (DemoFlow::Previewing { draft, assets, .. }, 2) => {
                Ok(DemoFlow::Generated { draft, assets })
            }
            (DemoFlow::Generated { draft, assets } | DemoFlow::Previewing { draft, assets, .. }, 1) => {
                Ok(DemoFlow::Editing {
                    draft,
                    banner: None,
                    held: Some(assets),
                })
            }
            (other, _) => Err(other.reject("navigate forward")),
        }
    }

    /// Back to editing from any state; the result and compiled component are
    /// discarded.
    pub fn restart(self) -> DemoFlow {
        let draft = match self {
            DemoFlow::Editing { draft, .. }
            | DemoFlow::Awaiting { draft }
            | DemoFlow::Generated { draft, .. }
            | DemoFlow::Previewing { draft, .. } => draft,
        };
        DemoFlow::Editing {
            draft,
            banner: None,
            held: None,
        }
    }

    pub fn dismiss_banner(self) -> DemoFlow {
        match self {
            DemoFlow::Editing { draft, held, .. } => DemoFlow::Editing {
                draft,
                banner: None,
                held,
            },
            other => other,
        }
    }
}
