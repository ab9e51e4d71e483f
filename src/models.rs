use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::renderer::RendererStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

/// One call to the generation service. The prompt text is derived from the
/// entity source and the locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub source: String,
    pub locale: Locale,
}

impl GenerationRequest {
    pub fn new(source: impl Into<String>, locale: Locale) -> Self {
        Self {
            source: source.into(),
            locale,
        }
    }

    pub fn prompt(&self) -> String {
        let language = match self.locale {
            Locale::Zh => {
                "CRITICAL: The 'designRationale' field MUST be in Traditional Chinese (繁體中文)."
            }
            Locale::En => "The 'designRationale' field MUST be in English.",
        };
        format!(
            "Transpile this C# Entity into:
1. TypeScript interface (.d.ts).
2. Mock JSON data (5+ items).
3. A React component 'GeneratedComponent' (Tailwind + Lucide icons) to display the items prop.

Design Requirements:
- Modern, clean card layout (or table if appropriate).
- **CRITICAL**: Action buttons (e.g., \"View Details\", \"Play Now\", \"Edit\") MUST be positioned at the absolute bottom of their container card (use flex-col and mt-auto on the button wrapper).
- Use semantic colors for status and badges.
- {language}

C# Code:
{}",
            self.source
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// How the generated component lays out the items. Values outside the known
/// set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutStrategy {
    Gallery,
    Table,
    SimpleCard,
    Other(String),
}

impl Default for LayoutStrategy {
    fn default() -> Self {
        LayoutStrategy::SimpleCard
    }
}

impl From<String> for LayoutStrategy {
    fn from(value: String) -> Self {
        match value.as_str() {
            "gallery" => LayoutStrategy::Gallery,
            "table" => LayoutStrategy::Table,
            "simple-card" => LayoutStrategy::SimpleCard,
            _ => LayoutStrategy::Other(value),
        }
    }
}

impl From<LayoutStrategy> for String {
    fn from(value: LayoutStrategy) -> Self {
        match value {
            LayoutStrategy::Gallery => "gallery".to_string(),
            LayoutStrategy::Table => "table".to_string(),
            LayoutStrategy::SimpleCard => "simple-card".to_string(),
            LayoutStrategy::Other(other) => other,
        }
    }
}

/// The structured record the generation service returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub ts_code: String,
    pub json_code: String,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default)]
    pub layout_strategy: LayoutStrategy,
    pub react_component_code: String,
    #[serde(default)]
    pub design_rationale: String,
}

/// A sanitized result together with its parsed mock data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationAssets {
    pub result: GenerationResult,
    pub mock_data: Vec<serde_json::Value>,
}

// --- HTTP API payloads ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub locale: Option<Locale>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceUpdate {
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleUpdate {
    pub locale: Locale,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    pub code: String,
    #[serde(default, alias = "jsonCode")]
    pub json_code: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<serde_json::Value>>,
    #[serde(default, alias = "className")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub step: u8,
    pub state: &'static str,
    pub source: String,
    pub locale: Locale,
    pub banner: Option<Banner>,
    pub result: Option<GenerationResult>,
    pub mock_data: Option<Vec<serde_json::Value>>,
    pub renderer: Option<RendererStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
