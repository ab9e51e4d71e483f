/// A failure while tokenizing or parsing generated source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("SyntaxError: {message} (generated.tsx:{line})")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(src: &str, offset: usize, message: impl Into<String>) -> Self {
        SyntaxError {
            line: line_of(src, offset),
            message: message.into(),
        }
    }
}

pub fn line_of(src: &str, offset: usize) -> u32 {
    let offset = offset.min(src.len());
    src.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() as u32 + 1
}
