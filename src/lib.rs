//! Interface Zero bridge: turns a C# entity into a live, sandboxed React
//! preview by way of a generation service.

pub mod compiler;
pub mod config;
pub mod error;
pub mod flow;
pub mod gemini;
pub mod models;
pub mod renderer;
pub mod routes;
pub mod sanitize;
pub mod session;
pub mod synth;
pub mod transform;
