pub mod config;
pub mod core;
pub mod error;

pub use crate::config::Config;
pub use crate::core::{MethodSignature, RendererKind, TraceRequest, Tracer};
pub use crate::error::{Result, TraceError};
