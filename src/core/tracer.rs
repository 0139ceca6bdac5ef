// src/core/tracer.rs
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{TraceError, Result};
use super::call_tree::MethodSignature;
use super::render::RendererKind;
use super::session::{CallGuard, RootGuard, SessionId, SessionRegistry};

/// Per-call overrides for a root session; unset fields come from `Config.trace`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceRequest {
    pub max_depth: Option<i64>,
    pub output: Option<PathBuf>,
    pub renderer: Option<RendererKind>,
}

impl TraceRequest {
    pub fn with_depth(mut self, max_depth: i64) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_renderer(mut self, renderer: RendererKind) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

/// Entry point for the instrumentation layer
#[derive(Debug, Clone)]
pub struct Tracer {
    config: Config,
    registry: Arc<SessionRegistry>,
}

impl Tracer {
    /// Tracer on the process-wide registry
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, SessionRegistry::global())
    }

    pub fn with_registry(config: Config, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }

    /// Process-wide tracer, configured from the first config file found in
    /// the working directory
    pub fn global() -> &'static Tracer {
        static GLOBAL: OnceLock<Tracer> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = Config::load_or_default(None::<&Path>).unwrap_or_else(|e| {
                warn!("Ignoring invalid configuration: {}", e);
                Config::default()
            });
            debug!("Global tracer writes to {}", config.output_dir().display());
            Tracer::new(config)
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Enter an ordinary call; the returned guard exits it
    pub fn enter(&self, signature: MethodSignature) -> CallGuard {
        CallGuard::enter(self.registry.clone(), signature)
    }

    /// Enter a root-eligible call
    ///
    /// The call is recorded in every session already active on this thread,
    /// then a new session is started for it. If the session cannot be
    /// started the failure is logged and the call is still tracked for the
    /// enclosing sessions.
    pub fn enter_root(&self, signature: MethodSignature, request: TraceRequest) -> RootGuard {
        self.registry.on_enter(&signature);

        let session = match self.start_root_session(&signature, &request) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Not tracing {}: {}", signature.short_string(), e);
                None
            }
        };
        RootGuard::new(self.registry.clone(), signature, session)
    }

    /// Run `f` as an ordinary traced call
    pub fn in_call<R>(&self, signature: MethodSignature, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter(signature);
        f()
    }

    /// Run `f` as a root call, rendering its diagram when it returns or unwinds
    pub fn in_root<R>(
        &self,
        signature: MethodSignature,
        request: TraceRequest,
        f: impl FnOnce() -> R,
    ) -> R {
        let _guard = self.enter_root(signature, request);
        f()
    }

    /// Resolve `request` against the configuration and register the session
    pub fn start_root_session(
        &self,
        signature: &MethodSignature,
        request: &TraceRequest,
    ) -> Result<SessionId> {
        let max_depth = match request.max_depth {
            Some(depth) => validate_depth(depth)?,
            None => self.config.trace.max_depth,
        };
        let renderer = request.renderer.unwrap_or(self.config.trace.renderer);
        let output = request
            .output
            .clone()
            .unwrap_or_else(|| self.default_output_path(signature, renderer));

        info!("DIAGRAM START {}", signature.short_string());
        info!("The diagram will be written in: {}", output.display());

        self.registry.start_root_session(
            signature,
            max_depth,
            &output,
            renderer,
            &self.config.rasterizer,
        )
    }

    /// `<output dir>/Type.member(..).<ext>`
    pub fn default_output_path(&self, signature: &MethodSignature, renderer: RendererKind) -> PathBuf {
        self.config.output_dir().join(format!(
            "{}.{}",
            signature.short_string(),
            renderer.file_extension()
        ))
    }
}

/// Any non-negative depth is accepted
pub fn validate_depth(depth: i64) -> Result<usize> {
    usize::try_from(depth).map_err(|_| TraceError::InvalidDepth(depth))
}
