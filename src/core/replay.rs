// src/core/replay.rs
//! Replays recorded call-event scripts through a `Tracer`
//!
//! A script is a JSON-lines file, one event per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! {"root": "org.example.Shop.checkout(int cart) -> boolean", "max_depth": 3}
//! {"enter": {"owning_type": "org.example.Cart", "member_name": "total"}}
//! {"exit": "org.example.Cart.total() -> void"}
//! {"fail": null}
//! ```
//!
//! `fail` exits a frame the same way `exit` does, as a call that unwound.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{TraceError, Result};
use super::call_tree::MethodSignature;
use super::session::{CallGuard, RootGuard};
use super::tracer::{TraceRequest, Tracer};

/// Extension of script files picked up when walking a directory
pub const SCRIPT_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    Enter(MethodSignature),
    Root {
        signature: MethodSignature,
        request: TraceRequest,
    },
    Exit {
        signature: Option<MethodSignature>,
        failed: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// 1-based line number in the source text
    pub line: usize,
    pub event: ScriptEvent,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub events: Vec<ScriptLine>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, &content)
    }

    /// Parse every line up front; an exit with no open frame is rejected here
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let mut events = Vec::new();
        let mut open = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let event = parse_event(trimmed).map_err(|message| TraceError::Script { line, message })?;
            match event {
                ScriptEvent::Enter(_) | ScriptEvent::Root { .. } => open += 1,
                ScriptEvent::Exit { .. } => {
                    if open == 0 {
                        return Err(TraceError::Script {
                            line,
                            message: "exit without a matching entry".to_string(),
                        });
                    }
                    open -= 1;
                }
            }
            events.push(ScriptLine { line, event });
        }

        Ok(Self {
            name: name.into(),
            events,
        })
    }
}

fn parse_event(text: &str) -> std::result::Result<ScriptEvent, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "event must be a JSON object".to_string())?;

    if let Some(sig) = object.get("enter") {
        return Ok(ScriptEvent::Enter(parse_signature(sig)?));
    }
    if let Some(sig) = object.get("root") {
        let request: TraceRequest =
            serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        return Ok(ScriptEvent::Root {
            signature: parse_signature(sig)?,
            request,
        });
    }
    for (key, failed) in [("exit", false), ("fail", true)] {
        if let Some(sig) = object.get(key) {
            let signature = match sig {
                Value::Null => None,
                other => Some(parse_signature(other)?),
            };
            return Ok(ScriptEvent::Exit { signature, failed });
        }
    }

    Err("expected one of enter, root, exit, fail".to_string())
}

fn parse_signature(value: &Value) -> std::result::Result<MethodSignature, String> {
    match value {
        Value::String(text) => MethodSignature::parse(text).map_err(|e| e.to_string()),
        Value::Object(_) => serde_json::from_value(value.clone()).map_err(|e| e.to_string()),
        other => Err(format!("signature must be a string or an object, got {}", other)),
    }
}

/// What one script produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub script: String,
    pub events: usize,
    pub roots: usize,
    /// Diagram files of the sessions that started
    pub outputs: Vec<PathBuf>,
    /// Frames still open at the end of the script
    pub unclosed: usize,
}

enum Frame {
    Call(CallGuard),
    Root(RootGuard),
}

impl Frame {
    fn signature(&self) -> &MethodSignature {
        match self {
            Frame::Call(guard) => guard.signature(),
            Frame::Root(guard) => guard.signature(),
        }
    }
}

/// Drive `tracer` with the events of `script` on the calling thread
pub fn replay(tracer: &Tracer, script: &Script) -> ReplaySummary {
    let mut summary = ReplaySummary {
        script: script.name.clone(),
        ..ReplaySummary::default()
    };
    let mut frames: Vec<Frame> = Vec::new();

    for ScriptLine { line, event } in &script.events {
        summary.events += 1;
        match event {
            ScriptEvent::Enter(signature) => {
                frames.push(Frame::Call(tracer.enter(signature.clone())));
            }
            ScriptEvent::Root { signature, request } => {
                let guard = tracer.enter_root(signature.clone(), request.clone());
                summary.roots += 1;
                if let Some(output) = guard
                    .session_id()
                    .and_then(|id| tracer.registry().session_output(id))
                {
                    summary.outputs.push(output);
                }
                frames.push(Frame::Root(guard));
            }
            ScriptEvent::Exit { signature, failed } => {
                // Balanced at parse time
                let Some(frame) = frames.pop() else { continue };
                if let Some(expected) = signature {
                    if !frame.signature().same_member(expected) {
                        debug!(
                            "{}:{} exit of {} closes {}",
                            script.name,
                            line,
                            expected.short_string(),
                            frame.signature().short_string()
                        );
                    }
                }
                if *failed {
                    debug!("{}:{} {} failed", script.name, line, frame.signature().short_string());
                }
                drop(frame);
            }
        }
    }

    summary.unclosed = frames.len();
    while let Some(frame) = frames.pop() {
        drop(frame);
    }

    info!(
        "Replayed {} ({} events, {} diagrams)",
        summary.script,
        summary.events,
        summary.outputs.len()
    );
    summary
}

/// Replay each script on its own thread
pub fn replay_all(tracer: &Tracer, scripts: &[Script]) -> Result<Vec<ReplaySummary>> {
    thread::scope(|scope| {
        let handles = scripts
            .iter()
            .map(|script| {
                thread::Builder::new()
                    .name(format!("replay-{}", script.name))
                    .spawn_scoped(scope, move || replay(tracer, script))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        Ok(handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
            .collect())
    })
}

/// Script files named by `paths`; directories are walked for `*.jsonl`
pub fn collect_scripts(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();

    for path in paths {
        if path.is_file() {
            scripts.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            return Err(TraceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such script or directory: {}", path.display()),
            )));
        }

        let mut found: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(std::io::Error::from)?;
            let candidate = entry.path();
            if candidate.is_file()
                && candidate.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION)
            {
                found.push(candidate.to_path_buf());
            }
        }
        found.sort();
        scripts.extend(found);
    }

    Ok(scripts)
}
