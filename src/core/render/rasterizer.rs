// src/core/render/rasterizer.rs
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::RasterizerConfig;
use crate::error::{TraceError, Result};

/// Placeholder in `RasterizerConfig::args` replaced by the text diagram path
pub const INPUT_PLACEHOLDER: &str = "{input}";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Command that would be run for one diagram, kept separate so it can be inspected without spawning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Turns a bracketed-text diagram into an image with an external program
#[derive(Debug, Clone)]
pub struct Rasterizer {
    config: RasterizerConfig,
}

impl Rasterizer {
    pub fn new(config: &RasterizerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Resolve the configured program on PATH (or as a literal path)
    pub fn locate(&self) -> Option<PathBuf> {
        which::which(&self.config.program).ok()
    }

    /// Where the rasterizer is expected to leave the image for `input`
    pub fn image_path(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.config.image_extension)
    }

    pub fn command_for(&self, program: PathBuf, input: &Path) -> RasterizerCommand {
        let input = input.to_string_lossy();
        let args = self
            .config
            .args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect();
        RasterizerCommand { program, args }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    /// Run the rasterizer on `input` and return the expected image path
    ///
    /// The process is killed once `timeout_ms` has elapsed.
    pub fn rasterize(&self, input: &Path) -> Result<PathBuf> {
        let program = self.locate().ok_or_else(|| {
            TraceError::Rasterizer(format!(
                "cannot find '{}' on PATH",
                self.config.program
            ))
        })?;
        let command = self.command_for(program, input);

        debug!("Running rasterizer {:?} {:?}", command.program, command.args);

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                TraceError::Rasterizer(format!(
                    "failed to execute {}: {}",
                    command.program.display(),
                    e
                ))
            })?;

        let start = Instant::now();
        let timeout = self.timeout();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        warn!(
                            "Killing {} after {:?}",
                            command.program.display(),
                            timeout
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(TraceError::Rasterizer(format!(
                            "{} timed out after {:?}",
                            command.program.display(),
                            timeout
                        )));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(TraceError::Rasterizer(format!(
                        "failed to wait for {}: {}",
                        command.program.display(),
                        e
                    )))
                }
            }
        };

        if !status.success() {
            return Err(TraceError::Rasterizer(format!(
                "{} exited with {:?}",
                command.program.display(),
                status.code()
            )));
        }

        Ok(self.image_path(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(program: &str) -> RasterizerConfig {
        RasterizerConfig {
            program: program.to_string(),
            ..RasterizerConfig::default()
        }
    }

    #[test]
    fn test_command_substitutes_input() {
        let rasterizer = Rasterizer::new(&RasterizerConfig::default());
        let command =
            rasterizer.command_for(PathBuf::from("/usr/bin/sequence"), Path::new("/tmp/A.run().txt"));

        assert_eq!(command.args, vec!["--headless", "/tmp/A.run().txt"]);
        assert_eq!(
            rasterizer.image_path(Path::new("/tmp/A.run().txt")),
            PathBuf::from("/tmp/A.run().png")
        );
    }

    #[test]
    fn test_missing_program_is_reported() {
        let rasterizer = Rasterizer::new(&config("calltrace-no-such-rasterizer"));
        assert!(rasterizer.locate().is_none());
        assert!(matches!(
            rasterizer.rasterize(Path::new("/tmp/x.txt")),
            Err(TraceError::Rasterizer(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_program() {
        let rasterizer = Rasterizer::new(&config("true"));
        let image = rasterizer.rasterize(Path::new("/tmp/diagram.txt")).unwrap();
        assert_eq!(image, PathBuf::from("/tmp/diagram.png"));
    }

    #[cfg(unix)]
    #[test]
    fn test_hanging_program_is_killed() {
        let config = RasterizerConfig {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
            timeout_ms: 200,
            ..RasterizerConfig::default()
        };
        let rasterizer = Rasterizer::new(&config);

        let start = Instant::now();
        let result = rasterizer.rasterize(Path::new("/tmp/diagram.txt"));

        assert!(matches!(result, Err(TraceError::Rasterizer(message)) if message.contains("timed out")));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program() {
        let rasterizer = Rasterizer::new(&config("false"));
        assert!(matches!(
            rasterizer.rasterize(Path::new("/tmp/diagram.txt")),
            Err(TraceError::Rasterizer(_))
        ));
    }
}
