use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::RendererKind;
use crate::error::{TraceError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults applied to every trace session
    pub trace: TraceConfig,

    /// External rasterizer used by the image renderer
    pub rasterizer: RasterizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Maximum recorded depth below the root call
    pub max_depth: usize,

    /// Renderer used when a session does not name one
    pub renderer: RendererKind,

    /// Directory for diagrams without an explicit output path (temp dir when unset)
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterizerConfig {
    /// Whether the image renderer should invoke the rasterizer at all
    pub enabled: bool,

    /// Program name (looked up on PATH) or absolute path
    pub program: String,

    /// Arguments; `{input}` is replaced by the text diagram path
    pub args: Vec<String>,

    /// Extension of the image the rasterizer produces next to the text file
    pub image_extension: String,

    /// How long to wait for the rasterizer before killing it, in milliseconds
    pub timeout_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            renderer: RendererKind::Text,
            output_dir: None,
        }
    }
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "sequence".to_string(),
            args: vec!["--headless".to_string(), "{input}".to_string()],
            image_extension: "png".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TraceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TraceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "Calltrace.toml",
                    "calltrace.toml",
                    ".calltrace.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rasterizer.enabled && self.rasterizer.program.trim().is_empty() {
            return Err(TraceError::Config(
                "rasterizer.program must not be empty when the rasterizer is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory used for diagrams without an explicit output path
    pub fn output_dir(&self) -> PathBuf {
        self.trace
            .output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calltrace.toml");

        let mut config = Config::default();
        config.trace.max_depth = 3;
        config.trace.renderer = RendererKind::Structured;
        config.rasterizer.program = "/opt/sequence/bin/sequence".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.trace.max_depth, 3);
        assert_eq!(loaded.trace.renderer, RendererKind::Structured);
        assert_eq!(loaded.rasterizer.program, "/opt/sequence/bin/sequence");
        assert_eq!(loaded.rasterizer.image_extension, "png");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calltrace.toml");
        std::fs::write(&path, "[trace]\nrenderer = \"image\"\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.trace.max_depth, 5);
        assert_eq!(loaded.trace.renderer, RendererKind::Image);
        assert!(loaded.rasterizer.enabled);
    }

    #[test]
    fn test_negative_depth_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calltrace.toml");
        std::fs::write(&path, "[trace]\nmax_depth = -1\n").unwrap();

        assert!(matches!(Config::load(&path), Err(TraceError::Config(_))));
    }

    #[test]
    fn test_large_depth_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calltrace.toml");
        std::fs::write(&path, "[trace]\nmax_depth = 100000\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.trace.max_depth, 100_000);
    }

    #[test]
    fn test_missing_explicit_file_falls_back_to_default() {
        let config = Config::load_or_default(Some("/nonexistent/calltrace.toml")).unwrap();
        assert_eq!(config.trace.max_depth, 5);
        assert_eq!(config.output_dir(), std::env::temp_dir());
    }
}
