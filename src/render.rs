//! Rendering graph descriptions to images with an external tool.
//!
//! The diagram pipeline only produces DOT text; turning it into pixels is the
//! job of a `Renderer`. `Graphviz` shells out to the `dot` program.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Failure in the render step
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Graphviz '{program}' command not found. Install Graphviz or use --no-render.")]
    ToolNotFound { program: String },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} failed with {status}{}", fmt_stderr(.stderr))]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

fn fmt_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Image formats the renderer can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    /// Detect format from an output path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    /// The `-T` argument value
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            "pdf" => Ok(ImageFormat::Pdf),
            _ => Err(format!(
                "Unknown image format: {}. Valid options: png, svg, pdf",
                s
            )),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a graph description file into an image
pub trait Renderer {
    fn render(&self, source: &Path, output: &Path, format: ImageFormat) -> Result<(), RenderError>;
}

/// Renderer backed by the Graphviz `dot` program
#[derive(Debug, Clone)]
pub struct Graphviz {
    program: String,
}

impl Graphviz {
    pub fn new() -> Self {
        Self::with_program("dot")
    }

    /// Use a different executable, e.g. `neato` or an absolute path
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Graphviz {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for Graphviz {
    fn render(
        &self,
        source: &Path,
        output: &Path,
        format: ImageFormat,
    ) -> Result<(), RenderError> {
        debug!(
            program = %self.program,
            source = %source.display(),
            output = %output.display(),
            "rendering"
        );

        let result = Command::new(&self.program)
            .arg(format!("-T{}", format))
            .arg(source)
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    RenderError::ToolNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    RenderError::Spawn {
                        program: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                program: self.program.clone(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        Ok(())
    }
}

/// Write a text artifact (e.g. the DOT file) to disk
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), RenderError> {
    fs::write(path, contents).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}
