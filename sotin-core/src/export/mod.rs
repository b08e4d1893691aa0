//! Transcript export.
//!
//! Two renderers over a [`SessionSnapshot`]:
//! - **Markdown**: structured text that can be re-parsed for roles and citation counts
//! - **PDF**: the same text flowed onto plain pages
//!
//! Which of them exist is decided once, at startup, by [`ExportCapabilities::probe`].
//! Both are pure: the same snapshot always renders to the same bytes.

pub mod document;
pub mod text;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{DocumentLayout, ExportConfig};
use crate::error::SotinError;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Markdown,
    Pdf,
}

impl ExportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "sotin_chat.md",
            ExportFormat::Pdf => "sotin_chat.pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Accepts `md`/`markdown` and `pdf`, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Markdown => f.write_str("markdown"),
            ExportFormat::Pdf => f.write_str("pdf"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{0} export is not available in this build")]
    CapabilityUnavailable(ExportFormat),

    #[error("Document generation failed: {0}")]
    Document(String),
}

/// Result of the startup capability probe. Markdown is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCapabilities {
    pub document: bool,
}

impl ExportCapabilities {
    pub fn probe() -> Self {
        let capabilities = Self {
            document: document::is_supported(),
        };
        tracing::info!(pdf = capabilities.document, "Export capabilities probed");
        capabilities
    }

    pub fn text_only() -> Self {
        Self { document: false }
    }

    pub fn formats(&self) -> Vec<ExportFormat> {
        let mut formats = vec![ExportFormat::Markdown];
        if self.document {
            formats.push(ExportFormat::Pdf);
        }
        formats
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Markdown => true,
            ExportFormat::Pdf => self.document,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportPipeline {
    capabilities: ExportCapabilities,
    title: String,
    layout: DocumentLayout,
}

impl ExportPipeline {
    pub fn new(capabilities: ExportCapabilities, config: &ExportConfig) -> Self {
        Self {
            capabilities,
            title: config.title.clone(),
            layout: config.document.clone(),
        }
    }

    pub fn capabilities(&self) -> ExportCapabilities {
        self.capabilities
    }

    pub fn formats(&self) -> Vec<ExportFormat> {
        self.capabilities.formats()
    }

    pub fn render_markdown(&self, snapshot: &SessionSnapshot) -> String {
        text::render(snapshot, &self.title)
    }

    pub fn render_pdf(&self, snapshot: &SessionSnapshot) -> Result<Vec<u8>, ExportError> {
        if !self.capabilities.document {
            return Err(ExportError::CapabilityUnavailable(ExportFormat::Pdf));
        }
        let markdown = self.render_markdown(snapshot);
        let pages = document::paginate(&markdown, &self.layout);
        document::encode(&pages, &self.layout, &self.title)
    }

    pub fn export(
        &self,
        format: ExportFormat,
        snapshot: &SessionSnapshot,
    ) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Markdown => Ok(self.render_markdown(snapshot).into_bytes()),
            ExportFormat::Pdf => self.render_pdf(snapshot),
        }
    }

    /// Render and write to `path`, or to the format's default file name in the
    /// working directory. Returns the path written.
    pub async fn save(
        &self,
        format: ExportFormat,
        snapshot: &SessionSnapshot,
        path: Option<&Path>,
    ) -> Result<PathBuf, SotinError> {
        let bytes = self.export(format, snapshot)?;
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(format.file_name()));
        tokio::fs::write(&target, &bytes).await?;
        tracing::info!(
            format = %format,
            path = %target.display(),
            bytes = bytes.len(),
            turns = snapshot.turns.len(),
            "Transcript exported"
        );
        Ok(target)
    }
}
