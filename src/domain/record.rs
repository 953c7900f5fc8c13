//! Render records: one per design reference, tracking its export outcome.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::error::DomainError;

/// Failures the export collaborator can report for a single reference.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("design reference cannot be parsed: {0}")]
    Reference(String),
    #[error("export service error: {0}")]
    Service(String),
    #[error("exported image could not be written: {0}")]
    Io(#[from] std::io::Error),
}

/// Port to the design-export collaborator: render one reference to a PNG at
/// the given destination.
#[async_trait]
pub trait ImageExporter: Send + Sync {
    async fn export_png(&self, reference: &str, dest: &Path) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Rendered,
    NotFound,
    Error,
}

impl RenderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::NotFound => "not-found",
            Self::Error => "error",
        }
    }
}

/// Fallback images used when a record has nothing to show.
#[derive(Debug, Clone)]
pub struct PlaceholderImages {
    pub not_found: PathBuf,
    pub error: PathBuf,
}

/// The runtime unit tracking one reference's export outcome.
///
/// Created during descriptor assembly with status `Error` as the safe
/// default; materialization runs exactly once and always leaves a terminal
/// status together with a file path. The file path is unreadable before
/// materialization by construction.
#[derive(Debug, Clone)]
pub struct RenderRecord {
    key: String,
    title: Option<String>,
    owner: String,
    reference: Option<String>,
    filename: Option<PathBuf>,
    status: RenderStatus,
}

impl RenderRecord {
    pub fn new(
        owner: impl Into<String>,
        key: impl Into<String>,
        reference: Option<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title,
            owner: owner.into(),
            reference,
            filename: None,
            status: RenderStatus::Error,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Name of the owning object (back-reference by value).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Title for headers: the record's own title, or the owner's name for
    /// fixed slots that carry none.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.owner)
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn status(&self) -> RenderStatus {
        self.status
    }

    /// The materialized image path. Asking before materialization is a
    /// programming error and fails loudly.
    pub fn filename(&self) -> Result<&Path, DomainError> {
        self.filename.as_deref().ok_or_else(|| {
            DomainError::invariant(format!("filename is not set for `{}`", self.key))
        })
    }

    /// Basename the record renders to inside its descriptor's folder.
    pub fn output_basename(&self) -> String {
        format!("{}.png", self.key.replace('.', "-"))
    }

    /// Duplicate identity and resolved state, pointing at a different file.
    /// Used by overview aggregation; the original record is untouched.
    pub fn copy_to(&self, filename: PathBuf) -> Self {
        let mut copy = self.clone();
        copy.filename = Some(filename);
        copy
    }

    /// Export the bound reference to the descriptor's output folder.
    ///
    /// Single attempt, no retries. An absent reference is not a failure;
    /// an export failure downgrades this record only and never propagates,
    /// so sibling records always get their turn.
    pub async fn materialize<E>(
        &mut self,
        exporter: &E,
        output_dir: &Path,
        placeholders: &PlaceholderImages,
    ) where
        E: ImageExporter + ?Sized,
    {
        let Some(reference) = self.reference.clone() else {
            self.filename = Some(placeholders.not_found.clone());
            self.status = RenderStatus::NotFound;
            debug!(
                target: "vetrina::render",
                key = %self.key,
                "no reference bound, using not-found placeholder"
            );
            return;
        };

        let target = output_dir.join(self.output_basename());
        match exporter.export_png(&reference, &target).await {
            Ok(()) => {
                self.filename = Some(target);
                self.status = RenderStatus::Rendered;
                debug!(target: "vetrina::render", key = %self.key, "rendered");
            }
            Err(error) => {
                warn!(
                    target: "vetrina::render",
                    key = %self.key,
                    error = %error,
                    "export failed, using error placeholder"
                );
                self.filename = Some(placeholders.error.clone());
                self.status = RenderStatus::Error;
            }
        }
    }

    /// Offline variant: reuse an image already on disk instead of calling
    /// the export service. A missing file counts as not found.
    pub fn materialize_offline(&mut self, output_dir: &Path, placeholders: &PlaceholderImages) {
        let target = output_dir.join(self.output_basename());
        if self.reference.is_some() && target.is_file() {
            self.filename = Some(target);
            self.status = RenderStatus::Rendered;
        } else {
            self.filename = Some(placeholders.not_found.clone());
            self.status = RenderStatus::NotFound;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExportError, ImageExporter, PlaceholderImages, RenderRecord, RenderStatus};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct HappyExporter;

    #[async_trait]
    impl ImageExporter for HappyExporter {
        async fn export_png(&self, _reference: &str, _dest: &Path) -> Result<(), ExportError> {
            Ok(())
        }
    }

    struct BrokenExporter;

    #[async_trait]
    impl ImageExporter for BrokenExporter {
        async fn export_png(&self, reference: &str, _dest: &Path) -> Result<(), ExportError> {
            Err(ExportError::Service(format!("no image url for {reference}")))
        }
    }

    fn placeholders() -> PlaceholderImages {
        PlaceholderImages {
            not_found: PathBuf::from("media/page-not-found.png"),
            error: PathBuf::from("media/no-content.png"),
        }
    }

    fn record(reference: Option<&str>) -> RenderRecord {
        RenderRecord::new(
            "Order",
            "desktop.grid.vendor",
            reference.map(str::to_string),
            None,
        )
    }

    #[test]
    fn filename_before_materialization_fails_loudly() {
        let record = record(Some("https://example/frame"));
        assert!(record.filename().is_err());
        assert_eq!(record.status(), RenderStatus::Error);
    }

    #[tokio::test]
    async fn absent_reference_materializes_as_not_found() {
        let mut record = record(None);
        record
            .materialize(&HappyExporter, Path::new("/tmp/out"), &placeholders())
            .await;
        assert_eq!(record.status(), RenderStatus::NotFound);
        assert_eq!(
            record.filename().expect("terminal path"),
            Path::new("media/page-not-found.png")
        );
    }

    #[tokio::test]
    async fn successful_export_materializes_as_rendered() {
        let mut record = record(Some("https://example/frame"));
        record
            .materialize(&HappyExporter, Path::new("/tmp/out"), &placeholders())
            .await;
        assert_eq!(record.status(), RenderStatus::Rendered);
        assert_eq!(
            record.filename().expect("terminal path"),
            Path::new("/tmp/out/desktop-grid-vendor.png")
        );
    }

    #[tokio::test]
    async fn export_failure_downgrades_to_error_placeholder() {
        let mut record = record(Some("https://example/frame"));
        record
            .materialize(&BrokenExporter, Path::new("/tmp/out"), &placeholders())
            .await;
        assert_eq!(record.status(), RenderStatus::Error);
        assert_eq!(
            record.filename().expect("terminal path"),
            Path::new("media/no-content.png")
        );
    }

    #[test]
    fn copy_preserves_identity_and_state() {
        let mut original = record(Some("https://example/frame"));
        original.materialize_offline(Path::new("/nowhere"), &placeholders());
        let copy = original.copy_to(PathBuf::from("/overview/desktop-grids-order.png"));
        assert_eq!(copy.key(), original.key());
        assert_eq!(copy.status(), original.status());
        assert_eq!(copy.reference(), original.reference());
        assert_eq!(
            copy.filename().expect("copied path"),
            Path::new("/overview/desktop-grids-order.png")
        );
        assert_ne!(
            original.filename().expect("original path"),
            copy.filename().expect("copied path")
        );
    }

    #[test]
    fn display_title_falls_back_to_owner() {
        let untitled = record(None);
        assert_eq!(untitled.display_title(), "Order");
        let titled = RenderRecord::new(
            "Order",
            "email-notifications.vendor.order-ready",
            None,
            Some("Order Ready".to_string()),
        );
        assert_eq!(titled.display_title(), "Order Ready");
    }
}
