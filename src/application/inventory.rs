//! Schema inventory: discover object documents and assemble descriptors.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::application::error::AppError;
use crate::domain::schema::ObjectDescriptor;
use crate::infra::error::InfraError;

/// List `<dir>/*.json`, sorted case-insensitively by file name.
pub fn discover_schema_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = std::fs::read_dir(dir).map_err(|err| {
        InfraError::configuration(format!(
            "schemas directory `{}` is not readable: {err}",
            dir.display()
        ))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort_by_key(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

/// Read and assemble every schema document, applying the optional
/// case-insensitive `only` name filter. Malformed documents are fatal.
pub async fn load_descriptors(
    schemas_dir: &Path,
    output_root: &Path,
    only: &[String],
) -> Result<Vec<ObjectDescriptor>, AppError> {
    let files = discover_schema_files(schemas_dir)?;
    info!(
        target: "vetrina::inventory",
        dir = %schemas_dir.display(),
        count = files.len(),
        "discovered schema files"
    );

    let mut descriptors = Vec::with_capacity(files.len());
    for file in files {
        debug!(target: "vetrina::inventory", file = %file.display(), "reading schema");
        let contents = tokio::fs::read_to_string(&file)
            .await
            .map_err(InfraError::Io)?;
        let document: Value = serde_json::from_str(&contents).map_err(|err| {
            AppError::validation(format!("schema `{}` is not valid JSON: {err}", file.display()))
        })?;
        let descriptor = ObjectDescriptor::from_document(&document, output_root).map_err(|err| {
            AppError::validation(format!("schema `{}`: {err}", file.display()))
        })?;

        if !only.is_empty()
            && !only
                .iter()
                .any(|name| name.eq_ignore_ascii_case(descriptor.name()))
        {
            debug!(
                target: "vetrina::inventory",
                object = %descriptor.name(),
                "filtered out by --only"
            );
            continue;
        }

        info!(
            target: "vetrina::inventory",
            object = %descriptor.name(),
            records = descriptor.records().count(),
            notifications = descriptor.notification_count(),
            "assembled descriptor"
        );
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}
