//! Offline schema validation: assemble every descriptor and report what it
//! binds, without touching any remote service.

use tracing::info;

use crate::application::error::AppError;
use crate::application::inventory;
use crate::config::Settings;

pub async fn run_check(settings: &Settings, only: &[String]) -> Result<(), AppError> {
    let descriptors = inventory::load_descriptors(
        &settings.sync.schemas_dir,
        &settings.output.directory,
        only,
    )
    .await?;

    for descriptor in &descriptors {
        let total = descriptor.records().count();
        let bound = descriptor
            .records()
            .filter(|record| record.reference().is_some())
            .count();
        info!(
            target: "vetrina::check",
            object = %descriptor.name(),
            page = %descriptor.page_url(),
            bound,
            absent = total - bound,
            notifications = descriptor.notification_count(),
            "schema ok"
        );
    }

    info!(
        target: "vetrina::check",
        objects = descriptors.len(),
        "all schema documents are valid"
    );
    Ok(())
}
