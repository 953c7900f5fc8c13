//! The phased synchronization pipeline.
//!
//! Phases run strictly in sequence; within a phase, per-descriptor work
//! fans out over a bounded width. Widths 1 and N produce identical results
//! because descriptors share no mutable state until overview aggregation,
//! which is why that final aggregation runs single-threaded. A failing
//! descriptor fails its own unit; units already in flight run to
//! completion and the first error surfaces once the phase drains.

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::application::error::AppError;
use crate::application::inventory;
use crate::config::{ConfluenceSettings, FigmaSettings, OverviewPageUrls, Settings};
use crate::domain::overview::OverviewPlan;
use crate::domain::record::{PlaceholderImages, RenderRecord};
use crate::domain::schema::ObjectDescriptor;
use crate::domain::slots::{FixedSlot, Platform, Role, ViewKind};
use crate::infra::confluence::ConfluenceClient;
use crate::infra::error::InfraError;
use crate::infra::figma::FigmaClient;
use crate::presentation::views;

const OBJECT_PAGE_ARTIFACT: &str = "object-page.html";
const OVERVIEW_PAGE_ARTIFACT: &str = "overview-page.html";
const SUMMARY_PAGE_ARTIFACT: &str = "summary-page.html";

/// Run the full pipeline over every schema document (optionally filtered
/// by object name).
pub async fn run_sync(settings: &Settings, only: &[String]) -> Result<(), AppError> {
    let mut descriptors = inventory::load_descriptors(
        &settings.sync.schemas_dir,
        &settings.output.directory,
        only,
    )
    .await?;

    if descriptors.is_empty() {
        info!(target: "vetrina::sync", "no matching schema documents, nothing to do");
        return Ok(());
    }

    let runner = SyncRunner::new(settings)?;

    runner.render_phase(&mut descriptors).await?;
    runner.cleanup_phase(&descriptors).await?;
    runner.upload_phase(&descriptors).await?;
    runner.update_phase(&mut descriptors).await?;
    runner.overview_phase(&descriptors).await?;
    runner.summary_phase(&descriptors).await?;

    info!(
        target: "vetrina::sync",
        objects = descriptors.len(),
        "synchronization complete"
    );
    Ok(())
}

enum RenderMode {
    Online(FigmaClient),
    Offline,
}

struct SyncRunner<'a> {
    settings: &'a Settings,
    confluence: ConfluenceClient,
    render_mode: RenderMode,
    placeholders: PlaceholderImages,
    summary_page_url: String,
    overviews: Vec<OverviewTarget>,
}

impl<'a> SyncRunner<'a> {
    /// Validate the remote configuration up front so an incomplete setup
    /// aborts before any phase touches the network.
    fn new(settings: &'a Settings) -> Result<Self, AppError> {
        let confluence = build_confluence_client(&settings.confluence)?;
        let render_mode = if settings.sync.offline {
            RenderMode::Offline
        } else {
            RenderMode::Online(build_figma_client(&settings.figma)?)
        };
        let summary_page_url = settings
            .confluence
            .summary_page_url
            .clone()
            .ok_or_else(|| {
                InfraError::configuration("`confluence.summary_page_url` is not configured")
            })?;
        let overviews = overview_targets(&settings.confluence.overviews)?;

        Ok(Self {
            settings,
            confluence,
            render_mode,
            placeholders: PlaceholderImages {
                not_found: settings.output.not_found_image.clone(),
                error: settings.output.error_image.clone(),
            },
            summary_page_url,
            overviews,
        })
    }

    fn width(&self) -> usize {
        self.settings.sync.concurrency
    }

    async fn render_phase(&self, descriptors: &mut [ObjectDescriptor]) -> Result<(), AppError> {
        info!(
            target: "vetrina::sync",
            phase = "render",
            objects = descriptors.len(),
            width = self.width(),
            offline = matches!(self.render_mode, RenderMode::Offline),
            "phase started"
        );

        let exporter = match &self.render_mode {
            RenderMode::Online(client) => client,
            RenderMode::Offline => {
                for descriptor in descriptors.iter_mut() {
                    tokio::fs::create_dir_all(descriptor.output_dir())
                        .await
                        .map_err(InfraError::Io)?;
                    descriptor.materialize_all_offline(&self.placeholders);
                }
                return Ok(());
            }
        };

        let results: Vec<Result<(), AppError>> = stream::iter(descriptors.iter_mut())
            .map(|descriptor| async move {
                tokio::fs::create_dir_all(descriptor.output_dir())
                    .await
                    .map_err(InfraError::Io)?;
                descriptor
                    .materialize_all(exporter, &self.placeholders)
                    .await;
                Ok(())
            })
            .buffer_unordered(self.width())
            .collect()
            .await;
        drain(results)
    }

    async fn cleanup_phase(&self, descriptors: &[ObjectDescriptor]) -> Result<(), AppError> {
        if self.settings.sync.skip_attachment_cleanup {
            info!(target: "vetrina::sync", phase = "cleanup", "phase skipped");
            return Ok(());
        }
        info!(
            target: "vetrina::sync",
            phase = "cleanup",
            objects = descriptors.len(),
            "phase started"
        );

        let results: Vec<Result<(), AppError>> = stream::iter(descriptors.iter())
            .map(|descriptor| async move {
                self.confluence
                    .remove_all_attachments(descriptor.page_url())
                    .await
                    .map_err(AppError::from)
            })
            .buffer_unordered(self.width())
            .collect()
            .await;
        drain(results)
    }

    async fn upload_phase(&self, descriptors: &[ObjectDescriptor]) -> Result<(), AppError> {
        if self.settings.sync.skip_upload {
            info!(target: "vetrina::sync", phase = "upload", "phase skipped");
            return Ok(());
        }
        info!(
            target: "vetrina::sync",
            phase = "upload",
            objects = descriptors.len(),
            "phase started"
        );

        let results: Vec<Result<(), AppError>> = stream::iter(descriptors.iter())
            .map(|descriptor| async move {
                let files = descriptor.unique_filenames()?;
                info!(
                    target: "vetrina::sync",
                    object = %descriptor.name(),
                    count = files.len(),
                    "uploading attachments"
                );
                for file in &files {
                    self.confluence
                        .upload_attachment(descriptor.page_url(), file)
                        .await?;
                }
                Ok(())
            })
            .buffer_unordered(self.width())
            .collect()
            .await;
        drain(results)
    }

    async fn update_phase(&self, descriptors: &mut [ObjectDescriptor]) -> Result<(), AppError> {
        info!(
            target: "vetrina::sync",
            phase = "page-update",
            objects = descriptors.len(),
            skipped = self.settings.sync.skip_page_update,
            "phase started"
        );
        let skip_update = self.settings.sync.skip_page_update;

        let results: Vec<Result<(), AppError>> = stream::iter(descriptors.iter_mut())
            .map(|descriptor| async move {
                let body = views::build_object_page(descriptor)?;
                let artifact = descriptor.output_dir().join(OBJECT_PAGE_ARTIFACT);
                tokio::fs::write(&artifact, &body)
                    .await
                    .map_err(InfraError::Io)?;

                // the summary links pages by title, so the title is
                // fetched even when the body write is skipped
                let title = if skip_update {
                    self.confluence.page_title(descriptor.page_url()).await?
                } else {
                    self.confluence
                        .update_page_body(descriptor.page_url(), &body)
                        .await?
                        .title
                };
                descriptor.set_page_title(title);
                Ok(())
            })
            .buffer_unordered(self.width())
            .collect()
            .await;
        drain(results)
    }

    /// Overview aggregation shares one destination namespace per page and
    /// therefore runs strictly sequentially, after all per-object phases.
    async fn overview_phase(&self, descriptors: &[ObjectDescriptor]) -> Result<(), AppError> {
        info!(
            target: "vetrina::sync",
            phase = "overviews",
            pages = self.overviews.len(),
            "phase started"
        );

        for page in &self.overviews {
            let records = select_records(page.select, descriptors);
            info!(
                target: "vetrina::sync",
                overview = page.name,
                records = records.len(),
                "publishing overview"
            );

            let plan =
                OverviewPlan::build(page.name, &records, &self.settings.output.directory)?;
            tokio::fs::create_dir_all(plan.dir())
                .await
                .map_err(InfraError::Io)?;
            for copy in plan.copies() {
                tokio::fs::copy(&copy.source, copy.record.filename()?)
                    .await
                    .map_err(InfraError::Io)?;
            }

            let overview_records: Vec<&RenderRecord> = plan.records().collect();
            let body = views::build_overview_page(page.name, &overview_records)?;
            tokio::fs::write(plan.dir().join(OVERVIEW_PAGE_ARTIFACT), &body)
                .await
                .map_err(InfraError::Io)?;

            if !self.settings.sync.skip_attachment_cleanup {
                self.confluence.remove_all_attachments(&page.url).await?;
            }
            if !self.settings.sync.skip_upload {
                for copy in plan.copies() {
                    self.confluence
                        .upload_attachment(&page.url, copy.record.filename()?)
                        .await?;
                }
            }
            if !self.settings.sync.skip_page_update {
                self.confluence.update_page_body(&page.url, &body).await?;
            }
        }
        Ok(())
    }

    async fn summary_phase(&self, descriptors: &[ObjectDescriptor]) -> Result<(), AppError> {
        info!(target: "vetrina::sync", phase = "summary", "phase started");

        let body = views::build_summary_page(descriptors)?;
        let artifact = self.settings.output.directory.join(SUMMARY_PAGE_ARTIFACT);
        tokio::fs::write(&artifact, &body)
            .await
            .map_err(InfraError::Io)?;

        if !self.settings.sync.skip_page_update {
            self.confluence
                .update_page_body(&self.summary_page_url, &body)
                .await?;
        }
        Ok(())
    }
}

fn build_confluence_client(settings: &ConfluenceSettings) -> Result<ConfluenceClient, AppError> {
    let base_url = settings
        .base_url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("`confluence.base_url` is not configured"))?;
    let username = settings
        .username
        .clone()
        .ok_or_else(|| InfraError::configuration("`confluence.username` is not configured"))?;
    let token = settings
        .token
        .clone()
        .ok_or_else(|| InfraError::configuration("`confluence.token` is not configured"))?;
    Ok(ConfluenceClient::new(base_url, username, token)?)
}

fn build_figma_client(settings: &FigmaSettings) -> Result<FigmaClient, AppError> {
    let token = settings
        .token
        .clone()
        .ok_or_else(|| InfraError::configuration("`figma.token` is not configured"))?;
    Ok(FigmaClient::new(
        &settings.api_base_url,
        token,
        settings.image_scale,
    )?)
}

#[derive(Debug, Clone, Copy)]
enum OverviewSelect {
    StateDiagram,
    View(Platform, ViewKind),
    Notifications,
}

struct OverviewTarget {
    name: &'static str,
    url: String,
    select: OverviewSelect,
}

fn overview_targets(urls: &OverviewPageUrls) -> Result<Vec<OverviewTarget>, InfraError> {
    fn required(url: Option<&String>, key: &str) -> Result<String, InfraError> {
        url.cloned().ok_or_else(|| {
            InfraError::configuration(format!("`confluence.overviews.{key}` is not configured"))
        })
    }

    Ok(vec![
        OverviewTarget {
            name: "State Diagrams",
            url: required(urls.state_diagrams.as_ref(), "state_diagrams")?,
            select: OverviewSelect::StateDiagram,
        },
        OverviewTarget {
            name: "Desktop Grids",
            url: required(urls.desktop_grids.as_ref(), "desktop_grids")?,
            select: OverviewSelect::View(Platform::Desktop, ViewKind::Grid),
        },
        OverviewTarget {
            name: "Desktop Details",
            url: required(urls.desktop_details.as_ref(), "desktop_details")?,
            select: OverviewSelect::View(Platform::Desktop, ViewKind::Details),
        },
        OverviewTarget {
            name: "Desktop Infocard",
            url: required(urls.desktop_infocards.as_ref(), "desktop_infocards")?,
            select: OverviewSelect::View(Platform::Desktop, ViewKind::Infocard),
        },
        OverviewTarget {
            name: "Mobile List",
            url: required(urls.mobile_list.as_ref(), "mobile_list")?,
            select: OverviewSelect::View(Platform::Mobile, ViewKind::List),
        },
        OverviewTarget {
            name: "Mobile Details",
            url: required(urls.mobile_details.as_ref(), "mobile_details")?,
            select: OverviewSelect::View(Platform::Mobile, ViewKind::Details),
        },
        OverviewTarget {
            name: "Email Notifications",
            url: required(urls.email_notifications.as_ref(), "email_notifications")?,
            select: OverviewSelect::Notifications,
        },
        OverviewTarget {
            name: "Spotlight",
            url: required(urls.desktop_spotlight.as_ref(), "desktop_spotlight")?,
            select: OverviewSelect::View(Platform::Desktop, ViewKind::Spotlight),
        },
    ])
}

fn select_records(
    select: OverviewSelect,
    descriptors: &[ObjectDescriptor],
) -> Vec<&RenderRecord> {
    match select {
        OverviewSelect::StateDiagram => descriptors
            .iter()
            .map(ObjectDescriptor::state_diagram)
            .collect(),
        OverviewSelect::View(platform, view) => descriptors
            .iter()
            .flat_map(|descriptor| {
                Role::ALL
                    .into_iter()
                    .map(move |role| descriptor.fixed(FixedSlot::new(platform, view, role)))
            })
            .collect(),
        OverviewSelect::Notifications => descriptors
            .iter()
            .flat_map(|descriptor| {
                Role::ALL
                    .into_iter()
                    .flat_map(move |role| descriptor.notifications(role))
            })
            .collect(),
    }
}

/// Surface the first failure once every unit of the phase has finished.
fn drain(results: Vec<Result<(), AppError>>) -> Result<(), AppError> {
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{OverviewSelect, overview_targets, select_records};
    use crate::config::OverviewPageUrls;
    use crate::domain::schema::ObjectDescriptor;
    use serde_json::json;
    use std::path::Path;

    fn descriptor(name: &str) -> ObjectDescriptor {
        let document = json!({
            "name": name,
            "confluence-page": "https://wiki.example/pages/1/x",
            "email-notifications": {
                "vendor": {"A": "https://figma.example/design/k?node-id=1-1"},
                "client": {"B": "https://figma.example/design/k?node-id=1-2"}
            }
        });
        ObjectDescriptor::from_document(&document, Path::new("build")).expect("valid")
    }

    #[test]
    fn selectors_draw_the_same_slot_from_every_descriptor() {
        let descriptors = vec![descriptor("order"), descriptor("invoice")];

        let diagrams = select_records(OverviewSelect::StateDiagram, &descriptors);
        assert_eq!(diagrams.len(), 2);
        assert!(diagrams.iter().all(|record| record.key() == "state-diagram"));

        let grids = select_records(
            OverviewSelect::View(
                crate::domain::slots::Platform::Desktop,
                crate::domain::slots::ViewKind::Grid,
            ),
            &descriptors,
        );
        assert_eq!(grids.len(), 6);
        assert_eq!(grids[0].owner(), "Order");
        assert_eq!(grids[3].owner(), "Invoice");

        let notifications = select_records(OverviewSelect::Notifications, &descriptors);
        assert_eq!(notifications.len(), 4);
    }

    #[test]
    fn every_overview_page_url_is_required() {
        let mut urls = OverviewPageUrls::default();
        assert!(overview_targets(&urls).is_err());

        urls.state_diagrams = Some("https://wiki.example/pages/10/a".into());
        urls.desktop_grids = Some("https://wiki.example/pages/11/b".into());
        urls.desktop_details = Some("https://wiki.example/pages/12/c".into());
        urls.desktop_infocards = Some("https://wiki.example/pages/13/d".into());
        urls.desktop_spotlight = Some("https://wiki.example/pages/14/e".into());
        urls.mobile_list = Some("https://wiki.example/pages/15/f".into());
        urls.mobile_details = Some("https://wiki.example/pages/16/g".into());
        urls.email_notifications = Some("https://wiki.example/pages/17/h".into());

        let targets = overview_targets(&urls).expect("complete");
        assert_eq!(targets.len(), 8);
        assert_eq!(targets[0].name, "State Diagrams");
        assert_eq!(targets[7].name, "Spotlight");
    }
}
