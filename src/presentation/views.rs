//! Page-body builders: Confluence storage-format markup from descriptors.
//!
//! Every body is produced by a compile-time checked template; a slot that
//! is never filled simply cannot exist, and runtime failures surface as a
//! `Result` instead of leftover `{{placeholder}}` markers.

use askama::Template;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::domain::error::DomainError;
use crate::domain::record::{RenderRecord, RenderStatus};
use crate::domain::schema::ObjectDescriptor;
use crate::domain::slots::{FixedSlot, Platform, Role, ViewKind};

const WHITE: &str = "#ffffff";
const LIGHT_BLUE: &str = "#eaf4ff";
const LIGHT_RED: &str = "#fff4f0";
const LIGHT_GREEN: &str = "#edfff7";

const NOT_DEFINED: &str = "<p>Not defined</p>";
const NO_SETTINGS: &str = "<p>No settings views specified</p>";

const MULTITABLE_COLUMNS: usize = 5;

static TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day], [year] at [hour]:[minute]:[second] UTC");

#[derive(Debug, Error)]
pub enum PageBuildError {
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

fn role_colour(role: Role) -> &'static str {
    match role {
        Role::Vendor => LIGHT_BLUE,
        Role::Operations => LIGHT_RED,
        Role::Client => LIGHT_GREEN,
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Vendor => "Vendor",
        Role::Operations => "Operations",
        Role::Client => "Client",
    }
}

fn basename(record: &RenderRecord) -> Result<String, DomainError> {
    Ok(record
        .filename()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default())
}

pub struct RoleColumnView {
    pub colour: &'static str,
    pub role: &'static str,
    pub filename: String,
    pub link: String,
    pub has_link: bool,
}

#[derive(Template)]
#[template(path = "roles_table.html")]
struct RolesTableTemplate {
    columns: Vec<RoleColumnView>,
}

#[derive(Template)]
#[template(path = "single_table.html")]
struct SingleTableTemplate {
    colour: &'static str,
    filename: String,
    link: String,
    has_link: bool,
}

pub struct MultiCellView {
    pub present: bool,
    pub title: String,
    pub link: String,
    pub has_link: bool,
    pub filename: String,
}

impl MultiCellView {
    fn padding() -> Self {
        Self {
            present: false,
            title: String::new(),
            link: String::new(),
            has_link: false,
            filename: String::new(),
        }
    }
}

pub struct MultiRowView {
    pub cells: Vec<MultiCellView>,
}

#[derive(Template)]
#[template(path = "multitable.html")]
struct MultiTableTemplate {
    rows: Vec<MultiRowView>,
}

#[derive(Template)]
#[template(path = "object_page.html")]
struct ObjectPageTemplate {
    state_diagram: String,
    desktop_grid: String,
    desktop_details: String,
    desktop_infocard: String,
    desktop_spotlight: String,
    desktop_settings: String,
    mobile_list: String,
    mobile_details: String,
    notifications_vendor: String,
    notifications_operations: String,
    notifications_client: String,
}

#[derive(Template)]
#[template(path = "overview_page.html")]
struct OverviewPageTemplate {
    name: String,
    table: String,
}

pub struct SummaryCellView {
    pub rendered: bool,
    pub not_found: bool,
    pub link: String,
}

pub struct SummaryRowView {
    pub number: usize,
    pub object_name: String,
    pub page_title: String,
    pub cells: Vec<SummaryCellView>,
    pub notification_count: usize,
    pub spotlight: Vec<SummaryCellView>,
}

#[derive(Template)]
#[template(path = "summary_page.html")]
struct SummaryPageTemplate {
    generated_at: String,
    rows: Vec<SummaryRowView>,
}

fn single_table(record: &RenderRecord) -> Result<String, PageBuildError> {
    let template = SingleTableTemplate {
        colour: WHITE,
        filename: basename(record)?,
        link: record.reference().unwrap_or_default().to_string(),
        has_link: record.reference().is_some(),
    };
    Ok(template.render()?)
}

fn roles_table(
    descriptor: &ObjectDescriptor,
    platform: Platform,
    view: ViewKind,
) -> Result<String, PageBuildError> {
    let mut columns = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        let record = descriptor.fixed(FixedSlot::new(platform, view, role));
        columns.push(RoleColumnView {
            colour: role_colour(role),
            role: role_label(role),
            filename: basename(record)?,
            link: record.reference().unwrap_or_default().to_string(),
            has_link: record.reference().is_some(),
        });
    }
    Ok(RolesTableTemplate { columns }.render()?)
}

/// Render a batch of records as header/image column pairs, five per row.
/// An empty batch renders as a "Not defined" paragraph.
fn multitable(records: &[&RenderRecord]) -> Result<String, PageBuildError> {
    if records.is_empty() {
        return Ok(NOT_DEFINED.to_string());
    }

    let mut rows = Vec::new();
    for chunk in records.chunks(MULTITABLE_COLUMNS) {
        let mut cells = Vec::with_capacity(MULTITABLE_COLUMNS);
        for record in chunk {
            cells.push(MultiCellView {
                present: true,
                title: record.display_title().to_string(),
                link: record.reference().unwrap_or_default().to_string(),
                has_link: record.reference().is_some(),
                filename: basename(record)?,
            });
        }
        while cells.len() < MULTITABLE_COLUMNS {
            cells.push(MultiCellView::padding());
        }
        rows.push(MultiRowView { cells });
    }

    Ok(MultiTableTemplate { rows }.render()?)
}

/// Build the full storage-format body for one object's page.
pub fn build_object_page(descriptor: &ObjectDescriptor) -> Result<String, PageBuildError> {
    let settings_present = Role::ALL.iter().any(|role| {
        descriptor
            .fixed(FixedSlot::new(Platform::Desktop, ViewKind::Settings, *role))
            .reference()
            .is_some()
    });
    let desktop_settings = if settings_present {
        roles_table(descriptor, Platform::Desktop, ViewKind::Settings)?
    } else {
        NO_SETTINGS.to_string()
    };

    let notifications = |role: Role| -> Result<String, PageBuildError> {
        let records: Vec<&RenderRecord> = descriptor.notifications(role).collect();
        multitable(&records)
    };

    let template = ObjectPageTemplate {
        state_diagram: single_table(descriptor.state_diagram())?,
        desktop_grid: roles_table(descriptor, Platform::Desktop, ViewKind::Grid)?,
        desktop_details: roles_table(descriptor, Platform::Desktop, ViewKind::Details)?,
        desktop_infocard: roles_table(descriptor, Platform::Desktop, ViewKind::Infocard)?,
        desktop_spotlight: roles_table(descriptor, Platform::Desktop, ViewKind::Spotlight)?,
        desktop_settings,
        mobile_list: roles_table(descriptor, Platform::Mobile, ViewKind::List)?,
        mobile_details: roles_table(descriptor, Platform::Mobile, ViewKind::Details)?,
        notifications_vendor: notifications(Role::Vendor)?,
        notifications_operations: notifications(Role::Operations)?,
        notifications_client: notifications(Role::Client)?,
    };
    Ok(template.render()?)
}

/// Build the body for one cross-object overview page.
pub fn build_overview_page(
    name: &str,
    records: &[&RenderRecord],
) -> Result<String, PageBuildError> {
    let template = OverviewPageTemplate {
        name: name.to_string(),
        table: multitable(records)?,
    };
    Ok(template.render()?)
}

fn summary_cell(record: &RenderRecord) -> SummaryCellView {
    SummaryCellView {
        rendered: record.status() == RenderStatus::Rendered,
        not_found: record.status() == RenderStatus::NotFound,
        link: record.reference().unwrap_or_default().to_string(),
    }
}

/// Slots shown in the summary's main status columns, in column order.
fn summary_slots() -> impl Iterator<Item = FixedSlot> {
    let views = [
        (Platform::Desktop, ViewKind::Grid),
        (Platform::Desktop, ViewKind::Details),
        (Platform::Desktop, ViewKind::Infocard),
        (Platform::Mobile, ViewKind::List),
        (Platform::Mobile, ViewKind::Details),
    ];
    views.into_iter().flat_map(|(platform, view)| {
        Role::ALL
            .into_iter()
            .map(move |role| FixedSlot::new(platform, view, role))
    })
}

/// Build the cross-object summary page, rows sorted case-insensitively by
/// object name.
pub fn build_summary_page(descriptors: &[ObjectDescriptor]) -> Result<String, PageBuildError> {
    let mut sorted: Vec<&ObjectDescriptor> = descriptors.iter().collect();
    sorted.sort_by_key(|descriptor| descriptor.name().to_lowercase());

    let mut rows = Vec::with_capacity(sorted.len());
    for (index, descriptor) in sorted.iter().enumerate() {
        let mut cells = vec![summary_cell(descriptor.state_diagram())];
        cells.extend(summary_slots().map(|slot| summary_cell(descriptor.fixed(slot))));

        let spotlight = Role::ALL
            .into_iter()
            .map(|role| {
                summary_cell(descriptor.fixed(FixedSlot::new(
                    Platform::Desktop,
                    ViewKind::Spotlight,
                    role,
                )))
            })
            .collect();

        rows.push(SummaryRowView {
            number: index + 1,
            object_name: descriptor.name().to_string(),
            page_title: descriptor
                .page_title()
                .unwrap_or_else(|| descriptor.name())
                .to_string(),
            cells,
            notification_count: descriptor.notification_count(),
            spotlight,
        });
    }

    let generated_at = OffsetDateTime::now_utc().format(TIMESTAMP_FORMAT)?;
    let template = SummaryPageTemplate { generated_at, rows };
    Ok(template.render()?)
}
