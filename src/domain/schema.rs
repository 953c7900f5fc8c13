//! Object descriptors: the per-object collection of render records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::domain::error::DomainError;
use crate::domain::path::SlotPath;
use crate::domain::record::{ImageExporter, PlaceholderImages, RenderRecord};
use crate::domain::slots::{FixedSlot, Platform, Role, STATE_DIAGRAM_KEY};
use crate::util::text::title_case;

const NOTIFICATIONS_KEY: &str = "email-notifications";

fn role_index(role: Role) -> usize {
    match role {
        Role::Vendor => 0,
        Role::Operations => 1,
        Role::Client => 2,
    }
}

/// One tracked object: its identity, its Confluence page, and every render
/// record resolved from its schema document.
///
/// Built in one pass and read-only afterwards, except for the page title
/// learned from the wiki during the update phase.
#[derive(Debug)]
pub struct ObjectDescriptor {
    name: String,
    page_url: String,
    page_title: Option<String>,
    output_dir: PathBuf,
    records: Vec<RenderRecord>,
    state_diagram: usize,
    fixed: [usize; FixedSlot::COUNT],
    notifications: [Vec<usize>; 3],
}

impl ObjectDescriptor {
    /// Assemble a descriptor from a raw schema document.
    ///
    /// Construction order is deterministic: state diagram, desktop slots,
    /// notification collections (vendor, operations, client), mobile
    /// slots. Registering the same unique key twice is a fatal
    /// configuration error, as is a missing `name` or `confluence-page`.
    pub fn from_document(document: &Value, output_root: &Path) -> Result<Self, DomainError> {
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::missing_key("name"))?;
        let name = title_case(name);

        let page_url = document
            .get("confluence-page")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::missing_key("confluence-page"))?
            .to_string();

        let mut builder = RecordSet {
            object: &name,
            document,
            records: Vec::new(),
            seen: HashSet::new(),
        };

        let state_diagram = builder.bind_value(STATE_DIAGRAM_KEY)?;

        let mut fixed = [0usize; FixedSlot::COUNT];
        for slot in FixedSlot::all().filter(|slot| slot.platform == Platform::Desktop) {
            fixed[slot.ordinal()] = builder.bind_value(&slot.key())?;
        }

        let mut notifications: [Vec<usize>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for role in Role::ALL {
            notifications[role_index(role)] =
                builder.bind_table(&format!("{NOTIFICATIONS_KEY}.{}", role.as_str()))?;
        }

        for slot in FixedSlot::all().filter(|slot| slot.platform == Platform::Mobile) {
            fixed[slot.ordinal()] = builder.bind_value(&slot.key())?;
        }

        let output_dir = output_root.join(&name);
        let records = builder.records;

        Ok(Self {
            name,
            page_url,
            page_title: None,
            output_dir,
            records,
            state_diagram,
            fixed,
            notifications,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Title of the Confluence page, once learned from the wiki.
    pub fn page_title(&self) -> Option<&str> {
        self.page_title.as_deref()
    }

    pub fn set_page_title(&mut self, title: impl Into<String>) {
        self.page_title = Some(title.into());
    }

    /// Folder this object's renders land in.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn state_diagram(&self) -> &RenderRecord {
        &self.records[self.state_diagram]
    }

    pub fn fixed(&self, slot: FixedSlot) -> &RenderRecord {
        &self.records[self.fixed[slot.ordinal()]]
    }

    pub fn notifications(&self, role: Role) -> impl Iterator<Item = &RenderRecord> {
        self.notifications[role_index(role)]
            .iter()
            .map(|index| &self.records[*index])
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.iter().map(Vec::len).sum()
    }

    /// Every record in construction order.
    pub fn records(&self) -> impl Iterator<Item = &RenderRecord> {
        self.records.iter()
    }

    /// Materialized file paths with duplicates removed, in first-seen
    /// order. Placeholder images shared by several records appear once.
    pub fn unique_filenames(&self) -> Result<Vec<PathBuf>, DomainError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for record in &self.records {
            let filename = record.filename()?;
            if seen.insert(filename.to_path_buf()) {
                unique.push(filename.to_path_buf());
            }
        }
        Ok(unique)
    }

    /// Materialize every record against the export collaborator, in
    /// construction order. Per-record failures never escape.
    pub async fn materialize_all<E>(&mut self, exporter: &E, placeholders: &PlaceholderImages)
    where
        E: ImageExporter + ?Sized,
    {
        debug!(
            target: "vetrina::render",
            object = %self.name,
            records = self.records.len(),
            "materializing records"
        );
        for record in &mut self.records {
            record.materialize(exporter, &self.output_dir, placeholders).await;
        }
    }

    /// Offline materialization: reuse whatever is already on disk.
    pub fn materialize_all_offline(&mut self, placeholders: &PlaceholderImages) {
        for record in &mut self.records {
            record.materialize_offline(&self.output_dir, placeholders);
        }
    }
}

struct RecordSet<'a> {
    object: &'a str,
    document: &'a Value,
    records: Vec<RenderRecord>,
    seen: HashSet<String>,
}

impl RecordSet<'_> {
    fn register(&mut self, record: RenderRecord) -> Result<usize, DomainError> {
        if !self.seen.insert(record.key().to_string()) {
            return Err(DomainError::duplicate_key(record.key()));
        }
        debug!(
            target: "vetrina::schema",
            object = %self.object,
            key = %record.key(),
            reference = record.reference().unwrap_or("<absent>"),
            "bound schema record"
        );
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    fn bind_value(&mut self, key: &str) -> Result<usize, DomainError> {
        let path = SlotPath::parse(key)?;
        let reference = path.resolve_reference(self.document);
        self.register(RenderRecord::new(self.object, path.key(), reference, None))
    }

    fn bind_table(&mut self, key: &str) -> Result<Vec<usize>, DomainError> {
        let path = SlotPath::parse(key)?;
        let mut indexes = Vec::new();
        for (entry_name, reference) in path.resolve_table(self.document) {
            let record = RenderRecord::new(
                self.object,
                path.child(entry_name).key(),
                reference,
                Some(entry_name.to_string()),
            );
            indexes.push(self.register(record)?);
        }
        Ok(indexes)
    }
}
