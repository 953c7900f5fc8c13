//! Cross-object overview aggregation.
//!
//! An overview page shows the same semantic slot for every object, so the
//! aggregated images share one destination namespace. Two objects whose
//! names normalize to the same slug would collide there; the plan claims
//! each filename once and suffixes later claimants (`-2`, `-3`, …).
//!
//! Planning is pure: it computes copies and record duplicates but touches
//! no files, so the naming rules are testable in isolation. The
//! application layer executes the copies. Source records are never
//! mutated.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::error::DomainError;
use crate::domain::record::RenderRecord;
use crate::util::text::slugify;

/// One file copy feeding an overview page: the materialized source image
/// and a record duplicate already pointing at the deduplicated destination.
#[derive(Debug)]
pub struct PlannedCopy {
    pub source: PathBuf,
    pub record: RenderRecord,
}

/// The complete copy plan for one overview page.
#[derive(Debug)]
pub struct OverviewPlan {
    name: String,
    prefix: String,
    dir: PathBuf,
    copies: Vec<PlannedCopy>,
}

impl OverviewPlan {
    /// Plan the aggregation of `records` (one semantic slot across all
    /// descriptors, in descriptor order) under `output_root`.
    ///
    /// Fails only if an input record was never materialized, which is a
    /// sequencing bug, not a data condition.
    pub fn build(
        name: &str,
        records: &[&RenderRecord],
        output_root: &Path,
    ) -> Result<Self, DomainError> {
        let prefix = slugify(name);
        let dir = output_root.join(&prefix);

        let mut claimed: HashSet<String> = HashSet::new();
        let mut copies = Vec::with_capacity(records.len());
        for record in records {
            let source = record.filename()?.to_path_buf();
            let base = format!("{prefix}-{}", slugify(record.owner()));
            let mut filename = format!("{base}.png");
            let mut suffix = 1usize;
            while claimed.contains(&filename) {
                suffix += 1;
                filename = format!("{base}-{suffix}.png");
            }
            claimed.insert(filename.clone());
            copies.push(PlannedCopy {
                source,
                record: record.copy_to(dir.join(filename)),
            });
        }

        Ok(Self {
            name: name.to_string(),
            prefix,
            dir,
            copies,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Destination folder for this overview's copies.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn copies(&self) -> &[PlannedCopy] {
        &self.copies
    }

    /// The duplicated records, for page rendering.
    pub fn records(&self) -> impl Iterator<Item = &RenderRecord> {
        self.copies.iter().map(|copy| &copy.record)
    }
}

#[cfg(test)]
mod tests {
    use super::OverviewPlan;
    use crate::domain::record::{PlaceholderImages, RenderRecord};
    use std::collections::HashSet;
    use std::path::Path;

    fn materialized(owner: &str, key: &str) -> RenderRecord {
        let mut record = RenderRecord::new(owner, key, None, None);
        record.materialize_offline(
            Path::new("/out"),
            &PlaceholderImages {
                not_found: "media/page-not-found.png".into(),
                error: "media/no-content.png".into(),
            },
        );
        record
    }

    #[test]
    fn colliding_owner_slugs_get_numeric_suffixes() {
        let first = materialized("Order", "desktop.grid.vendor");
        let second = materialized("order", "desktop.grid.vendor");
        let third = materialized("ORDER", "desktop.grid.vendor");

        let plan = OverviewPlan::build(
            "Desktop Grids",
            &[&first, &second, &third],
            Path::new("build"),
        )
        .expect("plan");

        let names: Vec<_> = plan
            .copies()
            .iter()
            .map(|copy| {
                copy.record
                    .filename()
                    .expect("dest set")
                    .file_name()
                    .expect("file name")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        assert_eq!(
            names,
            [
                "desktop-grids-order.png",
                "desktop-grids-order-2.png",
                "desktop-grids-order-3.png"
            ]
        );
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn copies_preserve_state_and_leave_sources_untouched() {
        let record = materialized("Invoice", "state-diagram");
        let original_path = record.filename().expect("materialized").to_path_buf();

        let plan =
            OverviewPlan::build("State Diagrams", &[&record], Path::new("build")).expect("plan");

        let copy = &plan.copies()[0];
        assert_eq!(copy.source, original_path);
        assert_eq!(copy.record.status(), record.status());
        assert_eq!(copy.record.title(), record.title());
        assert_eq!(
            copy.record.filename().expect("dest"),
            Path::new("build/state-diagrams/state-diagrams-invoice.png")
        );
        // the source record still points at its own file
        assert_eq!(record.filename().expect("unchanged"), original_path);
    }

    #[test]
    fn unmaterialized_input_is_a_sequencing_bug() {
        let record = RenderRecord::new("Order", "state-diagram", None, None);
        assert!(OverviewPlan::build("State Diagrams", &[&record], Path::new("build")).is_err());
    }
}
