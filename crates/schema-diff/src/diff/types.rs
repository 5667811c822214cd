//! Diff result types.
//!
//! A [`DiffResult`] fully describes how schema `A` differs from schema `B`.
//! Every bucket follows the same convention: `added` means present in `B`
//! and absent in `A`, `removed` the converse, `changed` present in both
//! with at least one observable attribute differing. Changes carry both
//! sides by value so a generator can render either direction after the
//! source models are gone.

use serde::{Deserialize, Serialize};

use crate::core::schema::{
    Check, Column, ForeignKey, Generated, Index, PrimaryKey, Routine, RoutineKind, Table, Trigger,
    View,
};

/// A from/to pair for one changed attribute. `from` is the A side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta<T> {
    pub from: T,
    pub to: T,
}

/// Structured, symmetric description of the delta between two schema models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub tables: TablesDiff,
    pub views: ViewsDiff,
    pub routines: RoutinesDiff,
    pub triggers: TriggersDiff,
}

impl DiffResult {
    /// Returns true if no bucket reports any difference.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.routines.is_empty()
            && self.triggers.is_empty()
    }

    /// Per-bucket counts for display.
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            tables: BucketCounts {
                added: self.tables.added.len(),
                removed: self.tables.removed.len(),
                changed: self.tables.changed.len(),
            },
            views: BucketCounts {
                added: self.views.added.len(),
                removed: self.views.removed.len(),
                changed: self.views.changed.len(),
            },
            routines: BucketCounts {
                added: self.routines.added.len(),
                removed: self.routines.removed.len(),
                changed: self.routines.changed.len(),
            },
            triggers: BucketCounts {
                added: self.triggers.added.len(),
                removed: self.triggers.removed.len(),
                changed: self.triggers.changed.len(),
            },
        }
    }
}

/// Table bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablesDiff {
    pub added: Vec<Table>,
    pub removed: Vec<Table>,
    pub changed: Vec<TableChange>,
}

impl TablesDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Changes within one table present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub name: String,

    pub columns_added: Vec<Column>,
    pub columns_removed: Vec<Column>,
    pub columns_changed: Vec<ColumnChange>,

    pub indexes_added: Vec<Index>,
    pub indexes_removed: Vec<Index>,
    pub indexes_changed: Vec<IndexChange>,

    pub checks_added: Vec<Check>,
    pub checks_removed: Vec<Check>,
    pub checks_changed: Vec<CheckChange>,

    pub foreign_keys_added: Vec<ForeignKey>,
    pub foreign_keys_removed: Vec<ForeignKey>,
    pub foreign_keys_changed: Vec<ForeignKeyChange>,

    pub primary_key: Option<PrimaryKeyChange>,
}

impl TableChange {
    /// Whether any nested change was recorded.
    pub fn has_changes(&self) -> bool {
        !(self.columns_added.is_empty()
            && self.columns_removed.is_empty()
            && self.columns_changed.is_empty()
            && self.indexes_added.is_empty()
            && self.indexes_removed.is_empty()
            && self.indexes_changed.is_empty()
            && self.checks_added.is_empty()
            && self.checks_removed.is_empty()
            && self.checks_changed.is_empty()
            && self.foreign_keys_added.is_empty()
            && self.foreign_keys_removed.is_empty()
            && self.foreign_keys_changed.is_empty()
            && self.primary_key.is_none())
    }
}

/// Per-attribute column change. Each differing attribute is reported
/// individually so the generator can emit one ALTER clause per attribute;
/// the full columns ride along for clauses that restate the whole
/// definition (type tokens, MariaDB MODIFY).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub name: String,

    pub from: Column,
    pub to: Column,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<Delta<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<Delta<Option<u32>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision_scale: Option<Delta<Option<(u32, u32)>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<Delta<bool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Delta<Option<String>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<Delta<Generated>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Delta<Option<String>>>,
}

impl ColumnChange {
    pub fn has_changes(&self) -> bool {
        self.data_type.is_some()
            || self.length.is_some()
            || self.precision_scale.is_some()
            || self.nullable.is_some()
            || self.default.is_some()
            || self.generated.is_some()
            || self.collation.is_some()
    }

    /// The type clause changed: data type, length, or precision/scale.
    pub fn type_changed(&self) -> bool {
        self.data_type.is_some() || self.length.is_some() || self.precision_scale.is_some()
    }
}

/// Index change, both sides by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexChange {
    pub name: String,
    pub from: Index,
    pub to: Index,
}

/// Check constraint change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckChange {
    pub name: String,
    pub from: Check,
    pub to: Check,
}

/// Foreign key change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyChange {
    pub name: String,
    pub from: ForeignKey,
    pub to: ForeignKey,
}

/// Primary key change; a side absent means that side has no primary key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyChange {
    pub from: Option<PrimaryKey>,
    pub to: Option<PrimaryKey>,
}

/// View bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewsDiff {
    pub added: Vec<View>,
    pub removed: Vec<View>,
    pub changed: Vec<ViewChange>,
}

impl ViewsDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// View definition change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewChange {
    pub name: String,
    pub from: View,
    pub to: View,
}

/// Routine bucket, keyed by `(kind, name)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutinesDiff {
    pub added: Vec<Routine>,
    pub removed: Vec<Routine>,
    pub changed: Vec<RoutineChange>,
}

impl RoutinesDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Routine change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineChange {
    pub kind: RoutineKind,
    pub name: String,
    pub from: Routine,
    pub to: Routine,
}

/// Trigger bucket, keyed by `(table, name)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggersDiff {
    pub added: Vec<Trigger>,
    pub removed: Vec<Trigger>,
    pub changed: Vec<TriggerChange>,
}

impl TriggersDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Trigger change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerChange {
    pub table: String,
    pub name: String,
    pub from: Trigger,
    pub to: Trigger,
}

/// Per-bucket counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

/// Summary of a diff result for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub tables: BucketCounts,
    pub views: BucketCounts,
    pub routines: BucketCounts,
    pub triggers: BucketCounts,
}
