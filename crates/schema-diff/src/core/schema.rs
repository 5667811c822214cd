//! Dialect-neutral schema metadata types.
//!
//! These types represent one introspected database schema. A model is
//! produced by a catalog loader, normalized, diffed against another model,
//! and then discarded; nothing downstream mutates it in place.

use serde::{Deserialize, Serialize};

/// One database schema: tables, views, routines, triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Base tables.
    pub tables: Vec<Table>,

    /// Views.
    pub views: Vec<View>,

    /// Functions and procedures.
    pub routines: Vec<Routine>,

    /// Triggers.
    pub triggers: Vec<Trigger>,
}

impl SchemaModel {
    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Table metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in catalog ordinal order.
    pub columns: Vec<Column>,

    /// Primary key, if any.
    pub primary_key: Option<PrimaryKey>,

    /// Non-primary-key indexes.
    pub indexes: Vec<Index>,

    /// Check constraints.
    pub checks: Vec<Check>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key.is_some()
    }
}

/// How a column value is generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generated {
    /// PostgreSQL identity column (`GENERATED ... AS IDENTITY`).
    Identity,
    /// PostgreSQL column owning a sequence (serial).
    Sequence,
    /// MariaDB `AUTO_INCREMENT` column.
    AutoIncrement,
    /// Plain column.
    #[default]
    None,
}

/// Column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type token as reported by the catalog (e.g. "varchar",
    /// "timestamp without time zone").
    pub data_type: String,

    /// Maximum length for string/binary types.
    pub length: Option<u32>,

    /// Numeric precision and scale.
    pub precision_scale: Option<(u32, u32)>,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Default expression, absent when the column has none.
    pub default: Option<String>,

    /// Generation kind.
    pub generated: Generated,

    /// Collation name.
    pub collation: Option<String>,
}

/// Primary key metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name, when the catalog reports a meaningful one.
    pub name: Option<String>,

    /// Column names in key order.
    pub columns: Vec<String>,
}

/// Index metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Whether the index is unique.
    pub unique: bool,

    /// Indexed column names in index order.
    pub columns: Vec<String>,

    /// Access method (`USING ...`), when the catalog exposes one.
    pub using: Option<String>,
}

/// Check constraint metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Constraint name.
    pub name: String,

    /// Constraint expression, without the `CHECK (...)` wrapper.
    pub expression: String,
}

/// Foreign key metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Local column names in ordinal order.
    pub columns: Vec<String>,

    /// Referenced table name.
    pub referenced_table: String,

    /// Referenced column names in ordinal order.
    pub referenced_columns: Vec<String>,

    /// ON UPDATE action.
    pub on_update: Option<String>,

    /// ON DELETE action.
    pub on_delete: Option<String>,
}

/// View metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// View name.
    pub name: String,

    /// View definition (the SELECT body).
    pub definition: String,
}

/// Routine kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Function,
    Procedure,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Function => "function",
            RoutineKind::Procedure => "procedure",
        }
    }
}

/// Routine metadata. Keyed by `(kind, name)`: a function and a procedure of
/// the same name are distinct objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    /// Function or procedure.
    pub kind: RoutineKind,

    /// Routine name.
    pub name: String,

    /// Implementation language.
    pub language: String,

    /// Routine body.
    pub body: String,
}

/// Trigger timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerTiming {
    Before,
    After,
}

/// Trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

/// Trigger metadata, keyed by `(table, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Table the trigger is attached to.
    pub table: String,

    /// Trigger name.
    pub name: String,

    /// Before or after.
    pub timing: TriggerTiming,

    /// Firing events, deduplicated.
    pub events: Vec<TriggerEvent>,

    /// Trigger body (action statement).
    pub body: String,
}
