//! Schema model diffing.
//!
//! Pure comparison of two normalized models. Equality is field-specific by
//! design: case folding, absent-vs-null defaults, and set-vs-list column
//! comparisons all need rules a generic deep equality cannot express.

mod types;

pub use types::{
    BucketCounts, CheckChange, ColumnChange, Delta, DiffResult, DiffSummary, ForeignKeyChange,
    IndexChange, PrimaryKeyChange, RoutineChange, RoutinesDiff, TableChange, TablesDiff,
    TriggerChange, TriggersDiff, ViewChange, ViewsDiff,
};

use std::collections::BTreeMap;

use crate::core::schema::{
    Check, Column, ForeignKey, Index, PrimaryKey, SchemaModel, Table,
};
use crate::normalize::collapse_whitespace;

/// Compute the structured diff between two normalized models. `added` means
/// present in `b` only, `removed` present in `a` only. Output lists are
/// sorted by key, so equivalent inputs always yield identical results.
pub fn compute_diff(a: &SchemaModel, b: &SchemaModel) -> DiffResult {
    DiffResult {
        tables: diff_tables(a, b),
        views: diff_views(a, b),
        routines: diff_routines(a, b),
        triggers: diff_triggers(a, b),
    }
}

fn diff_tables(a: &SchemaModel, b: &SchemaModel) -> TablesDiff {
    let a_by_name: BTreeMap<&str, &Table> =
        a.tables.iter().map(|t| (t.name.as_str(), t)).collect();
    let b_by_name: BTreeMap<&str, &Table> =
        b.tables.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut diff = TablesDiff::default();

    for (name, table) in &b_by_name {
        if !a_by_name.contains_key(name) {
            diff.added.push((*table).clone());
        }
    }
    for (name, table) in &a_by_name {
        match b_by_name.get(name) {
            None => diff.removed.push((*table).clone()),
            Some(other) => {
                let change = diff_table(table, other);
                if change.has_changes() {
                    diff.changed.push(change);
                }
            }
        }
    }

    diff
}

fn diff_table(a: &Table, b: &Table) -> TableChange {
    let mut change = TableChange {
        name: a.name.clone(),
        ..TableChange::default()
    };

    let a_cols: BTreeMap<&str, &Column> = a.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let b_cols: BTreeMap<&str, &Column> = b.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for (name, col) in &b_cols {
        if !a_cols.contains_key(name) {
            change.columns_added.push((*col).clone());
        }
    }
    for (name, col) in &a_cols {
        match b_cols.get(name) {
            None => change.columns_removed.push((*col).clone()),
            Some(other) => {
                let col_change = diff_column(col, other);
                if col_change.has_changes() {
                    change.columns_changed.push(col_change);
                }
            }
        }
    }

    let a_idx: BTreeMap<&str, &Index> = a.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    let b_idx: BTreeMap<&str, &Index> = b.indexes.iter().map(|i| (i.name.as_str(), i)).collect();

    for (name, idx) in &b_idx {
        if !a_idx.contains_key(name) {
            change.indexes_added.push((*idx).clone());
        }
    }
    for (name, idx) in &a_idx {
        match b_idx.get(name) {
            None => change.indexes_removed.push((*idx).clone()),
            Some(other) if !index_eq(idx, other) => change.indexes_changed.push(IndexChange {
                name: idx.name.clone(),
                from: (*idx).clone(),
                to: (*other).clone(),
            }),
            Some(_) => {}
        }
    }

    let a_checks: BTreeMap<&str, &Check> = a.checks.iter().map(|c| (c.name.as_str(), c)).collect();
    let b_checks: BTreeMap<&str, &Check> = b.checks.iter().map(|c| (c.name.as_str(), c)).collect();

    for (name, check) in &b_checks {
        if !a_checks.contains_key(name) {
            change.checks_added.push((*check).clone());
        }
    }
    for (name, check) in &a_checks {
        match b_checks.get(name) {
            None => change.checks_removed.push((*check).clone()),
            Some(other) if !check_eq(check, other) => change.checks_changed.push(CheckChange {
                name: check.name.clone(),
                from: (*check).clone(),
                to: (*other).clone(),
            }),
            Some(_) => {}
        }
    }

    let a_fks: BTreeMap<&str, &ForeignKey> =
        a.foreign_keys.iter().map(|f| (f.name.as_str(), f)).collect();
    let b_fks: BTreeMap<&str, &ForeignKey> =
        b.foreign_keys.iter().map(|f| (f.name.as_str(), f)).collect();

    for (name, fk) in &b_fks {
        if !a_fks.contains_key(name) {
            change.foreign_keys_added.push((*fk).clone());
        }
    }
    for (name, fk) in &a_fks {
        match b_fks.get(name) {
            None => change.foreign_keys_removed.push((*fk).clone()),
            Some(other) if !foreign_key_eq(fk, other) => {
                change.foreign_keys_changed.push(ForeignKeyChange {
                    name: fk.name.clone(),
                    from: (*fk).clone(),
                    to: (*other).clone(),
                })
            }
            Some(_) => {}
        }
    }

    if !primary_key_eq(a.primary_key.as_ref(), b.primary_key.as_ref()) {
        change.primary_key = Some(PrimaryKeyChange {
            from: a.primary_key.clone(),
            to: b.primary_key.clone(),
        });
    }

    change
}

/// Per-attribute column comparison. Missing default and a SQL `NULL` default
/// compare equal.
fn diff_column(a: &Column, b: &Column) -> ColumnChange {
    let mut change = ColumnChange {
        name: a.name.clone(),
        from: a.clone(),
        to: b.clone(),
        ..ColumnChange::default()
    };

    if a.data_type != b.data_type {
        change.data_type = Some(Delta {
            from: a.data_type.clone(),
            to: b.data_type.clone(),
        });
    }
    if a.length != b.length {
        change.length = Some(Delta {
            from: a.length,
            to: b.length,
        });
    }
    if a.precision_scale != b.precision_scale {
        change.precision_scale = Some(Delta {
            from: a.precision_scale,
            to: b.precision_scale,
        });
    }
    if a.nullable != b.nullable {
        change.nullable = Some(Delta {
            from: a.nullable,
            to: b.nullable,
        });
    }
    if !default_eq(a.default.as_deref(), b.default.as_deref()) {
        change.default = Some(Delta {
            from: a.default.clone(),
            to: b.default.clone(),
        });
    }
    if a.generated != b.generated {
        change.generated = Some(Delta {
            from: a.generated,
            to: b.generated,
        });
    }
    if a.collation != b.collation {
        change.collation = Some(Delta {
            from: a.collation.clone(),
            to: b.collation.clone(),
        });
    }

    change
}

fn default_eq(a: Option<&str>, b: Option<&str>) -> bool {
    fn fold(d: Option<&str>) -> Option<&str> {
        match d {
            Some(expr) if expr.eq_ignore_ascii_case("null") => None,
            other => other,
        }
    }
    fold(a) == fold(b)
}

fn sorted_lower(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    out.sort();
    out
}

fn opt_lower(value: Option<&str>) -> Option<String> {
    value.map(|v| v.to_lowercase())
}

/// Index equality: unique flag, case-insensitive access method (absent ≡
/// absent), column lists as sorted sets of lowercased names.
fn index_eq(a: &Index, b: &Index) -> bool {
    a.unique == b.unique
        && opt_lower(a.using.as_deref()) == opt_lower(b.using.as_deref())
        && sorted_lower(&a.columns) == sorted_lower(&b.columns)
}

/// Check equality: expression equality after whitespace normalization.
fn check_eq(a: &Check, b: &Check) -> bool {
    collapse_whitespace(&a.expression) == collapse_whitespace(&b.expression)
}

/// Foreign key equality: column sets, referenced table, and actions compared
/// case-insensitively; absent action ≡ absent.
fn foreign_key_eq(a: &ForeignKey, b: &ForeignKey) -> bool {
    sorted_lower(&a.columns) == sorted_lower(&b.columns)
        && a.referenced_table
            .eq_ignore_ascii_case(&b.referenced_table)
        && sorted_lower(&a.referenced_columns) == sorted_lower(&b.referenced_columns)
        && opt_lower(a.on_update.as_deref()) == opt_lower(b.on_update.as_deref())
        && opt_lower(a.on_delete.as_deref()) == opt_lower(b.on_delete.as_deref())
}

/// Primary key equality: sorted column lists, position-insensitive. A side
/// without a primary key only equals another side without one.
fn primary_key_eq(a: Option<&PrimaryKey>, b: Option<&PrimaryKey>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => sorted_lower(&a.columns) == sorted_lower(&b.columns),
        _ => false,
    }
}

fn diff_views(a: &SchemaModel, b: &SchemaModel) -> ViewsDiff {
    let a_by_name: BTreeMap<&str, &crate::core::schema::View> =
        a.views.iter().map(|v| (v.name.as_str(), v)).collect();
    let b_by_name: BTreeMap<&str, &crate::core::schema::View> =
        b.views.iter().map(|v| (v.name.as_str(), v)).collect();

    let mut diff = ViewsDiff::default();
    for (name, view) in &b_by_name {
        if !a_by_name.contains_key(name) {
            diff.added.push((*view).clone());
        }
    }
    for (name, view) in &a_by_name {
        match b_by_name.get(name) {
            None => diff.removed.push((*view).clone()),
            Some(other) if collapse_whitespace(&view.definition)
                != collapse_whitespace(&other.definition) =>
            {
                diff.changed.push(ViewChange {
                    name: view.name.clone(),
                    from: (*view).clone(),
                    to: (*other).clone(),
                })
            }
            Some(_) => {}
        }
    }
    diff
}

fn diff_routines(a: &SchemaModel, b: &SchemaModel) -> RoutinesDiff {
    // Keyed by (kind, name): a function and a procedure of the same name
    // are distinct objects.
    let key = |r: &crate::core::schema::Routine| (r.kind, r.name.clone());
    let a_by_key: BTreeMap<_, &crate::core::schema::Routine> =
        a.routines.iter().map(|r| (key(r), r)).collect();
    let b_by_key: BTreeMap<_, &crate::core::schema::Routine> =
        b.routines.iter().map(|r| (key(r), r)).collect();

    let mut diff = RoutinesDiff::default();
    for (k, routine) in &b_by_key {
        if !a_by_key.contains_key(k) {
            diff.added.push((*routine).clone());
        }
    }
    for (k, routine) in &a_by_key {
        match b_by_key.get(k) {
            None => diff.removed.push((*routine).clone()),
            Some(other)
                if routine.body != other.body || routine.language != other.language =>
            {
                diff.changed.push(RoutineChange {
                    kind: routine.kind,
                    name: routine.name.clone(),
                    from: (*routine).clone(),
                    to: (*other).clone(),
                })
            }
            Some(_) => {}
        }
    }
    diff
}

fn diff_triggers(a: &SchemaModel, b: &SchemaModel) -> TriggersDiff {
    let key = |t: &crate::core::schema::Trigger| (t.table.clone(), t.name.clone());
    let a_by_key: BTreeMap<_, &crate::core::schema::Trigger> =
        a.triggers.iter().map(|t| (key(t), t)).collect();
    let b_by_key: BTreeMap<_, &crate::core::schema::Trigger> =
        b.triggers.iter().map(|t| (key(t), t)).collect();

    let mut diff = TriggersDiff::default();
    for (k, trigger) in &b_by_key {
        if !a_by_key.contains_key(k) {
            diff.added.push((*trigger).clone());
        }
    }
    for (k, trigger) in &a_by_key {
        match b_by_key.get(k) {
            None => diff.removed.push((*trigger).clone()),
            Some(other)
                if trigger.timing != other.timing
                    || trigger.events != other.events
                    || trigger.body != other.body =>
            {
                diff.changed.push(TriggerChange {
                    table: trigger.table.clone(),
                    name: trigger.name.clone(),
                    from: (*trigger).clone(),
                    to: (*other).clone(),
                })
            }
            Some(_) => {}
        }
    }
    diff
}
