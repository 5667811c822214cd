//! DDL script generation.
//!
//! Turns a [`DiffResult`] into a dialect-specific SQL script. The emission
//! order is fixed and shared across dialects; each dialect supplies only its
//! statement rendering (Strategy pattern). The generated script is a
//! proposal for human review, not an executable transformation: state-
//! dependent operations (casts, collation rewrites, identity ownership)
//! surface as TODO markers instead of guessed statements.

mod mariadb;
mod postgres;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::schema::{Column, Index, Routine, Table, Trigger, View};
use crate::diff::{ColumnChange, DiffResult};
use crate::error::DiffError;

pub use mariadb::to_mariadb;
pub use postgres::to_postgres;

/// Which side the generated script treats as the desired end state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `A` is the desired end state: the script runs against `B`.
    AtoB,
    /// `B` is the desired end state: the script runs against `A`.
    BtoA,
}

impl FromStr for Direction {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atob" => Ok(Direction::AtoB),
            "btoa" => Ok(Direction::BtoA),
            other => Err(DiffError::Config(format!(
                "invalid direction '{}' (expected 'AtoB' or 'BtoA')",
                other
            ))),
        }
    }
}

/// Script generation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Direction of the transformation.
    pub direction: Direction,

    /// Bracket the script in a transaction.
    pub with_transaction: bool,

    /// Emit destructive statements commented out.
    pub safe_mode: bool,

    /// Append CASCADE to drops, where the dialect supports it.
    pub cascade: bool,

    /// Emit IF EXISTS on drops.
    pub if_exists: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            direction: Direction::AtoB,
            with_transaction: false,
            safe_mode: false,
            cascade: false,
            if_exists: false,
        }
    }
}

/// Banner preceding the first run of commented drops.
const SAFE_MODE_BANNER: &str =
    "-- SAFE MODE: destructive statements below are commented out; review before applying.";

/// Statement kinds, for safe-mode handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StmtKind {
    /// Constructive statement, always emitted verbatim.
    Create,
    /// Destructive statement, commented out under safe mode.
    Drop,
    /// Comment line (banner, TODO markers).
    Comment,
}

/// One emitted statement.
#[derive(Debug, Clone)]
pub(crate) struct Stmt {
    pub sql: String,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn create(sql: impl Into<String>) -> Self {
        Stmt {
            sql: sql.into(),
            kind: StmtKind::Create,
        }
    }

    pub fn drop(sql: impl Into<String>) -> Self {
        Stmt {
            sql: sql.into(),
            kind: StmtKind::Drop,
        }
    }

    pub fn comment(sql: impl Into<String>) -> Self {
        Stmt {
            sql: sql.into(),
            kind: StmtKind::Comment,
        }
    }
}

/// Dialect-specific statement rendering.
pub(crate) trait DdlDialect {
    fn name(&self) -> &str;

    /// Transaction opener (`BEGIN;` or `START TRANSACTION;`).
    fn transaction_open(&self) -> &'static str;

    fn create_table(&self, table: &Table) -> String;

    /// Comment markers accompanying a table create (generation strategy).
    fn create_table_markers(&self, table: &Table) -> Vec<String>;

    fn drop_table(&self, name: &str, opts: &GenerateOptions) -> String;

    /// ADD COLUMN statement plus any markers.
    fn add_column(&self, table: &str, column: &Column) -> Vec<Stmt>;

    fn drop_column(&self, table: &str, column: &str, opts: &GenerateOptions) -> String;

    /// One ALTER clause (or TODO marker) per changed attribute, targeting
    /// the desired-side column.
    fn alter_column(&self, table: &str, change: &ColumnChange, target: &Column) -> Vec<Stmt>;

    fn create_index(&self, table: &str, index: &Index) -> String;

    fn drop_index(&self, table: &str, index: &str, opts: &GenerateOptions) -> String;

    fn create_view(&self, view: &View) -> String;

    fn drop_view(&self, name: &str, opts: &GenerateOptions) -> String;

    /// Routine bodies are not rebuilt; creation yields a marker.
    fn create_routine_marker(&self, routine: &Routine) -> String;

    fn drop_routine(&self, routine: &Routine, opts: &GenerateOptions) -> String;

    fn create_trigger(&self, trigger: &Trigger) -> String;

    fn drop_trigger(&self, trigger: &Trigger, opts: &GenerateOptions) -> String;
}

/// Shared emission driver. Statement order is fixed: transaction opener,
/// safe-mode banner, table drops, table creates, per-table column and index
/// work, then views, routines, triggers, and the commit.
pub(crate) fn render(diff: &DiffResult, opts: &GenerateOptions, dialect: &dyn DdlDialect) -> String {
    let mut stmts: Vec<Stmt> = Vec::new();

    // Direction inversion: the desired side's missing objects get created,
    // its extra objects get dropped.
    let (tables_to_create, tables_to_drop) = match opts.direction {
        Direction::AtoB => (&diff.tables.removed, &diff.tables.added),
        Direction::BtoA => (&diff.tables.added, &diff.tables.removed),
    };

    if opts.with_transaction {
        stmts.push(Stmt::create(dialect.transaction_open()));
    }

    if opts.safe_mode && !tables_to_drop.is_empty() {
        stmts.push(Stmt::comment(SAFE_MODE_BANNER));
    }

    for table in tables_to_drop {
        stmts.push(Stmt::drop(dialect.drop_table(&table.name, opts)));
    }

    for table in tables_to_create {
        stmts.push(Stmt::create(dialect.create_table(table)));
        for marker in dialect.create_table_markers(table) {
            stmts.push(Stmt::comment(marker));
        }
    }

    for change in &diff.tables.changed {
        let table = change.name.as_str();

        let (columns_to_drop, columns_to_add) = match opts.direction {
            Direction::AtoB => (&change.columns_added, &change.columns_removed),
            Direction::BtoA => (&change.columns_removed, &change.columns_added),
        };

        for column in columns_to_drop {
            stmts.push(Stmt::drop(dialect.drop_column(table, &column.name, opts)));
        }
        for column in columns_to_add {
            stmts.extend(dialect.add_column(table, column));
        }
        for col_change in &change.columns_changed {
            let target = match opts.direction {
                Direction::AtoB => &col_change.from,
                Direction::BtoA => &col_change.to,
            };
            stmts.extend(dialect.alter_column(table, col_change, target));
        }

        let (indexes_to_drop, indexes_to_create): (Vec<&Index>, Vec<&Index>) =
            match opts.direction {
                Direction::AtoB => (
                    change
                        .indexes_added
                        .iter()
                        .chain(change.indexes_changed.iter().map(|c| &c.to))
                        .collect(),
                    change
                        .indexes_removed
                        .iter()
                        .chain(change.indexes_changed.iter().map(|c| &c.from))
                        .collect(),
                ),
                Direction::BtoA => (
                    change
                        .indexes_removed
                        .iter()
                        .chain(change.indexes_changed.iter().map(|c| &c.from))
                        .collect(),
                    change
                        .indexes_added
                        .iter()
                        .chain(change.indexes_changed.iter().map(|c| &c.to))
                        .collect(),
                ),
            };

        for index in indexes_to_drop {
            stmts.push(Stmt::drop(dialect.drop_index(table, &index.name, opts)));
        }
        for index in indexes_to_create {
            stmts.push(Stmt::create(dialect.create_index(table, index)));
        }
    }

    let (views_to_create, views_to_drop) = match opts.direction {
        Direction::AtoB => (&diff.views.removed, &diff.views.added),
        Direction::BtoA => (&diff.views.added, &diff.views.removed),
    };
    for view in views_to_drop {
        stmts.push(Stmt::drop(dialect.drop_view(&view.name, opts)));
    }
    for view in views_to_create {
        stmts.push(Stmt::create(dialect.create_view(view)));
    }
    for change in &diff.views.changed {
        stmts.push(Stmt::comment(format!(
            "-- TODO: view {} definition changed; drop and recreate manually.",
            change.name
        )));
    }

    let (routines_to_create, routines_to_drop) = match opts.direction {
        Direction::AtoB => (&diff.routines.removed, &diff.routines.added),
        Direction::BtoA => (&diff.routines.added, &diff.routines.removed),
    };
    for routine in routines_to_drop {
        stmts.push(Stmt::drop(dialect.drop_routine(routine, opts)));
    }
    for routine in routines_to_create {
        stmts.push(Stmt::comment(dialect.create_routine_marker(routine)));
    }
    for change in &diff.routines.changed {
        stmts.push(Stmt::comment(format!(
            "-- TODO: routine {} definition changed; drop and recreate manually.",
            change.name
        )));
    }

    let (triggers_to_create, triggers_to_drop) = match opts.direction {
        Direction::AtoB => (&diff.triggers.removed, &diff.triggers.added),
        Direction::BtoA => (&diff.triggers.added, &diff.triggers.removed),
    };
    for trigger in triggers_to_drop {
        stmts.push(Stmt::drop(dialect.drop_trigger(trigger, opts)));
    }
    for trigger in triggers_to_create {
        stmts.push(Stmt::create(dialect.create_trigger(trigger)));
    }
    for change in &diff.triggers.changed {
        stmts.push(Stmt::comment(format!(
            "-- TODO: trigger {}.{} definition changed; drop and recreate manually.",
            change.table, change.name
        )));
    }

    if opts.with_transaction {
        stmts.push(Stmt::create("COMMIT;"));
    }

    assemble(&stmts, opts.safe_mode)
}

/// Join statements with one blank line between every two non-empty ones,
/// commenting out destructive statements under safe mode.
fn assemble(stmts: &[Stmt], safe_mode: bool) -> String {
    let rendered: Vec<String> = stmts
        .iter()
        .filter(|s| !s.sql.is_empty())
        .map(|s| {
            if safe_mode && s.kind == StmtKind::Drop {
                s.sql
                    .lines()
                    .map(|line| format!("-- {}", line))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                s.sql.clone()
            }
        })
        .collect();

    rendered.join("\n\n")
}

/// Render the type token of a column: `TYPE`, `TYPE(len)`, or
/// `TYPE(precision,scale)`.
pub(crate) fn type_token(column: &Column) -> String {
    if let Some(length) = column.length {
        format!("{}({})", column.data_type, length)
    } else if let Some((precision, scale)) = column.precision_scale {
        format!("{}({},{})", column.data_type, precision, scale)
    } else {
        column.data_type.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_str() {
        assert_eq!("AtoB".parse::<Direction>().unwrap(), Direction::AtoB);
        assert_eq!("btoa".parse::<Direction>().unwrap(), Direction::BtoA);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_type_token_variants() {
        let mut col = Column {
            name: "email".to_string(),
            data_type: "varchar".to_string(),
            ..Column::default()
        };
        assert_eq!(type_token(&col), "varchar");
        col.length = Some(255);
        assert_eq!(type_token(&col), "varchar(255)");
        col.length = None;
        col.data_type = "numeric".to_string();
        col.precision_scale = Some((10, 2));
        assert_eq!(type_token(&col), "numeric(10,2)");
    }

    #[test]
    fn test_assemble_blank_line_separation_and_safe_mode() {
        let stmts = vec![
            Stmt::create("BEGIN;"),
            Stmt::drop("DROP TABLE \"users\";"),
            Stmt::create("COMMIT;"),
        ];
        let script = assemble(&stmts, true);
        assert_eq!(
            script,
            "BEGIN;\n\n-- DROP TABLE \"users\";\n\nCOMMIT;"
        );

        let unsafe_script = assemble(&stmts, false);
        assert!(unsafe_script.contains("\n\nDROP TABLE"));
    }
}
