//! MariaDB DDL rendering.

use crate::core::identifier::quote_mariadb as quote;
use crate::core::schema::{Column, Generated, Index, Routine, RoutineKind, Table, Trigger, View};
use crate::diff::{ColumnChange, DiffResult};

use super::postgres::{events_sql, timing_sql};
use super::{render, type_token, DdlDialect, GenerateOptions, Stmt};

/// Generate a MariaDB script from a diff.
pub fn to_mariadb(diff: &DiffResult, opts: &GenerateOptions) -> String {
    render(diff, opts, &MariadbDdl)
}

/// MariaDB rendering strategy.
struct MariadbDdl;

impl MariadbDdl {
    fn render_column(&self, column: &Column) -> String {
        let mut def = format!("{} {}", quote(&column.name), type_token(column));
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        if column.generated == Generated::AutoIncrement {
            def.push_str(" AUTO_INCREMENT");
        }
        if let Some(collation) = &column.collation {
            def.push_str(&format!(" COLLATE {}", collation));
        }
        def
    }

    fn if_exists(&self, opts: &GenerateOptions) -> &'static str {
        if opts.if_exists {
            "IF EXISTS "
        } else {
            ""
        }
    }
}

impl DdlDialect for MariadbDdl {
    fn name(&self) -> &str {
        "mariadb"
    }

    fn transaction_open(&self) -> &'static str {
        "START TRANSACTION;"
    }

    fn create_table(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.render_column(c))
            .collect();

        if let Some(pk) = &table.primary_key {
            let columns = pk
                .columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("PRIMARY KEY ({})", columns));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n) ENGINE=InnoDB;",
            quote(&table.name),
            lines.join(",\n    ")
        )
    }

    fn create_table_markers(&self, _table: &Table) -> Vec<String> {
        // AUTO_INCREMENT is part of the column definition; nothing to flag.
        Vec::new()
    }

    fn drop_table(&self, name: &str, opts: &GenerateOptions) -> String {
        format!("DROP TABLE {}{};", self.if_exists(opts), quote(name))
    }

    fn add_column(&self, table: &str, column: &Column) -> Vec<Stmt> {
        vec![Stmt::create(format!(
            "ALTER TABLE {} ADD COLUMN {};",
            quote(table),
            self.render_column(column)
        ))]
    }

    fn drop_column(&self, table: &str, column: &str, opts: &GenerateOptions) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}{};",
            quote(table),
            self.if_exists(opts),
            quote(column)
        )
    }

    fn alter_column(&self, table: &str, change: &ColumnChange, target: &Column) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        let table_ident = quote(table);
        let column_ident = quote(&change.name);

        // MODIFY restates the whole definition, so a type or nullability
        // change covers the default as well.
        let modifies = change.type_changed() || change.nullable.is_some();
        if modifies {
            stmts.push(Stmt::create(format!(
                "ALTER TABLE {} MODIFY COLUMN {};",
                table_ident,
                self.render_column(target)
            )));
            if change.type_changed() {
                stmts.push(Stmt::comment(format!(
                    "-- TODO: verify casts for {}",
                    change.name
                )));
            }
        } else if change.default.is_some() {
            let stmt = match &target.default {
                Some(expr) => format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};",
                    table_ident, column_ident, expr
                ),
                None => format!(
                    "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;",
                    table_ident, column_ident
                ),
            };
            stmts.push(Stmt::create(stmt));
        }
        if change.generated.is_some() {
            stmts.push(Stmt::comment(format!(
                "-- TODO: reconcile generation strategy for {}",
                change.name
            )));
        }
        if change.collation.is_some() {
            stmts.push(Stmt::comment(format!(
                "-- TODO: adjust collation for {}",
                change.name
            )));
        }

        stmts
    }

    fn create_index(&self, table: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let using = index
            .using
            .as_deref()
            .map(|m| format!(" USING {}", m))
            .unwrap_or_default();
        let columns = index
            .columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE {}INDEX {} ON {}{} ({});",
            unique,
            quote(&index.name),
            quote(table),
            using,
            columns
        )
    }

    fn drop_index(&self, table: &str, index: &str, opts: &GenerateOptions) -> String {
        format!(
            "DROP INDEX {}{} ON {};",
            self.if_exists(opts),
            quote(index),
            quote(table)
        )
    }

    fn create_view(&self, view: &View) -> String {
        format!(
            "CREATE VIEW {} AS {};",
            quote(&view.name),
            view.definition.trim().trim_end_matches(';')
        )
    }

    fn drop_view(&self, name: &str, opts: &GenerateOptions) -> String {
        format!("DROP VIEW {}{};", self.if_exists(opts), quote(name))
    }

    fn create_routine_marker(&self, routine: &Routine) -> String {
        format!(
            "-- TODO: create {} {} (language {}) manually; routine bodies are not rebuilt.",
            routine.kind.as_str(),
            routine.name,
            routine.language
        )
    }

    fn drop_routine(&self, routine: &Routine, opts: &GenerateOptions) -> String {
        let keyword = match routine.kind {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
        };
        format!(
            "DROP {} {}{};",
            keyword,
            self.if_exists(opts),
            quote(&routine.name)
        )
    }

    fn create_trigger(&self, trigger: &Trigger) -> String {
        format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {};",
            quote(&trigger.name),
            timing_sql(trigger.timing),
            events_sql(&trigger.events),
            quote(&trigger.table),
            trigger.body.trim().trim_end_matches(';')
        )
    }

    fn drop_trigger(&self, trigger: &Trigger, opts: &GenerateOptions) -> String {
        format!(
            "DROP TRIGGER {}{};",
            self.if_exists(opts),
            quote(&trigger.name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str, nullable: bool) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            ..Column::default()
        }
    }

    #[test]
    fn test_create_table_appends_engine() {
        let mut id = column("id", "bigint", false);
        id.generated = Generated::AutoIncrement;
        let table = Table {
            name: "audit_log".to_string(),
            columns: vec![id, column("payload", "longtext", true)],
            ..Table::default()
        };

        let sql = MariadbDdl.create_table(&table);
        assert_eq!(
            sql,
            "CREATE TABLE `audit_log` (\n    `id` bigint NOT NULL AUTO_INCREMENT,\n    `payload` longtext\n) ENGINE=InnoDB;"
        );
    }

    #[test]
    fn test_drop_index_names_the_table() {
        let opts = GenerateOptions::default();
        assert_eq!(
            MariadbDdl.drop_index("users", "users_email_key", &opts),
            "DROP INDEX `users_email_key` ON `users`;"
        );
    }

    #[test]
    fn test_modify_covers_type_and_nullability() {
        let from = column("state", "varchar", true);
        let mut to = column("state", "varchar", false);
        to.length = Some(32);

        let change = ColumnChange {
            name: "state".to_string(),
            from: from.clone(),
            to: to.clone(),
            data_type: None,
            length: Some(crate::diff::Delta {
                from: None,
                to: Some(32),
            }),
            nullable: Some(crate::diff::Delta {
                from: true,
                to: false,
            }),
            ..ColumnChange::default()
        };

        let stmts = MariadbDdl.alter_column("jobs", &change, &to);
        assert_eq!(
            stmts[0].sql,
            "ALTER TABLE `jobs` MODIFY COLUMN `state` varchar(32) NOT NULL;"
        );
        assert_eq!(stmts[1].sql, "-- TODO: verify casts for state");
    }

    #[test]
    fn test_default_only_change_uses_alter_column() {
        let from = column("state", "varchar", true);
        let mut to = from.clone();
        to.default = Some("'pending'".to_string());

        let change = ColumnChange {
            name: "state".to_string(),
            from,
            to: to.clone(),
            default: Some(crate::diff::Delta {
                from: None,
                to: Some("'pending'".to_string()),
            }),
            ..ColumnChange::default()
        };

        let stmts = MariadbDdl.alter_column("jobs", &change, &to);
        assert_eq!(
            stmts[0].sql,
            "ALTER TABLE `jobs` ALTER COLUMN `state` SET DEFAULT 'pending';"
        );
    }
}
