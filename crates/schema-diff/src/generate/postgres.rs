//! PostgreSQL DDL rendering.

use crate::core::identifier::quote_postgres as quote;
use crate::core::schema::{
    Column, Generated, Index, Routine, RoutineKind, Table, Trigger, TriggerEvent, TriggerTiming,
    View,
};
use crate::diff::{ColumnChange, DiffResult};

use super::{render, type_token, DdlDialect, GenerateOptions, Stmt};

/// Generate a PostgreSQL script from a diff.
pub fn to_postgres(diff: &DiffResult, opts: &GenerateOptions) -> String {
    render(diff, opts, &PostgresDdl)
}

/// PostgreSQL rendering strategy.
struct PostgresDdl;

const GENERATION_MARKER: &str = "-- TODO: ensure generation strategy is preserved";

impl PostgresDdl {
    fn render_column(&self, column: &Column) -> String {
        let mut def = format!("{} {}", quote(&column.name), type_token(column));
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        if let Some(collation) = &column.collation {
            def.push_str(&format!(" COLLATE {}", quote(collation)));
        }
        def
    }

    fn drop_suffix(&self, opts: &GenerateOptions) -> &'static str {
        if opts.cascade {
            " CASCADE"
        } else {
            ""
        }
    }

    fn if_exists(&self, opts: &GenerateOptions) -> &'static str {
        if opts.if_exists {
            "IF EXISTS "
        } else {
            ""
        }
    }
}

impl DdlDialect for PostgresDdl {
    fn name(&self) -> &str {
        "postgres"
    }

    fn transaction_open(&self) -> &'static str {
        "BEGIN;"
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
            match &pk.name {
                Some(name) => lines.push(format!(
                    "CONSTRAINT {} PRIMARY KEY ({})",
                    quote(name),
                    columns
                )),
                None => lines.push(format!("PRIMARY KEY ({})", columns)),
            }
        }

        format!(
            "CREATE TABLE {} (\n    {}\n);",
            quote(&table.name),
            lines.join(",\n    ")
        )
    }

    fn create_table_markers(&self, table: &Table) -> Vec<String> {
        let generated = table
            .columns
            .iter()
            .any(|c| matches!(c.generated, Generated::Identity | Generated::Sequence));
        if generated {
            vec![GENERATION_MARKER.to_string()]
        } else {
            Vec::new()
        }
    }

    fn drop_table(&self, name: &str, opts: &GenerateOptions) -> String {
        format!(
            "DROP TABLE {}{}{};",
            self.if_exists(opts),
            quote(name),
            self.drop_suffix(opts)
        )
    }

    fn add_column(&self, table: &str, column: &Column) -> Vec<Stmt> {
        let mut stmts = vec![Stmt::create(format!(
            "ALTER TABLE {} ADD COLUMN {};",
            quote(table),
            self.render_column(column)
        ))];
        if matches!(column.generated, Generated::Identity | Generated::Sequence) {
            stmts.push(Stmt::comment(GENERATION_MARKER));
        }
        stmts
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

        if change.type_changed() {
            stmts.push(Stmt::create(format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {};",
                table_ident,
                column_ident,
                type_token(target)
            )));
            stmts.push(Stmt::comment(format!(
                "-- TODO: verify casts for {}",
                change.name
            )));
        }
        if change.nullable.is_some() {
            let clause = if target.nullable {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            };
            stmts.push(Stmt::create(format!(
                "ALTER TABLE {} ALTER COLUMN {} {};",
                table_ident, column_ident, clause
            )));
        }
        if change.default.is_some() {
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
            .map(|c| quote_index_column(c))
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

    fn drop_index(&self, _table: &str, index: &str, opts: &GenerateOptions) -> String {
        format!(
            "DROP INDEX {}{}{};",
            self.if_exists(opts),
            quote(index),
            self.drop_suffix(opts)
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
        format!(
            "DROP VIEW {}{}{};",
            self.if_exists(opts),
            quote(name),
            self.drop_suffix(opts)
        )
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
            "DROP {} {}{}{};",
            keyword,
            self.if_exists(opts),
            quote(&routine.name),
            self.drop_suffix(opts)
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
            "DROP TRIGGER {}{} ON {}{};",
            self.if_exists(opts),
            quote(&trigger.name),
            quote(&trigger.table),
            self.drop_suffix(opts)
        )
    }
}

/// Index members may be plain columns or expressions; only plain names are
/// quoted.
fn quote_index_column(column: &str) -> String {
    if column.contains('(') || column.contains(' ') {
        column.to_string()
    } else {
        quote(column)
    }
}

pub(crate) fn timing_sql(timing: TriggerTiming) -> &'static str {
    match timing {
        TriggerTiming::Before => "BEFORE",
        TriggerTiming::After => "AFTER",
    }
}

pub(crate) fn events_sql(events: &[TriggerEvent]) -> String {
    events
        .iter()
        .map(|e| match e {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::PrimaryKey;
    use crate::diff::compute_diff;
    use crate::generate::Direction;

    fn column(name: &str, data_type: &str, nullable: bool) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            ..Column::default()
        }
    }

    #[test]
    fn test_create_table_with_primary_key() {
        let table = Table {
            name: "users".to_string(),
            columns: vec![
                column("id", "bigint", false),
                {
                    let mut c = column("email", "varchar", false);
                    c.length = Some(255);
                    c
                },
            ],
            primary_key: Some(PrimaryKey {
                name: Some("users_pkey".to_string()),
                columns: vec!["id".to_string()],
            }),
            ..Table::default()
        };

        let sql = PostgresDdl.create_table(&table);
        assert_eq!(
            sql,
            "CREATE TABLE \"users\" (\n    \"id\" bigint NOT NULL,\n    \"email\" varchar(255) NOT NULL,\n    CONSTRAINT \"users_pkey\" PRIMARY KEY (\"id\")\n);"
        );
    }

    #[test]
    fn test_identity_column_yields_generation_marker() {
        let mut id = column("id", "bigint", false);
        id.generated = Generated::Identity;
        let table = Table {
            name: "users".to_string(),
            columns: vec![id],
            ..Table::default()
        };
        assert_eq!(
            PostgresDdl.create_table_markers(&table),
            vec![GENERATION_MARKER.to_string()]
        );
    }

    #[test]
    fn test_alter_column_per_attribute() {
        let mut from = column("email", "varchar", false);
        from.length = Some(255);
        let mut to = column("email", "varchar", true);
        to.length = Some(128);
        to.default = Some("'x'".to_string());

        let a = crate::core::schema::SchemaModel {
            tables: vec![Table {
                name: "users".to_string(),
                columns: vec![from],
                ..Table::default()
            }],
            ..Default::default()
        };
        let b = crate::core::schema::SchemaModel {
            tables: vec![Table {
                name: "users".to_string(),
                columns: vec![to],
                ..Table::default()
            }],
            ..Default::default()
        };

        let diff = compute_diff(&a, &b);
        let change = &diff.tables.changed[0].columns_changed[0];

        // BtoA targets the B side: narrow, nullable, with default.
        let stmts = PostgresDdl.alter_column("users", change, &change.to);
        let sql: Vec<&str> = stmts.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(sql[0], "ALTER TABLE \"users\" ALTER COLUMN \"email\" TYPE varchar(128);");
        assert_eq!(sql[1], "-- TODO: verify casts for email");
        assert_eq!(sql[2], "ALTER TABLE \"users\" ALTER COLUMN \"email\" DROP NOT NULL;");
        assert_eq!(sql[3], "ALTER TABLE \"users\" ALTER COLUMN \"email\" SET DEFAULT 'x';");
    }

    #[test]
    fn test_create_index_with_using_and_expression() {
        let index = Index {
            name: "users_email_idx".to_string(),
            unique: true,
            columns: vec!["lower(email)".to_string(), "id".to_string()],
            using: Some("btree".to_string()),
        };
        assert_eq!(
            PostgresDdl.create_index("users", &index),
            "CREATE UNIQUE INDEX \"users_email_idx\" ON \"users\" USING btree (lower(email), \"id\");"
        );
    }

    #[test]
    fn test_drop_statements_honor_cascade_and_if_exists() {
        let opts = GenerateOptions {
            direction: Direction::AtoB,
            cascade: true,
            if_exists: true,
            ..GenerateOptions::default()
        };
        assert_eq!(
            PostgresDdl.drop_table("users", &opts),
            "DROP TABLE IF EXISTS \"users\" CASCADE;"
        );
        assert_eq!(
            PostgresDdl.drop_index("users", "users_email_idx", &opts),
            "DROP INDEX IF EXISTS \"users_email_idx\" CASCADE;"
        );
    }

    #[test]
    fn test_trigger_statements() {
        let trigger = Trigger {
            table: "users".to_string(),
            name: "audit".to_string(),
            timing: TriggerTiming::After,
            events: vec![TriggerEvent::Insert, TriggerEvent::Update],
            body: "EXECUTE FUNCTION log_change()".to_string(),
        };
        assert_eq!(
            PostgresDdl.create_trigger(&trigger),
            "CREATE TRIGGER \"audit\" AFTER INSERT OR UPDATE ON \"users\" FOR EACH ROW EXECUTE FUNCTION log_change();"
        );
        assert_eq!(
            PostgresDdl.drop_trigger(&trigger, &GenerateOptions::default()),
            "DROP TRIGGER \"audit\" ON \"users\";"
        );
    }
}
