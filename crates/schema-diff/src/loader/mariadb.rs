//! MariaDB catalog loader.
//!
//! Introspects one schema through `INFORMATION_SCHEMA`. Index structure
//! arrives as one row per column in `STATISTICS`; rows sharing
//! `(table, index_name)` are aggregated in ordinal order. String columns are
//! CAST to CHAR to sidestep collation differences across server versions.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::Row;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{is_system_schema, ConnectionRef, EngineKind};
use crate::core::schema::{
    Check, Column, ForeignKey, Generated, Index, PrimaryKey, Routine, RoutineKind, SchemaModel,
    Table, Trigger, TriggerEvent, TriggerTiming, View,
};
use crate::error::{DiffError, Result};
use crate::loader::{guarded, is_decimal_type, SchemaLoader, MAX_CATALOG_CONNECTIONS};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MariaDB catalog loader. Owns a private pool that is released when the
/// loader drops, on every exit path.
pub struct MariadbLoader {
    pool: MySqlPool,
}

impl MariadbLoader {
    /// Connect to the database described by `conn`.
    pub async fn connect(conn: &ConnectionRef) -> Result<Self> {
        let ssl_mode = if conn.ssl {
            MySqlSslMode::Required
        } else {
            MySqlSslMode::Disabled
        };

        let options = MySqlConnectOptions::new()
            .host(&conn.host)
            .port(conn.port)
            .database(&conn.database)
            .username(&conn.user)
            .password(&conn.password)
            .ssl_mode(ssl_mode);

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CATALOG_CONNECTIONS as u32)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| DiffError::connect(e.to_string(), "creating MariaDB catalog pool"))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| DiffError::connect(e.to_string(), "testing MariaDB connection"))?;

        info!(
            "Connected to MariaDB: {}:{}/{}",
            conn.host, conn.port, conn.database
        );

        Ok(Self { pool })
    }

    async fn load_tables(&self, schema: &str, cancel: &CancellationToken) -> Result<Vec<Table>> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ?
              AND TABLE_TYPE IN ('BASE TABLE', 'SYSTEM VERSIONED')
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(format!("schema {}", schema), e.to_string()))
        })
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            tables.push(Table {
                name: mget(row, "TABLE_NAME", "table list")?,
                ..Table::default()
            });
        }

        debug!("Found {} tables in schema '{}'", tables.len(), schema);
        Ok(tables)
    }

    async fn load_columns(
        &self,
        schema: &str,
        table: &mut Table,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let entity = format!("table {}", table.name);

        // COLUMN_TYPE keeps the display width that DATA_TYPE drops; the
        // boolean idioms tinyint(1) and bit(1) are only visible there.
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                CAST(COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
                CAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, 0) AS SIGNED) AS max_length,
                CAST(COALESCE(NUMERIC_PRECISION, 0) AS SIGNED) AS num_precision,
                CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS num_scale,
                IF(IS_NULLABLE = 'YES', 1, 0) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR(1024)) AS column_default,
                IF(EXTRA LIKE '%auto_increment%', 1, 0) AS is_auto_increment,
                CAST(COLLATION_NAME AS CHAR(255)) AS collation_name
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in &rows {
            let data_type: String = mget(row, "DATA_TYPE", &entity)?;
            let column_type: String = mget(row, "COLUMN_TYPE", &entity)?;
            let length: i64 = mget(row, "max_length", &entity)?;
            let precision: i64 = mget(row, "num_precision", &entity)?;
            let scale: i64 = mget(row, "num_scale", &entity)?;
            let is_nullable: i64 = mget(row, "is_nullable", &entity)?;
            let is_auto_increment: i64 = mget(row, "is_auto_increment", &entity)?;

            let column_type = column_type.to_lowercase();
            let data_type = if column_type == "tinyint(1)" || column_type == "bit(1)" {
                column_type
            } else {
                data_type
            };

            // Every numeric type reports a precision (10 for int, 19 for
            // bigint); only exact decimals carry a user-chosen one.
            let precision_scale = (is_decimal_type(&data_type) && precision > 0)
                .then_some((precision as u32, scale as u32));

            table.columns.push(Column {
                name: mget(row, "COLUMN_NAME", &entity)?,
                data_type,
                length: (length > 0).then_some(length as u32),
                precision_scale,
                nullable: is_nullable == 1,
                default: mget(row, "column_default", &entity)?,
                generated: if is_auto_increment == 1 {
                    Generated::AutoIncrement
                } else {
                    Generated::None
                },
                collation: mget(row, "collation_name", &entity)?,
            });
        }

        debug!("Loaded {} columns for {}", table.columns.len(), table.name);
        Ok(())
    }

    async fn load_primary_key(
        &self,
        schema: &str,
        table: &mut Table,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in &rows {
            let column: String = mget(row, "COLUMN_NAME", &entity)?;
            // The constraint is always named PRIMARY; that name carries no
            // information, so the model leaves it unset.
            table
                .primary_key
                .get_or_insert_with(PrimaryKey::default)
                .columns
                .push(column);
        }

        Ok(())
    }

    async fn load_indexes(
        &self,
        schema: &str,
        table: &mut Table,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(NON_UNIQUE AS SIGNED) AS NON_UNIQUE
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY'
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in &rows {
            let name: String = mget(row, "INDEX_NAME", &entity)?;
            let column: String = mget(row, "COLUMN_NAME", &entity)?;
            let non_unique: i64 = mget(row, "NON_UNIQUE", &entity)?;

            if let Some(existing) = table.indexes.iter_mut().find(|i| i.name == name) {
                existing.columns.push(column);
            } else {
                table.indexes.push(Index {
                    name,
                    unique: non_unique == 0,
                    columns: vec![column],
                    using: None,
                });
            }
        }

        debug!("Loaded {} indexes for {}", table.indexes.len(), table.name);
        Ok(())
    }

    async fn load_checks(
        &self,
        schema: &str,
        table: &mut Table,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT
                CAST(CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(CHECK_CLAUSE AS CHAR(4096)) AS CHECK_CLAUSE
            FROM INFORMATION_SCHEMA.CHECK_CONSTRAINTS
            WHERE CONSTRAINT_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY CONSTRAINT_NAME
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in &rows {
            table.checks.push(Check {
                name: mget(row, "CONSTRAINT_NAME", &entity)?,
                expression: mget(row, "CHECK_CLAUSE", &entity)?,
            });
        }

        Ok(())
    }

    async fn load_foreign_keys(
        &self,
        schema: &str,
        table: &mut Table,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT
                CAST(kcu.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME,
                CAST(rc.UPDATE_RULE AS CHAR(32)) AS UPDATE_RULE,
                CAST(rc.DELETE_RULE AS CHAR(32)) AS DELETE_RULE
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
              ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
             AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
            WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ?
              AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in &rows {
            let name: String = mget(row, "CONSTRAINT_NAME", &entity)?;
            let column: String = mget(row, "COLUMN_NAME", &entity)?;
            let referenced_column: String = mget(row, "REFERENCED_COLUMN_NAME", &entity)?;

            // Rows sharing a constraint name accumulate in ordinal order.
            if let Some(existing) = table.foreign_keys.iter_mut().find(|fk| fk.name == name) {
                existing.columns.push(column);
                existing.referenced_columns.push(referenced_column);
            } else {
                table.foreign_keys.push(ForeignKey {
                    name,
                    columns: vec![column],
                    referenced_table: mget(row, "REFERENCED_TABLE_NAME", &entity)?,
                    referenced_columns: vec![referenced_column],
                    on_update: Some(mget(row, "UPDATE_RULE", &entity)?),
                    on_delete: Some(mget(row, "DELETE_RULE", &entity)?),
                });
            }
        }

        Ok(())
    }

    async fn load_views(&self, schema: &str, cancel: &CancellationToken) -> Result<Vec<View>> {
        let query = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
                CAST(COALESCE(VIEW_DEFINITION, '') AS CHAR(65535)) AS VIEW_DEFINITION
            FROM INFORMATION_SCHEMA.VIEWS
            WHERE TABLE_SCHEMA = ?
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(format!("views in {}", schema), e.to_string()))
        })
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            views.push(View {
                name: mget(row, "TABLE_NAME", "view list")?,
                definition: mget(row, "VIEW_DEFINITION", "view list")?,
            });
        }
        Ok(views)
    }

    async fn load_routines(
        &self,
        schema: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Routine>> {
        let query = r#"
            SELECT
                CAST(ROUTINE_NAME AS CHAR(255)) AS ROUTINE_NAME,
                CAST(ROUTINE_TYPE AS CHAR(32)) AS ROUTINE_TYPE,
                CAST(ROUTINE_BODY AS CHAR(32)) AS ROUTINE_BODY,
                CAST(COALESCE(ROUTINE_DEFINITION, '') AS CHAR(65535)) AS ROUTINE_DEFINITION
            FROM INFORMATION_SCHEMA.ROUTINES
            WHERE ROUTINE_SCHEMA = ?
            ORDER BY ROUTINE_NAME
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(format!("routines in {}", schema), e.to_string()))
        })
        .await?;

        let mut routines = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind: String = mget(row, "ROUTINE_TYPE", "routine list")?;
            let language: String = mget(row, "ROUTINE_BODY", "routine list")?;
            routines.push(Routine {
                kind: if kind.eq_ignore_ascii_case("procedure") {
                    RoutineKind::Procedure
                } else {
                    RoutineKind::Function
                },
                name: mget(row, "ROUTINE_NAME", "routine list")?,
                language: language.to_lowercase(),
                body: mget(row, "ROUTINE_DEFINITION", "routine list")?,
            });
        }
        Ok(routines)
    }

    async fn load_triggers(
        &self,
        schema: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Trigger>> {
        let query = r#"
            SELECT
                CAST(EVENT_OBJECT_TABLE AS CHAR(255)) AS EVENT_OBJECT_TABLE,
                CAST(TRIGGER_NAME AS CHAR(255)) AS TRIGGER_NAME,
                CAST(ACTION_TIMING AS CHAR(32)) AS ACTION_TIMING,
                CAST(EVENT_MANIPULATION AS CHAR(32)) AS EVENT_MANIPULATION,
                CAST(COALESCE(ACTION_STATEMENT, '') AS CHAR(65535)) AS ACTION_STATEMENT
            FROM INFORMATION_SCHEMA.TRIGGERS
            WHERE TRIGGER_SCHEMA = ?
            ORDER BY EVENT_OBJECT_TABLE, TRIGGER_NAME, EVENT_MANIPULATION
        "#;

        let rows: Vec<MySqlRow> = guarded(cancel, async {
            sqlx::query(query)
                .bind(schema)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DiffError::catalog(format!("triggers in {}", schema), e.to_string()))
        })
        .await?;

        let mut triggers: Vec<Trigger> = Vec::new();
        for row in &rows {
            let table: String = mget(row, "EVENT_OBJECT_TABLE", "trigger list")?;
            let name: String = mget(row, "TRIGGER_NAME", "trigger list")?;
            let timing_raw: String = mget(row, "ACTION_TIMING", "trigger list")?;
            let event_raw: String = mget(row, "EVENT_MANIPULATION", "trigger list")?;
            let body: String = mget(row, "ACTION_STATEMENT", "trigger list")?;

            let timing = match timing_raw.to_uppercase().as_str() {
                "BEFORE" => TriggerTiming::Before,
                "AFTER" => TriggerTiming::After,
                other => {
                    return Err(DiffError::catalog(
                        format!("trigger {}.{}", table, name),
                        format!("unknown timing '{}'", other),
                    ))
                }
            };
            let event = match event_raw.to_uppercase().as_str() {
                "INSERT" => TriggerEvent::Insert,
                "UPDATE" => TriggerEvent::Update,
                "DELETE" => TriggerEvent::Delete,
                other => {
                    return Err(DiffError::catalog(
                        format!("trigger {}.{}", table, name),
                        format!("unknown event '{}'", other),
                    ))
                }
            };

            if let Some(existing) = triggers
                .iter_mut()
                .find(|t| t.table == table && t.name == name)
            {
                existing.events.push(event);
            } else {
                triggers.push(Trigger {
                    table,
                    name,
                    timing,
                    events: vec![event],
                    body,
                });
            }
        }

        for trigger in &mut triggers {
            trigger.events.sort();
            trigger.events.dedup();
        }
        Ok(triggers)
    }
}

#[async_trait]
impl SchemaLoader for MariadbLoader {
    fn engine(&self) -> &str {
        "mariadb"
    }

    async fn load(&self, schema: &str, cancel: &CancellationToken) -> Result<SchemaModel> {
        if is_system_schema(EngineKind::Mariadb, schema) {
            return Err(DiffError::Config(format!(
                "refusing to introspect system schema '{}'",
                schema
            )));
        }

        let mut tables = self.load_tables(schema, cancel).await?;
        for table in &mut tables {
            self.load_columns(schema, table, cancel).await?;
            self.load_primary_key(schema, table, cancel).await?;
            self.load_indexes(schema, table, cancel).await?;
            self.load_checks(schema, table, cancel).await?;
            self.load_foreign_keys(schema, table, cancel).await?;
        }

        let views = self.load_views(schema, cancel).await?;
        let routines = self.load_routines(schema, cancel).await?;
        let triggers = self.load_triggers(schema, cancel).await?;

        info!(
            "Introspected schema '{}': {} tables, {} views, {} routines, {} triggers",
            schema,
            tables.len(),
            views.len(),
            routines.len(),
            triggers.len()
        );

        Ok(SchemaModel {
            tables,
            views,
            routines,
            triggers,
        })
    }
}

/// Read one column of a catalog row, mapping decode failures to a catalog
/// error naming the entity being loaded.
fn mget<'r, T>(row: &'r MySqlRow, column: &str, entity: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    row.try_get(column)
        .map_err(|e| DiffError::catalog(entity, format!("column {}: {}", column, e)))
}
