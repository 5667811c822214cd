//! PostgreSQL catalog loader.
//!
//! Introspects one schema through `pg_catalog` and `information_schema`.
//! Index structure is recovered by parsing `pg_indexes.indexdef`, since the
//! catalog exposes it as definition text rather than one row per column.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio_postgres::types::FromSql;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{is_system_schema, ConnectionRef, EngineKind};
use crate::core::schema::{
    Check, Column, ForeignKey, Generated, Index, PrimaryKey, Routine, RoutineKind, SchemaModel,
    Table, Trigger, TriggerEvent, TriggerTiming, View,
};
use crate::error::{DiffError, Result};
use crate::loader::{guarded, is_decimal_type, SchemaLoader, MAX_CATALOG_CONNECTIONS};

/// PostgreSQL catalog loader. Owns a private pool that is released when the
/// loader drops, on every exit path.
pub struct PostgresLoader {
    pool: Pool,
}

impl PostgresLoader {
    /// Connect to the database described by `conn`.
    pub async fn connect(conn: &ConnectionRef) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&conn.host);
        pg_config.port(conn.port);
        pg_config.dbname(&conn.database);
        pg_config.user(&conn.user);
        pg_config.password(&conn.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = if conn.ssl {
            let tls_config = build_tls_config();
            let tls_connector = MakeRustlsConnect::new(tls_config);
            let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
            Pool::builder(mgr)
                .max_size(MAX_CATALOG_CONNECTIONS)
                .build()
                .map_err(|e| DiffError::connect(e.to_string(), "creating PostgreSQL catalog pool"))?
        } else {
            let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
            Pool::builder(mgr)
                .max_size(MAX_CATALOG_CONNECTIONS)
                .build()
                .map_err(|e| DiffError::connect(e.to_string(), "creating PostgreSQL catalog pool"))?
        };

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| DiffError::connect(e.to_string(), "testing PostgreSQL connection"))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| DiffError::connect(e.to_string(), "testing PostgreSQL connection"))?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            conn.host, conn.port, conn.database
        );

        Ok(Self { pool })
    }

    async fn client(&self, context: &str) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| DiffError::connect(e.to_string(), context.to_string()))
    }

    async fn load_tables(&self, schema: &str, cancel: &CancellationToken) -> Result<Vec<Table>> {
        let client = self.client("listing tables").await?;

        let query = r#"
            SELECT c.relname
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'p')
            ORDER BY c.relname
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema])
                .await
                .map_err(|e| DiffError::catalog(format!("schema {}", schema), e.to_string()))
        })
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(Table {
                name: get(&row, 0, "table list")?,
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
        let client = self.client("loading columns").await?;
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT
                c.column_name,
                c.data_type,
                COALESCE(c.character_maximum_length, 0)::int4,
                COALESCE(c.numeric_precision, 0)::int4,
                COALESCE(c.numeric_scale, 0)::int4,
                CASE WHEN c.is_nullable = 'YES' THEN true ELSE false END,
                c.column_default,
                CASE WHEN c.is_identity = 'YES' THEN true ELSE false END,
                pg_get_serial_sequence(format('%I.%I', c.table_schema, c.table_name),
                                       c.column_name) IS NOT NULL,
                c.collation_name
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema, &table.name])
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in rows {
            let data_type: String = get(&row, 1, &entity)?;
            let length: i32 = get(&row, 2, &entity)?;
            let precision: i32 = get(&row, 3, &entity)?;
            let scale: i32 = get(&row, 4, &entity)?;
            let is_identity: bool = get(&row, 7, &entity)?;
            let owns_sequence: bool = get(&row, 8, &entity)?;

            let generated = if is_identity {
                Generated::Identity
            } else if owns_sequence {
                Generated::Sequence
            } else {
                Generated::None
            };

            // The catalog reports a precision for every numeric type (32 for
            // integer, 64 for bigint); only exact decimals carry a
            // user-chosen precision worth comparing.
            let precision_scale = (is_decimal_type(&data_type) && precision > 0)
                .then_some((precision as u32, scale as u32));

            table.columns.push(Column {
                name: get(&row, 0, &entity)?,
                data_type,
                length: (length > 0).then_some(length as u32),
                precision_scale,
                nullable: get(&row, 5, &entity)?,
                default: get(&row, 6, &entity)?,
                generated,
                collation: get(&row, 9, &entity)?,
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
        let client = self.client("loading primary key").await?;
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT c.conname, a.attname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'p'
              AND a.attnum = ANY(c.conkey)
            ORDER BY array_position(c.conkey, a.attnum)
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema, &table.name])
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in rows {
            let name: String = get(&row, 0, &entity)?;
            let column: String = get(&row, 1, &entity)?;
            table
                .primary_key
                .get_or_insert_with(|| PrimaryKey {
                    name: Some(name),
                    columns: Vec::new(),
                })
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
        let client = self.client("loading indexes").await?;
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT indexname, indexdef
            FROM pg_catalog.pg_indexes
            WHERE schemaname = $1 AND tablename = $2
            ORDER BY indexname
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema, &table.name])
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        let pk_name: Option<String> = table.primary_key.as_ref().and_then(|pk| pk.name.clone());

        for row in rows {
            let name: String = get(&row, 0, &entity)?;
            // The primary-key constraint surfaces as an index of the same name.
            if Some(name.as_str()) == pk_name.as_deref() {
                continue;
            }

            let def: String = get(&row, 1, &entity)?;
            let (unique, using, columns) = parse_indexdef(&def)
                .map_err(|msg| DiffError::catalog(format!("index {}.{}", table.name, name), msg))?;
            table.indexes.push(Index {
                name,
                unique,
                columns,
                using,
            });
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
        let client = self.client("loading check constraints").await?;
        let entity = format!("table {}", table.name);

        let query = r#"
            SELECT c.conname, pg_get_constraintdef(c.oid)
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'c'
            ORDER BY c.conname
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema, &table.name])
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in rows {
            let definition: String = get(&row, 1, &entity)?;
            table.checks.push(Check {
                name: get(&row, 0, &entity)?,
                expression: strip_check_wrapper(&definition),
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
        let client = self.client("loading foreign keys").await?;
        let entity = format!("table {}", table.name);

        // One row per key column pair, in key order; rows sharing a
        // constraint name accumulate below.
        let query = r#"
            SELECT
                c.conname,
                a.attname,
                rt.relname,
                ra.attname,
                CASE c.confupdtype
                    WHEN 'r' THEN 'RESTRICT'
                    WHEN 'c' THEN 'CASCADE'
                    WHEN 'n' THEN 'SET NULL'
                    WHEN 'd' THEN 'SET DEFAULT'
                    ELSE 'NO ACTION'
                END,
                CASE c.confdeltype
                    WHEN 'r' THEN 'RESTRICT'
                    WHEN 'c' THEN 'CASCADE'
                    WHEN 'n' THEN 'SET NULL'
                    WHEN 'd' THEN 'SET DEFAULT'
                    ELSE 'NO ACTION'
                END
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
            CROSS JOIN LATERAL unnest(c.conkey, c.confkey)
                WITH ORDINALITY AS k(attnum, fattnum, ord)
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.fattnum
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'f'
            ORDER BY c.conname, k.ord
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema, &table.name])
                .await
                .map_err(|e| DiffError::catalog(&entity, e.to_string()))
        })
        .await?;

        for row in rows {
            let name: String = get(&row, 0, &entity)?;
            let column: String = get(&row, 1, &entity)?;
            let referenced_column: String = get(&row, 3, &entity)?;

            if let Some(existing) = table.foreign_keys.iter_mut().find(|fk| fk.name == name) {
                existing.columns.push(column);
                existing.referenced_columns.push(referenced_column);
            } else {
                table.foreign_keys.push(ForeignKey {
                    name,
                    columns: vec![column],
                    referenced_table: get(&row, 2, &entity)?,
                    referenced_columns: vec![referenced_column],
                    on_update: Some(get(&row, 4, &entity)?),
                    on_delete: Some(get(&row, 5, &entity)?),
                });
            }
        }

        Ok(())
    }

    async fn load_views(&self, schema: &str, cancel: &CancellationToken) -> Result<Vec<View>> {
        let client = self.client("loading views").await?;

        let query = r#"
            SELECT table_name, COALESCE(view_definition, '')
            FROM information_schema.views
            WHERE table_schema = $1
            ORDER BY table_name
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema])
                .await
                .map_err(|e| DiffError::catalog(format!("views in {}", schema), e.to_string()))
        })
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(View {
                name: get(&row, 0, "view list")?,
                definition: get(&row, 1, "view list")?,
            });
        }
        Ok(views)
    }

    async fn load_routines(
        &self,
        schema: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Routine>> {
        let client = self.client("loading routines").await?;

        let query = r#"
            SELECT
                p.proname,
                CASE p.prokind WHEN 'p' THEN 'procedure' ELSE 'function' END,
                l.lanname,
                COALESCE(p.prosrc, '')
            FROM pg_catalog.pg_proc p
            JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
            JOIN pg_catalog.pg_language l ON l.oid = p.prolang
            WHERE n.nspname = $1
              AND p.prokind IN ('f', 'p')
            ORDER BY p.proname
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema])
                .await
                .map_err(|e| DiffError::catalog(format!("routines in {}", schema), e.to_string()))
        })
        .await?;

        let mut routines = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = get(&row, 1, "routine list")?;
            routines.push(Routine {
                kind: if kind == "procedure" {
                    RoutineKind::Procedure
                } else {
                    RoutineKind::Function
                },
                name: get(&row, 0, "routine list")?,
                language: get(&row, 2, "routine list")?,
                body: get(&row, 3, "routine list")?,
            });
        }
        Ok(routines)
    }

    async fn load_triggers(
        &self,
        schema: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Trigger>> {
        let client = self.client("loading triggers").await?;

        let query = r#"
            SELECT
                event_object_table,
                trigger_name,
                action_timing,
                event_manipulation,
                COALESCE(action_statement, '')
            FROM information_schema.triggers
            WHERE trigger_schema = $1
            ORDER BY event_object_table, trigger_name, event_manipulation
        "#;

        let rows = guarded(cancel, async {
            client
                .query(query, &[&schema])
                .await
                .map_err(|e| DiffError::catalog(format!("triggers in {}", schema), e.to_string()))
        })
        .await?;

        let mut triggers: Vec<Trigger> = Vec::new();
        for row in rows {
            let table: String = get(&row, 0, "trigger list")?;
            let name: String = get(&row, 1, "trigger list")?;
            let timing_raw: String = get(&row, 2, "trigger list")?;
            let event_raw: String = get(&row, 3, "trigger list")?;
            let body: String = get(&row, 4, "trigger list")?;

            let Some(timing) = parse_trigger_timing(&timing_raw) else {
                // INSTEAD OF triggers sit on views; the model does not carry them.
                debug!("Skipping trigger {} with timing {}", name, timing_raw);
                continue;
            };
            let event = parse_trigger_event(&event_raw)
                .ok_or_else(|| DiffError::catalog(format!("trigger {}.{}", table, name), format!("unknown event '{}'", event_raw)))?;

            // One catalog row per event; merge rows sharing (table, name).
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
impl SchemaLoader for PostgresLoader {
    fn engine(&self) -> &str {
        "postgres"
    }

    async fn load(&self, schema: &str, cancel: &CancellationToken) -> Result<SchemaModel> {
        if is_system_schema(EngineKind::Postgres, schema) {
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
fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize, entity: &str) -> Result<T> {
    row.try_get(idx)
        .map_err(|e| DiffError::catalog(entity, format!("column {}: {}", idx, e)))
}

/// Recover `(unique, using, columns)` from a `pg_indexes.indexdef` string,
/// e.g. `CREATE UNIQUE INDEX users_email_key ON public.users USING btree (lower(email), id)`.
fn parse_indexdef(def: &str) -> std::result::Result<(bool, Option<String>, Vec<String>), String> {
    let unique = def.starts_with("CREATE UNIQUE INDEX");

    let using = def.find(" USING ").map(|pos| {
        let rest = &def[pos + " USING ".len()..];
        rest.split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches('(')
            .to_string()
    });

    let open = def
        .find('(')
        .ok_or_else(|| format!("no column list in index definition: {}", def))?;
    let mut depth = 0usize;
    let mut close = None;
    for (i, ch) in def[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close.ok_or_else(|| format!("unbalanced column list in index definition: {}", def))?;

    let list = &def[open + 1..close];
    let mut columns = Vec::new();
    let mut item = String::new();
    let mut item_depth = 0usize;
    for ch in list.chars() {
        match ch {
            '(' => {
                item_depth += 1;
                item.push(ch);
            }
            ')' => {
                item_depth -= 1;
                item.push(ch);
            }
            ',' if item_depth == 0 => {
                columns.push(std::mem::take(&mut item));
            }
            _ => item.push(ch),
        }
    }
    if !item.trim().is_empty() {
        columns.push(item);
    }

    let columns = columns
        .iter()
        .map(|c| c.trim().trim_matches('"').to_string())
        .collect();

    Ok((unique, using, columns))
}

/// Strip the `CHECK (...)` wrapper from `pg_get_constraintdef` output.
fn strip_check_wrapper(def: &str) -> String {
    let trimmed = def.trim();
    if let Some(rest) = trimmed.strip_prefix("CHECK") {
        let rest = rest.trim();
        if rest.starts_with('(') && rest.ends_with(')') {
            return rest[1..rest.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

fn parse_trigger_timing(raw: &str) -> Option<TriggerTiming> {
    match raw.to_uppercase().as_str() {
        "BEFORE" => Some(TriggerTiming::Before),
        "AFTER" => Some(TriggerTiming::After),
        _ => None,
    }
}

fn parse_trigger_event(raw: &str) -> Option<TriggerEvent> {
    match raw.to_uppercase().as_str() {
        "INSERT" => Some(TriggerEvent::Insert),
        "UPDATE" => Some(TriggerEvent::Update),
        "DELETE" => Some(TriggerEvent::Delete),
        _ => None,
    }
}

fn build_tls_config() -> ClientConfig {
    warn!("ssl=true: TLS enabled but server certificate is not verified.");
    ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerifier))
        .with_no_client_auth()
}

/// Certificate verifier that accepts any certificate. Catalog introspection
/// commonly targets dev databases with self-signed certificates; `ssl=true`
/// opts into transport encryption without verification.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
