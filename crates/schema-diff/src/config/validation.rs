//! Connection descriptor validation.

use super::{ConnectionRef, EngineKind};
use crate::error::{DiffError, Result};

/// Catalog schemas the loader refuses to introspect.
const POSTGRES_SYSTEM_SCHEMAS: &[&str] =
    &["pg_catalog", "information_schema", "pg_toast", "pg_internal"];
const MARIADB_SYSTEM_SCHEMAS: &[&str] =
    &["mysql", "performance_schema", "information_schema", "sys"];

/// Whether `schema` is a system schema for the given engine.
pub fn is_system_schema(kind: EngineKind, schema: &str) -> bool {
    let list = match kind {
        EngineKind::Postgres => POSTGRES_SYSTEM_SCHEMAS,
        EngineKind::Mariadb => MARIADB_SYSTEM_SCHEMAS,
    };
    list.iter().any(|s| schema.eq_ignore_ascii_case(s))
}

/// Validate a connection descriptor.
pub fn validate(conn: &ConnectionRef) -> Result<()> {
    if conn.host.is_empty() {
        return Err(DiffError::Config("connection host is required".into()));
    }
    if conn.database.is_empty() {
        return Err(DiffError::Config("connection database is required".into()));
    }
    if conn.user.is_empty() {
        return Err(DiffError::Config("connection user is required".into()));
    }
    if conn.schema.is_empty() {
        return Err(DiffError::Config(
            "schema is required (pass ?schema=NAME in the URL or use --schema)".into(),
        ));
    }
    if is_system_schema(conn.kind, &conn.schema) {
        return Err(DiffError::Config(format!(
            "refusing to introspect system schema '{}'",
            conn.schema
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_ref() -> ConnectionRef {
        ConnectionRef {
            kind: EngineKind::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            schema: "public".to_string(),
            user: "app".to_string(),
            password: "secret".to_string(),
            ssl: false,
        }
    }

    #[test]
    fn test_valid_ref() {
        assert!(validate(&valid_ref()).is_ok());
    }

    #[test]
    fn test_missing_schema() {
        let mut conn = valid_ref();
        conn.schema = String::new();
        assert!(validate(&conn).is_err());
    }

    #[test]
    fn test_system_schema_refused() {
        let mut conn = valid_ref();
        conn.schema = "pg_catalog".to_string();
        let err = validate(&conn).unwrap_err();
        assert!(matches!(err, DiffError::Config(_)));

        conn.kind = EngineKind::Mariadb;
        conn.schema = "Performance_Schema".to_string();
        assert!(validate(&conn).is_err());
    }

    #[test]
    fn test_system_schema_lists_are_per_engine() {
        // `sys` is only a system schema on MariaDB.
        assert!(is_system_schema(EngineKind::Mariadb, "sys"));
        assert!(!is_system_schema(EngineKind::Postgres, "sys"));
        assert!(is_system_schema(EngineKind::Postgres, "pg_toast"));
        assert!(!is_system_schema(EngineKind::Mariadb, "pg_toast"));
    }
}
