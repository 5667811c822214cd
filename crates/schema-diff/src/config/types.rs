//! Connection descriptor types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DiffError;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// PostgreSQL.
    Postgres,
    /// MariaDB.
    Mariadb,
}

impl EngineKind {
    /// Lowercase engine tag as it appears in connection URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::Mariadb => "mariadb",
        }
    }

    /// Default port when the URL does not carry one.
    pub fn default_port(&self) -> u16 {
        match self {
            EngineKind::Postgres => 5432,
            EngineKind::Mariadb => 3306,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(EngineKind::Postgres),
            "mariadb" => Ok(EngineKind::Mariadb),
            other => Err(DiffError::Config(format!(
                "unsupported dialect '{}' (expected 'postgres' or 'mariadb')",
                other
            ))),
        }
    }
}

/// Connection descriptor for one side of a comparison.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionRef {
    /// Database engine.
    pub kind: EngineKind,

    /// Database host.
    pub host: String,

    /// Database port.
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Schema to introspect.
    pub schema: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Enable TLS.
    #[serde(default)]
    pub ssl: bool,
}

impl fmt::Debug for ConnectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRef")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl", &self.ssl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_from_str() {
        assert_eq!("postgres".parse::<EngineKind>().unwrap(), EngineKind::Postgres);
        assert_eq!("postgresql".parse::<EngineKind>().unwrap(), EngineKind::Postgres);
        assert_eq!("MariaDB".parse::<EngineKind>().unwrap(), EngineKind::Mariadb);
        assert!("mssql".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(EngineKind::Postgres.default_port(), 5432);
        assert_eq!(EngineKind::Mariadb.default_port(), 3306);
    }

    #[test]
    fn test_debug_redacts_password() {
        let conn = ConnectionRef {
            kind: EngineKind::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            schema: "public".to_string(),
            user: "app".to_string(),
            password: "super_secret_password_123".to_string(),
            ssl: false,
        };
        let debug_output = format!("{:?}", conn);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }
}
