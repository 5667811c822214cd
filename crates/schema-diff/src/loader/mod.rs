//! Catalog loaders: one adapter per supported engine.
//!
//! Each loader connects to the target database, runs a fixed sequence of
//! catalog queries, and assembles a [`SchemaModel`] incrementally. The
//! dialects differ in catalog layout (column names, identity vs
//! auto-increment, index rows vs index definition text), which is why each
//! engine gets its own adapter behind the common [`SchemaLoader`] trait.

pub mod mariadb;
pub mod postgres;

pub use mariadb::MariadbLoader;
pub use postgres::PostgresLoader;

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{ConnectionRef, EngineKind};
use crate::core::schema::SchemaModel;
use crate::error::{DiffError, Result};

/// Connection cap per catalog load, to avoid overwhelming small databases
/// during introspection.
pub(crate) const MAX_CATALOG_CONNECTIONS: usize = 2;

/// A catalog adapter that introspects one schema into a model.
#[async_trait]
pub trait SchemaLoader: Send + Sync {
    /// Engine tag ("postgres" or "mariadb").
    fn engine(&self) -> &str;

    /// Introspect the named schema. Aborts at the next query boundary when
    /// `cancel` fires; a partial model is never returned.
    async fn load(&self, schema: &str, cancel: &CancellationToken) -> Result<SchemaModel>;
}

/// Load the schema named by `conn`, dispatching on the connection kind.
pub async fn load_schema(conn: &ConnectionRef, cancel: &CancellationToken) -> Result<SchemaModel> {
    conn.validate()?;
    match conn.kind {
        EngineKind::Postgres => {
            let loader = PostgresLoader::connect(conn).await?;
            loader.load(&conn.schema, cancel).await
        }
        EngineKind::Mariadb => {
            let loader = MariadbLoader::connect(conn).await?;
            loader.load(&conn.schema, cancel).await
        }
    }
}

/// Load a PostgreSQL schema without external cancellation.
pub async fn load_postgres(conn: &ConnectionRef) -> Result<SchemaModel> {
    conn.validate()?;
    let loader = PostgresLoader::connect(conn).await?;
    loader.load(&conn.schema, &CancellationToken::new()).await
}

/// Load a MariaDB schema without external cancellation.
pub async fn load_mariadb(conn: &ConnectionRef) -> Result<SchemaModel> {
    conn.validate()?;
    let loader = MariadbLoader::connect(conn).await?;
    loader.load(&conn.schema, &CancellationToken::new()).await
}

/// Exact decimal types whose precision/scale is user-chosen. Both catalogs
/// report a precision for every numeric type (32 or 10 for plain integers),
/// so only these carry one worth modeling.
pub(crate) fn is_decimal_type(data_type: &str) -> bool {
    matches!(
        data_type.to_lowercase().as_str(),
        "numeric" | "decimal" | "dec" | "fixed"
    )
}

/// Run a catalog query under the cancellation token. Cancellation wins the
/// race and surfaces as [`DiffError::Cancelled`].
pub(crate) async fn guarded<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(DiffError::Cancelled),
        result = fut => result,
    }
}
