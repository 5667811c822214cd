//! # schema-diff
//!
//! Schema comparison engine for PostgreSQL and MariaDB.
//!
//! The engine is a linear pipeline over two live catalogs:
//!
//! 1. **Load** — introspect each catalog into a dialect-neutral
//!    [`SchemaModel`]
//! 2. **Normalize** — fold away superficial cross-dialect differences
//! 3. **Diff** — compute a structured, symmetric [`DiffResult`]
//! 4. **Generate** — render a dialect-specific migration script with safety
//!    policies (transaction bracket, safe-mode commenting, cascade,
//!    if-exists)
//!
//! Every stage after loading is a deterministic pure function.
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_diff::{
//!     compare_refs, to_postgres, ConnectionRef, Direction, GenerateOptions, NormalizeOptions,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), schema_diff::DiffError> {
//!     let from = ConnectionRef::from_url("postgres://app:pw@db-a/orders?schema=public")?;
//!     let to = ConnectionRef::from_url("mariadb://app:pw@db-b/orders?schema=orders")?;
//!
//!     let diff = compare_refs(&from, &to, &NormalizeOptions::default(), &CancellationToken::new()).await?;
//!     let script = to_postgres(&diff, &GenerateOptions {
//!         direction: Direction::AtoB,
//!         with_transaction: true,
//!         safe_mode: true,
//!         ..GenerateOptions::default()
//!     });
//!     println!("{}", script);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod diff;
pub mod error;
pub mod generate;
pub mod loader;
pub mod normalize;
pub mod orchestrator;

// Re-exports for convenient access
pub use config::{ConnectionRef, EngineKind};
pub use crate::core::schema::{
    Check, Column, ForeignKey, Generated, Index, PrimaryKey, Routine, RoutineKind, SchemaModel,
    Table, Trigger, TriggerEvent, TriggerTiming, View,
};
pub use diff::{compute_diff, ColumnChange, Delta, DiffResult, DiffSummary, TableChange};
pub use error::{DiffError, Result};
pub use generate::{to_mariadb, to_postgres, Direction, GenerateOptions};
pub use loader::{load_mariadb, load_postgres, load_schema, SchemaLoader};
pub use normalize::{normalize_schema, CaseStrategy, NameCase, NormalizeOptions};
pub use orchestrator::compare_refs;
