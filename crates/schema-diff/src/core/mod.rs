//! Core abstractions shared by every pipeline stage.
//!
//! - [`schema`]: dialect-neutral table, column, and constraint metadata
//! - [`identifier`]: per-dialect identifier quoting for generated DDL

pub mod identifier;
pub mod schema;

pub use schema::{
    Check, Column, ForeignKey, Generated, Index, PrimaryKey, Routine, RoutineKind, SchemaModel,
    Table, Trigger, TriggerEvent, TriggerTiming, View,
};
