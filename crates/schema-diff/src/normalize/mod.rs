//! Schema model normalization.
//!
//! Reduces superficial cross-dialect noise so the differ only reports
//! meaningful deltas: name case folding, type-synonym collapse, default
//! canonicalization, whitespace normalization, and stable ordering. The
//! pass is pure; the input model is never mutated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::schema::SchemaModel;

/// Name case folding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStrategy {
    /// Keep names exactly as the catalog reported them.
    Preserve,
    /// Fold to lowercase.
    #[default]
    Lower,
    /// Fold to uppercase.
    Upper,
}

/// Name case folding configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameCase {
    /// Folding strategy.
    pub strategy: CaseStrategy,

    /// Literal names that bypass folding.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl NameCase {
    fn apply(&self, name: &str) -> String {
        if self.ignore.iter().any(|n| n == name) {
            return name.to_string();
        }
        match self.strategy {
            CaseStrategy::Preserve => name.to_string(),
            CaseStrategy::Lower => name.to_lowercase(),
            CaseStrategy::Upper => name.to_uppercase(),
        }
    }
}

/// Normalization options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Name case folding; lowercase by default.
    #[serde(default)]
    pub name_case: NameCase,

    /// Opt-in default-expression canonicalization.
    #[serde(default)]
    pub normalize_defaults: bool,

    /// User-supplied type synonyms, merged over the built-in map.
    #[serde(default)]
    pub map_types: BTreeMap<String, String>,
}

/// Built-in dialect synonym collapse. Keys are matched case-insensitively;
/// the canonical form is always lowercase.
const TYPE_SYNONYMS: &[(&str, &str)] = &[
    ("double precision", "double"),
    ("character varying", "varchar"),
    ("timestamp without time zone", "timestamp"),
    ("timestamp with time zone", "timestamptz"),
    ("integer", "int"),
    ("int4", "int"),
    ("int8", "bigint"),
    ("int2", "smallint"),
    ("tinyint(1)", "boolean"),
    ("bool", "boolean"),
    ("bit(1)", "boolean"),
];

/// Collapse a data type to its canonical token.
fn canonical_type(raw: &str, user_map: &BTreeMap<String, String>) -> String {
    let lowered = raw.to_lowercase();
    if let Some(mapped) = user_map
        .iter()
        .find(|(k, _)| k.to_lowercase() == lowered)
        .map(|(_, v)| v)
    {
        return mapped.to_lowercase();
    }
    for (synonym, canonical) in TYPE_SYNONYMS {
        if *synonym == lowered {
            return (*canonical).to_string();
        }
    }
    lowered
}

/// Canonicalize a default expression: trim, strip fully-wrapping parentheses
/// iteratively, and replace `now()` with `CURRENT_TIMESTAMP`.
fn canonical_default(raw: &str) -> String {
    let mut expr = raw.trim().to_string();

    loop {
        let trimmed = expr.trim();
        if trimmed.len() < 2 || !trimmed.starts_with('(') || !trimmed.ends_with(')') {
            break;
        }
        let inner = &trimmed[1..trimmed.len() - 1];
        if inner.trim().is_empty() || !parens_balanced(inner) {
            break;
        }
        expr = inner.trim().to_string();
    }

    if expr.eq_ignore_ascii_case("now()") {
        return "CURRENT_TIMESTAMP".to_string();
    }
    expr
}

/// Whether the parentheses inside `expr` balance without ever closing below
/// depth zero. Guards the outer-paren strip against `(a) + (b)`.
fn parens_balanced(expr: &str) -> bool {
    let mut depth = 0i32;
    for ch in expr.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Collapse whitespace runs to single spaces and trim.
pub(crate) fn collapse_whitespace(expr: &str) -> String {
    expr.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a schema model. The input is cloned; every operation applies to
/// the copy. Idempotent: normalizing a normalized model is a no-op.
pub fn normalize_schema(model: &SchemaModel, opts: &NormalizeOptions) -> SchemaModel {
    let mut out = model.clone();
    let case = &opts.name_case;

    for table in &mut out.tables {
        table.name = case.apply(&table.name);

        for column in &mut table.columns {
            column.name = case.apply(&column.name);
            column.data_type = canonical_type(&column.data_type, &opts.map_types);
            if opts.normalize_defaults {
                column.default = column.default.as_deref().map(canonical_default);
            }
        }

        if let Some(pk) = &mut table.primary_key {
            pk.name = pk.name.as_deref().map(|n| case.apply(n));
            for column in &mut pk.columns {
                *column = case.apply(column);
            }
        }

        for index in &mut table.indexes {
            index.name = case.apply(&index.name);
            for column in &mut index.columns {
                *column = case.apply(column);
            }
        }

        for check in &mut table.checks {
            check.name = case.apply(&check.name);
            check.expression = collapse_whitespace(&check.expression);
        }

        for fk in &mut table.foreign_keys {
            fk.name = case.apply(&fk.name);
            for column in &mut fk.columns {
                *column = case.apply(column);
            }
            fk.referenced_table = case.apply(&fk.referenced_table);
            for column in &mut fk.referenced_columns {
                *column = case.apply(column);
            }
            fk.on_update = fk.on_update.as_deref().map(|a| a.to_uppercase());
            fk.on_delete = fk.on_delete.as_deref().map(|a| a.to_uppercase());
        }
    }

    for view in &mut out.views {
        view.name = case.apply(&view.name);
    }
    for routine in &mut out.routines {
        routine.name = case.apply(&routine.name);
    }
    for trigger in &mut out.triggers {
        trigger.table = case.apply(&trigger.table);
        trigger.name = case.apply(&trigger.name);
        trigger.events.sort();
        trigger.events.dedup();
    }

    // Stable ordering for reproducible output. Tables and their nested
    // collections keep catalog order; the differ keys them by name.
    out.views.sort_by_key(|v| v.name.to_lowercase());
    out.routines
        .sort_by(|a, b| (a.kind, a.name.to_lowercase()).cmp(&(b.kind, b.name.to_lowercase())));
    out.triggers.sort_by(|a, b| {
        (a.table.to_lowercase(), a.name.to_lowercase())
            .cmp(&(b.table.to_lowercase(), b.name.to_lowercase()))
    });

    out
}
