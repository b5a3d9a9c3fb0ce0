//! # Compiled Predicates
//!
//! A predicate is an ordered conjunction of clause fragments plus the
//! positional parameters its `?` placeholders bind to. Clause text is only
//! ever assembled from fixed column names, fixed operators and placeholders.
//! User-supplied values travel exclusively through [`Param`]s.

use serde::Serialize;

/// Positional placeholder marker.
pub const PLACEHOLDER: char = '?';

/// A single bound value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Param {
    UInt(u64),
    Text(String),
}

impl From<u64> for Param {
    fn from(v: u64) -> Self {
        Param::UInt(v)
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::UInt(v) => write!(f, "{}", v),
            Param::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// Comparison operators a clause may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        }
    }
}

/// A filter ready to hand to a store.
///
/// # Invariant
///
/// The number of [`PLACEHOLDER`]s across all clauses equals `params.len()`,
/// and the n-th placeholder binds the n-th parameter. [`PredicateBuilder`] is
/// the only way to construct one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledPredicate {
    clauses: Vec<String>,
    params: Vec<Param>,
}

impl CompiledPredicate {
    /// The unconditional predicate.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Filter text: empty for match-all, otherwise `WHERE a AND b ...`.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Count of placeholders in the clause text.
    pub fn placeholder_count(&self) -> usize {
        self.clauses
            .iter()
            .map(|c| c.matches(PLACEHOLDER).count())
            .sum()
    }
}

impl std::fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        write!(f, "{} [{}]", self.where_clause(), params.join(", "))
    }
}

/// Accumulates clauses for a single compilation.
///
/// Columns are `&'static str`, so callers cannot splice runtime text into the
/// predicate.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    clauses: Vec<String>,
    params: Vec<Param>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = false`, no parameter.
    pub fn is_false(mut self, column: &'static str) -> Self {
        self.clauses.push(format!("{} = false", column));
        self
    }

    /// `column BETWEEN ? AND ?`
    pub fn between(mut self, column: &'static str, low: u64, high: u64) -> Self {
        self.clauses.push(format!("{} BETWEEN ? AND ?", column));
        self.params.push(Param::UInt(low));
        self.params.push(Param::UInt(high));
        self
    }

    /// `column LIKE ?` with the needle wrapped in `%` on both sides.
    ///
    /// `%` and `_` inside the needle are not escaped and keep their LIKE
    /// meaning, so `a_b` also matches `axb`.
    pub fn contains(mut self, column: &'static str, needle: &str) -> Self {
        self.clauses.push(format!("{} LIKE ?", column));
        self.params.push(Param::Text(format!("%{}%", needle)));
        self
    }

    /// `column {op} ?`
    pub fn compare(mut self, column: &'static str, op: CompareOp, value: impl Into<Param>) -> Self {
        self.clauses.push(format!("{} {} ?", column, op.as_sql()));
        self.params.push(value.into());
        self
    }

    /// `column IN (?, ?, ...)`, one placeholder per value. No clause when
    /// `values` is empty.
    pub fn in_list<I, P>(mut self, column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let before = self.params.len();
        self.params.extend(values.into_iter().map(Into::into));
        let added = self.params.len() - before;
        if added > 0 {
            let placeholders = vec!["?"; added].join(", ");
            self.clauses.push(format!("{} IN ({})", column, placeholders));
        }
        self
    }

    pub fn build(self) -> CompiledPredicate {
        CompiledPredicate {
            clauses: self.clauses,
            params: self.params,
        }
    }
}
