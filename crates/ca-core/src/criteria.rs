//! # Filter Criteria & Compiler
//!
//! Validates raw search parameters into a typed [`FilterCriteria`], then
//! compiles that into a [`CompiledPredicate`].
//!
//! Recognized parameters:
//!
//! | Name         | Values | Effect                                     |
//! |--------------|--------|--------------------------------------------|
//! | `duplicates` | one    | `"true"` keeps duplicate reports           |
//! | `min`, `max` | one    | inclusive report-id range                  |
//! | `message`    | one    | substring of the crash message             |
//! | `errortype`  | one    | substring of the error type                |
//! | `cause`      | many   | `core`, `plugin`, `plugin_indirect`        |
//! | `plugin`     | one    | exact blamed plugin name                   |
//! | `build`      | one    | build number, compared with `buildtype`    |
//! | `buildtype`  | one    | `greater`, `less`, anything else is equal  |
//! | `versions`   | many   | acceptable version strings                 |
//!
//! Anything else is ignored.

use crate::error::{QueryError, QueryResult};
use crate::params::RawParams;
use crate::predicate::{CompareOp, CompiledPredicate, PredicateBuilder};
use crate::report::Involvement;

/// How a build number is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildComparator {
    #[default]
    Equal,
    Greater,
    Less,
}

impl BuildComparator {
    /// `"greater"` and `"less"` select an ordering; anything else, including
    /// absence, means equality.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("greater") => Self::Greater,
            Some("less") => Self::Less,
            _ => Self::Equal,
        }
    }

    fn op(&self) -> CompareOp {
        match self {
            Self::Equal => CompareOp::Eq,
            Self::Greater => CompareOp::Gt,
            Self::Less => CompareOp::Lt,
        }
    }
}

/// Build-number constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildFilter {
    pub number: u64,
    pub comparator: BuildComparator,
}

/// Inclusive id range. Construct through [`IdRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    min: u64,
    max: u64,
}

impl IdRange {
    /// Returns `None` when `min > max`.
    pub fn new(min: u64, max: u64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

/// A validated set of search constraints. Every field is independent; an
/// absent field places no constraint on its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub include_duplicates: bool,
    pub id_range: Option<IdRange>,
    pub message: Option<String>,
    pub error_type: Option<String>,
    /// Input order, not deduplicated.
    pub involvement: Vec<Involvement>,
    pub plugin: Option<String>,
    pub build: Option<BuildFilter>,
    /// Input order, not deduplicated.
    pub versions: Vec<String>,
}

impl FilterCriteria {
    /// Validate raw parameters.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidParameter`] on a non-integer `min`/`max`/`build`,
    /// on `min > max`, and on an unknown `cause` token.
    pub fn from_params(params: &RawParams) -> QueryResult<Self> {
        let include_duplicates = params.get("duplicates") == Some("true");

        let id_range = if params.get_non_empty("min").is_some()
            || params.get_non_empty("max").is_some()
        {
            let min = parse_uint_param(params, "min", 0)?;
            let max = parse_uint_param(params, "max", u64::MAX)?;
            let range = IdRange::new(min, max)
                .ok_or_else(|| QueryError::invalid("Invalid min/max ID bounds"))?;
            Some(range)
        } else {
            None
        };

        let involvement = params
            .get_all("cause")
            .iter()
            .map(|cause| {
                Involvement::from_cause(cause)
                    .ok_or_else(|| QueryError::invalid(format!("Invalid cause filter {}", cause)))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let build = match params.get_non_empty("build") {
            Some(_) => Some(BuildFilter {
                number: parse_uint_param(params, "build", u64::MAX)?,
                comparator: BuildComparator::from_param(params.get("buildtype")),
            }),
            None => None,
        };

        Ok(Self {
            include_duplicates,
            id_range,
            message: params.get_non_empty("message").map(str::to_string),
            error_type: params.get_non_empty("errortype").map(str::to_string),
            involvement,
            plugin: params.get_non_empty("plugin").map(str::to_string),
            build,
            versions: params.get_all("versions").to_vec(),
        })
    }

    /// Compile into a predicate. Clause order is fixed, so equal criteria
    /// always produce identical text and parameters.
    pub fn compile(&self) -> CompiledPredicate {
        let mut builder = PredicateBuilder::new();

        if !self.include_duplicates {
            builder = builder.is_false("duplicate");
        }
        if let Some(range) = self.id_range {
            builder = builder.between("id", range.min(), range.max());
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            builder = builder.contains("message", message);
        }
        if let Some(error_type) = self.error_type.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.contains("type", error_type);
        }
        builder = builder.in_list("involvement", self.involvement.iter().map(|i| i.code()));
        if let Some(plugin) = self.plugin.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.compare("plugin", CompareOp::Eq, plugin);
        }
        if let Some(build) = self.build {
            builder = builder.compare("build", build.comparator.op(), build.number);
        }
        builder = builder.in_list("version", self.versions.iter().map(String::as_str));

        builder.build()
    }
}

/// Validate and compile raw parameters in one step.
pub fn compile(params: &RawParams) -> QueryResult<CompiledPredicate> {
    Ok(FilterCriteria::from_params(params)?.compile())
}

fn parse_uint_param(params: &RawParams, name: &str, default: u64) -> QueryResult<u64> {
    match params.get_non_empty(name) {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            QueryError::invalid(format!("Invalid value for search parameter \"{}\"", name))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Param;

    fn compile_pairs(pairs: &[(&str, &str)]) -> QueryResult<CompiledPredicate> {
        compile(&RawParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_no_params_excludes_duplicates_only() {
        let p = compile_pairs(&[]).unwrap();
        assert_eq!(p.where_clause(), "WHERE duplicate = false");
        assert!(p.params().is_empty());
    }

    #[test]
    fn test_duplicates_true_drops_clause() {
        let p = compile_pairs(&[("duplicates", "true")]).unwrap();
        assert!(p.is_match_all());
        assert_eq!(p.where_clause(), "");
    }

    #[test]
    fn test_duplicates_must_be_exact_literal() {
        for value in ["TRUE", "1", "yes", ""] {
            let p = compile_pairs(&[("duplicates", value)]).unwrap();
            assert_eq!(p.where_clause(), "WHERE duplicate = false", "value {:?}", value);
        }
    }

    #[test]
    fn test_id_range_defaults() {
        let p = compile_pairs(&[("duplicates", "true"), ("min", "10")]).unwrap();
        assert_eq!(p.where_clause(), "WHERE id BETWEEN ? AND ?");
        assert_eq!(p.params(), [Param::UInt(10), Param::UInt(u64::MAX)]);

        let p = compile_pairs(&[("duplicates", "true"), ("max", "99")]).unwrap();
        assert_eq!(p.params(), [Param::UInt(0), Param::UInt(99)]);
    }

    #[test]
    fn test_inverted_id_range_rejected() {
        let err = compile_pairs(&[("min", "10"), ("max", "5")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_equal_id_bounds_accepted() {
        let p = compile_pairs(&[("min", "7"), ("max", "7")]).unwrap();
        assert_eq!(p.params(), [Param::UInt(7), Param::UInt(7)]);
    }

    #[test]
    fn test_non_numeric_ids_rejected() {
        for (name, value) in [("min", "abc"), ("max", "-1"), ("min", "1.5")] {
            let err = compile_pairs(&[(name, value)]).unwrap_err();
            assert!(matches!(err, QueryError::InvalidParameter(_)), "{}={}", name, value);
        }
    }

    #[test]
    fn test_empty_bounds_mean_absent() {
        let p = compile_pairs(&[("min", ""), ("max", "")]).unwrap();
        assert_eq!(p.where_clause(), "WHERE duplicate = false");
    }

    #[test]
    fn test_empty_values_mean_absent() {
        let p = compile_pairs(&[
            ("build", ""),
            ("buildtype", "greater"),
            ("message", ""),
            ("errortype", ""),
            ("plugin", ""),
        ])
        .unwrap();
        assert_eq!(p.where_clause(), "WHERE duplicate = false");
        assert!(p.params().is_empty());
    }

    #[test]
    fn test_overflowing_integers_rejected() {
        for (name, value) in [("max", "18446744073709551616"), ("build", "99999999999999999999")] {
            let err = compile_pairs(&[(name, value)]).unwrap_err();
            assert!(matches!(err, QueryError::InvalidParameter(_)), "{}={}", name, value);
        }
    }

    #[test]
    fn test_substring_filters() {
        let p = compile_pairs(&[
            ("duplicates", "true"),
            ("message", "Call to undefined"),
            ("errortype", "Error"),
        ])
        .unwrap();
        assert_eq!(p.where_clause(), "WHERE message LIKE ? AND type LIKE ?");
        assert_eq!(
            p.params(),
            [Param::from("%Call to undefined%"), Param::from("%Error%")]
        );
    }

    #[test]
    fn test_cause_plugin_maps_to_direct() {
        let p = compile_pairs(&[("duplicates", "true"), ("cause", "plugin")]).unwrap();
        assert_eq!(p.where_clause(), "WHERE involvement IN (?)");
        assert_eq!(p.params(), [Param::from(Involvement::Direct.code())]);
    }

    #[test]
    fn test_unknown_cause_rejected() {
        let err = compile_pairs(&[("cause", "bogus")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));

        let err = compile_pairs(&[("cause", "core"), ("cause", "")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_causes_keep_order_and_repeats() {
        let p = compile_pairs(&[
            ("duplicates", "true"),
            ("cause", "plugin_indirect"),
            ("cause", "core"),
            ("cause", "core"),
        ])
        .unwrap();
        assert_eq!(p.where_clause(), "WHERE involvement IN (?, ?, ?)");
        assert_eq!(
            p.params(),
            [
                Param::from("indirect"),
                Param::from("none"),
                Param::from("none")
            ]
        );
    }

    #[test]
    fn test_build_comparators() {
        let cases = [
            (Some("greater"), "WHERE build > ?"),
            (Some("less"), "WHERE build < ?"),
            (Some("equal"), "WHERE build = ?"),
            (Some("sideways"), "WHERE build = ?"),
            (None, "WHERE build = ?"),
        ];
        for (buildtype, expected) in cases {
            let mut params = RawParams::from_pairs([("duplicates", "true"), ("build", "100")]);
            if let Some(t) = buildtype {
                params.push("buildtype", t);
            }
            let p = compile(&params).unwrap();
            assert_eq!(p.where_clause(), expected);
            assert_eq!(p.params(), [Param::UInt(100)]);
        }
    }

    #[test]
    fn test_bad_build_rejected() {
        let err = compile_pairs(&[("build", "latest")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_buildtype_without_build_is_ignored() {
        let p = compile_pairs(&[("buildtype", "greater")]).unwrap();
        assert_eq!(p.where_clause(), "WHERE duplicate = false");
    }

    #[test]
    fn test_versions_in_list() {
        let p = compile_pairs(&[
            ("duplicates", "true"),
            ("versions", "1.0"),
            ("versions", "2.0"),
        ])
        .unwrap();
        assert_eq!(p.where_clause(), "WHERE version IN (?, ?)");
        assert_eq!(p.params(), [Param::from("1.0"), Param::from("2.0")]);
    }

    #[test]
    fn test_full_clause_order() {
        let p = compile_pairs(&[
            ("versions", "3.0"),
            ("build", "5"),
            ("buildtype", "less"),
            ("plugin", "EconomyAPI"),
            ("cause", "plugin"),
            ("errortype", "TypeError"),
            ("message", "null"),
            ("max", "500"),
            ("min", "100"),
        ])
        .unwrap();
        assert_eq!(
            p.where_clause(),
            "WHERE duplicate = false AND id BETWEEN ? AND ? AND message LIKE ? \
             AND type LIKE ? AND involvement IN (?) AND plugin = ? AND build < ? \
             AND version IN (?)"
        );
        assert_eq!(p.placeholder_count(), p.params().len());
    }

    #[test]
    fn test_unrecognized_params_ignored() {
        let p = compile_pairs(&[("sort", "asc"), ("page", "3"), ("colour", "blue")]).unwrap();
        assert_eq!(p, compile_pairs(&[]).unwrap());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let pairs = [
            ("cause", "core"),
            ("versions", "1.0"),
            ("message", "x"),
            ("min", "1"),
            ("cause", "plugin"),
            ("build", "9"),
        ];
        let first = compile_pairs(&pairs).unwrap();
        for _ in 0..10 {
            let again = compile_pairs(&pairs).unwrap();
            assert_eq!(again.where_clause(), first.where_clause());
            assert_eq!(again.params(), first.params());
        }
    }

    #[test]
    fn test_placeholder_arity_over_many_inputs() {
        let causes = ["core", "plugin", "plugin_indirect"];
        for n_causes in 0..=3 {
            for n_versions in 0..=3 {
                for with_range in [false, true] {
                    let mut params = RawParams::new();
                    for cause in causes.iter().take(n_causes) {
                        params.push("cause", *cause);
                    }
                    for v in 0..n_versions {
                        params.push("versions", format!("{}.0", v));
                    }
                    if with_range {
                        params.push("min", "1");
                    }
                    params.push("plugin", "P");
                    let p = compile(&params).unwrap();
                    assert_eq!(p.placeholder_count(), p.params().len());
                }
            }
        }
    }

    #[test]
    fn test_values_never_enter_clause_text() {
        let evil = "'; DROP TABLE crash_reports; --";
        let p = compile_pairs(&[
            ("message", evil),
            ("errortype", evil),
            ("plugin", evil),
            ("versions", evil),
        ])
        .unwrap();
        assert!(p.clauses().iter().all(|c| !c.contains("DROP")));
    }

    #[test]
    fn test_typed_criteria_compile_directly() {
        let criteria = FilterCriteria {
            include_duplicates: true,
            build: Some(BuildFilter {
                number: 100,
                comparator: BuildComparator::Greater,
            }),
            ..Default::default()
        };
        let p = criteria.compile();
        assert_eq!(p.where_clause(), "WHERE build > ?");
    }
}
