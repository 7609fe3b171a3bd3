//! The closed query-operator set and `where` tree described in spec §6.
//!
//! The wire encoding uses bracketed keys (`where[and][0][field][equals]=value`),
//! the same shape the teacher's backend façade uses for its own flat request
//! bodies — here the tree is recursive instead of flat because `find` needs to
//! express `and`/`or` combinators, not just a single job-state filter.

use serde_json::Value;

/// One of the closed set of comparators the coordinator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Contains,
    Like,
    In,
    Exists,
    Near,
}

impl Operator {
    fn as_wire(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanEqual => "greater_than_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanEqual => "less_than_equal",
            Operator::Contains => "contains",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Exists => "exists",
            Operator::Near => "near",
        }
    }
}

/// A single field comparator, e.g. `status equals "pending"`.
#[derive(Debug, Clone)]
pub struct Compare {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Compare {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Compare(Self::new(field, Operator::Equals, value))
    }

    pub fn in_set(field: impl Into<String>, values: impl Into<Value>) -> Where {
        Where::Compare(Self::new(field, Operator::In, values))
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Where {
        Where::Compare(Self::new(field, Operator::Exists, exists))
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Compare(Self::new(field, Operator::LessThan, value))
    }

    pub fn greater_than_equal(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Compare(Self::new(field, Operator::GreaterThanEqual, value))
    }
}

/// A tree of `and`/`or` combinators over field comparators.
#[derive(Debug, Clone)]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Compare(Compare),
}

impl Where {
    pub fn and(clauses: impl IntoIterator<Item = Where>) -> Self {
        Where::And(clauses.into_iter().collect())
    }

    pub fn or(clauses: impl IntoIterator<Item = Where>) -> Self {
        Where::Or(clauses.into_iter().collect())
    }

    /// Flatten this tree into `(bracket-key, value)` query pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.collect_pairs("where", &mut out);
        out
    }

    fn collect_pairs(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        match self {
            Where::Compare(cmp) => {
                let key = format!("{prefix}[{}][{}]", cmp.field, cmp.op.as_wire());
                out.push((key, value_to_wire(&cmp.value)));
            }
            Where::And(items) => combinator_pairs(prefix, "and", items, out),
            Where::Or(items) => combinator_pairs(prefix, "or", items, out),
        }
    }
}

fn combinator_pairs(prefix: &str, name: &str, items: &[Where], out: &mut Vec<(String, String)>) {
    for (idx, item) in items.iter().enumerate() {
        let nested_prefix = format!("{prefix}[{name}][{idx}]");
        item.collect_pairs(&nested_prefix, out);
    }
}

fn value_to_wire(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_to_wire).collect::<Vec<_>>().join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_compare_encodes_bracket_key() {
        let w = Compare::equals("status", "pending");
        let pairs = w.to_query_pairs();
        assert_eq!(pairs, vec![("where[status][equals]".to_string(), "pending".to_string())]);
    }

    #[test]
    fn and_or_nest_with_index_brackets() {
        let w = Where::and([
            Compare::equals("status", "in_progress"),
            Where::or([Compare::exists("claimedBy", false), Compare::less_than("claimedAt", 100)]),
        ]);
        let pairs = w.to_query_pairs();
        assert_eq!(pairs[0].0, "where[and][0][status][equals]");
        assert_eq!(pairs[1].0, "where[and][1][or][0][claimedBy][exists]");
        assert_eq!(pairs[2].0, "where[and][1][or][1][claimedAt][less_than]");
    }

    #[test]
    fn in_set_joins_values_with_comma() {
        let w = Compare::in_set("type", vec!["selected_urls", "selected_gtins"]);
        let pairs = w.to_query_pairs();
        assert_eq!(pairs[0].1, "selected_urls,selected_gtins");
    }
}
