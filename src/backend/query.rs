//! PostgREST-style query builder for the backend table API
//!
//! Renders column filters (`eq.`, `neq.`, `in.()`, `gte.`), ordering strings
//! such as `decision_priority.asc,is_overdue.desc`, and paging as the query
//! parameters the table endpoint expects.

use std::fmt;

/// A single column filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String),
    Neq(String),
    In(Vec<String>),
    Gte(String),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq(v) => write!(f, "eq.{}", v),
            Filter::Neq(v) => write!(f, "neq.{}", v),
            Filter::In(values) => write!(f, "in.({})", values.join(",")),
            Filter::Gte(v) => write!(f, "gte.{}", v),
        }
    }
}

/// Sort direction for one ordering term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Query against one backend table or view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    filters: Vec<(String, Filter)>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, filter: Filter) -> Self {
        self.filters.push((column.into(), filter));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Filter::Eq(value.to_string()))
    }

    pub fn neq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Filter::Neq(value.to_string()))
    }

    pub fn gte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, Filter::Gte(value.to_string()))
    }

    pub fn is_in<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(column, Filter::In(values))
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter value for a column, if one was set
    pub fn filter_for(&self, column: &str) -> Option<&Filter> {
        self.filters
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| f)
    }

    /// The ordering string, e.g. `decision_priority.asc,is_overdue.desc`
    pub fn order_string(&self) -> Option<String> {
        if self.order.is_empty() {
            return None;
        }
        Some(
            self.order
                .iter()
                .map(|(c, d)| format!("{}.{}", c, d.as_str()))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Render as query parameters, in a stable order
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for (column, filter) in &self.filters {
            params.push((column.clone(), filter.to_string()));
        }
        if let Some(order) = self.order_string() {
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_rendering() {
        assert_eq!(Filter::Eq("3".into()).to_string(), "eq.3");
        assert_eq!(Filter::Neq("completed".into()).to_string(), "neq.completed");
        assert_eq!(Filter::Gte("7".into()).to_string(), "gte.7");
        assert_eq!(
            Filter::In(vec!["urgent".into(), "high".into()]).to_string(),
            "in.(urgent,high)"
        );
    }

    #[test]
    fn test_queue_style_params() {
        let query = TableQuery::new()
            .eq("branch_id", 2)
            .is_in("decision_priority", ["urgent", "high"])
            .order("decision_priority", Direction::Asc)
            .order("is_overdue", Direction::Desc)
            .limit(50);

        assert_eq!(
            query.to_params(),
            vec![
                ("branch_id".to_string(), "eq.2".to_string()),
                (
                    "decision_priority".to_string(),
                    "in.(urgent,high)".to_string()
                ),
                (
                    "order".to_string(),
                    "decision_priority.asc,is_overdue.desc".to_string()
                ),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_query_has_no_params() {
        assert!(TableQuery::new().to_params().is_empty());
        assert_eq!(TableQuery::new().order_string(), None);
    }

    #[test]
    fn test_filter_for() {
        let query = TableQuery::new().gte("overdue_days", 3).limit(20);
        assert_eq!(
            query.filter_for("overdue_days"),
            Some(&Filter::Gte("3".into()))
        );
        assert_eq!(query.filter_for("branch_id"), None);
        assert!(query
            .to_params()
            .contains(&("limit".to_string(), "20".to_string())));
    }
}
