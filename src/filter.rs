// Query filtering on indexed fields

use crate::record::IndexValue;

/// Filter for querying records
///
/// `field` must name an index declared for the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Persisted field name (e.g. "projectId")
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: IndexValue,
}

impl Filter {
    pub fn new(field: &str, op: FilterOp, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: &str, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn gte(field: &str, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn lte(field: &str, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,  // ==
    Ne,  // != (also matches records without the field)
    Gt,  // >
    Lt,  // <
    Gte, // >=
    Lte, // <=
}

impl FilterOp {
    pub(crate) fn to_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_creation() {
        let filter = Filter::eq("projectId", "p1");

        assert_eq!(filter.field, "projectId");
        assert_eq!(filter.op, FilterOp::Eq);
        assert_eq!(filter.value, IndexValue::String("p1".to_string()));
    }

    #[test]
    fn test_filter_value_conversions() {
        assert_eq!(Filter::eq("isPinned", true).value, IndexValue::Bool(true));
        assert_eq!(Filter::gte("position", 2i64).value, IndexValue::Int(2));
    }

    #[test]
    fn test_filter_op_to_sql() {
        assert_eq!(FilterOp::Eq.to_sql(), "=");
        assert_eq!(FilterOp::Ne.to_sql(), "!=");
        assert_eq!(FilterOp::Gt.to_sql(), ">");
        assert_eq!(FilterOp::Lt.to_sql(), "<");
        assert_eq!(FilterOp::Gte.to_sql(), ">=");
        assert_eq!(FilterOp::Lte.to_sql(), "<=");
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(Filter::eq("status", "todo").to_string(), "status = todo");
        assert_eq!(Filter::lte("dueDate", "2024-01-01").to_string(), "dueDate <= 2024-01-01");
    }
}
