//! Fluent builder for filter/comparison operator documents.
//!
//! Produces the operator objects that `$match` filters and `$cond` branches
//! are written in (`{"$gte": 18}`, `{"$in": [...]}`, ...). Like the stage
//! factories this is pure data assembly: nothing is validated against the
//! server's grammar.

use serde_json::{json, Map, Value};

/// Accumulates comparison operators into a single filter document.
///
/// # Example
///
/// ```rust,ignore
/// let adults = filter().gte(18).lt(65).build();
/// let active = filter().in_(vec![json!("open"), json!("pending")]).build();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOperator {
    operator: Map<String, Value>,
}

/// Create a new filter-operator builder.
pub fn filter() -> FilterOperator {
    FilterOperator::new()
}

impl FilterOperator {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(mut self, operator: &str, value: Value) -> Self {
        self.operator.insert(operator.to_string(), value);
        self
    }

    /// `$eq` equality comparison.
    pub fn eq(self, value: impl Into<Value>) -> Self {
        self.insert("$eq", value.into())
    }

    /// `$eq` expression form comparing a field reference against a value.
    pub fn field_eq(self, field: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.insert("$eq", json!([field.into(), value.into()]))
    }

    /// `$ne` inequality comparison.
    pub fn ne(self, value: impl Into<Value>) -> Self {
        self.insert("$ne", value.into())
    }

    /// `$ne` expression form comparing a field reference against a value.
    pub fn field_ne(self, field: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.insert("$ne", json!([field.into(), value.into()]))
    }

    /// `$gt` comparison.
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.insert("$gt", value.into())
    }

    /// `$gte` comparison.
    pub fn gte(self, value: impl Into<Value>) -> Self {
        self.insert("$gte", value.into())
    }

    /// `$lt` comparison.
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.insert("$lt", value.into())
    }

    /// `$lte` comparison.
    pub fn lte(self, value: impl Into<Value>) -> Self {
        self.insert("$lte", value.into())
    }

    /// `$in` membership test. Trailing underscore avoids the keyword.
    pub fn in_(self, values: Vec<Value>) -> Self {
        self.insert("$in", Value::Array(values))
    }

    /// `$nin` negated membership test.
    pub fn nin(self, values: Vec<Value>) -> Self {
        self.insert("$nin", Value::Array(values))
    }

    /// `$cond` conditional expression.
    pub fn cond(
        self,
        condition: impl Into<Value>,
        then_value: impl Into<Value>,
        else_value: impl Into<Value>,
    ) -> Self {
        self.insert(
            "$cond",
            json!({
                "if": condition.into(),
                "then": then_value.into(),
                "else": else_value.into(),
            }),
        )
    }

    /// `$regex` pattern match.
    pub fn regex(self, pattern: impl Into<String>) -> Self {
        self.insert("$regex", Value::String(pattern.into()))
    }

    /// `$exists` field presence test.
    pub fn exists(self, exists: bool) -> Self {
        self.insert("$exists", Value::Bool(exists))
    }

    /// `$all` array containment test.
    pub fn all(self, values: Vec<Value>) -> Self {
        self.insert("$all", Value::Array(values))
    }

    /// `$size` array length test.
    pub fn size(self, size: u64) -> Self {
        self.insert("$size", Value::from(size))
    }

    /// Build the final operator document.
    pub fn build(self) -> Value {
        Value::Object(self.operator)
    }
}

impl From<FilterOperator> for Value {
    fn from(op: FilterOperator) -> Self {
        op.build()
    }
}
