//! Kind queries with property filters.

use crate::model::{Entity, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison operator of a property filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyOp {
    /// `property == value`
    Equal,
    /// `property < value`
    LessThan,
    /// `property <= value`
    LessThanOrEqual,
    /// `property > value`
    GreaterThan,
    /// `property >= value`
    GreaterThanOrEqual,
}

impl PropertyOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            PropertyOp::Equal => ord == Ordering::Equal,
            PropertyOp::LessThan => ord == Ordering::Less,
            PropertyOp::LessThanOrEqual => ord != Ordering::Greater,
            PropertyOp::GreaterThan => ord == Ordering::Greater,
            PropertyOp::GreaterThanOrEqual => ord != Ordering::Less,
        }
    }
}

/// A query filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Compares one property against a value.
    Property {
        /// Property name.
        name: String,
        /// Comparison operator.
        op: PropertyOp,
        /// Value to compare against.
        value: Value,
    },
    /// All sub-filters must match.
    And(Vec<Filter>),
}

impl Filter {
    /// `name == value`
    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, PropertyOp::Equal, value)
    }

    /// `name > value`
    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, PropertyOp::GreaterThan, value)
    }

    /// `name < value`
    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, PropertyOp::LessThan, value)
    }

    /// Builds a property filter.
    pub fn property(name: impl Into<String>, op: PropertyOp, value: impl Into<Value>) -> Self {
        Filter::Property {
            name: name.into(),
            op,
            value: value.into(),
        }
    }

    /// Conjunction of filters.
    #[must_use]
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Evaluates the filter against an entity.
    ///
    /// A property filter never matches an entity that lacks the property.
    /// Array properties match if any element matches. Inequalities only
    /// match values of the same type as the operand.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Filter::Property { name, op, value } => match entity.get(name) {
                Some(Value::Array(items)) => items.iter().any(|v| Self::compare(v, *op, value)),
                Some(actual) => Self::compare(actual, *op, value),
                None => false,
            },
            Filter::And(filters) => filters.iter().all(|f| f.matches(entity)),
        }
    }

    fn compare(actual: &Value, op: PropertyOp, expected: &Value) -> bool {
        if op != PropertyOp::Equal
            && std::mem::discriminant(actual) != std::mem::discriminant(expected)
        {
            return false;
        }
        op.accepts(actual.cmp_property(expected))
    }
}

/// A query over all entities of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Kind to scan.
    pub kind: String,
    /// Optional filter.
    pub filter: Option<Filter>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates an unfiltered query over `kind`.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filter: None,
            limit: None,
        }
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the result limit.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the entity belongs to the kind and passes the filter.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        let kind_matches = entity.key().and_then(|k| k.kind()) == Some(self.kind.as_str());
        kind_matches && self.filter.as_ref().map_or(true, |f| f.matches(entity))
    }
}
