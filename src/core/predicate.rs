//! Structured filter conditions for lookups and listings
//!
//! A [`Predicate`] is built from validated field names and values. It is
//! rendered to SQL with bound `$n` placeholders, or evaluated directly against
//! JSON rows by backends that hold data in memory. Values are never spliced
//! into query text.

use super::error::{ApiError, ApiResult};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use uuid::Uuid;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// Check that `name` can be used as a column name
pub fn validate_identifier(name: &str) -> ApiResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("invalid field name '{name}'")))
    }
}

/// Quote an identifier for PostgreSQL
pub fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL text plus the parameters bound to its placeholders, in order
///
/// Parameters are carried as text. Generic equality compares against
/// `column::text`, so a single bind type covers text, numeric and boolean
/// columns; uuid equality casts the parameter instead, which keeps primary key
/// and owner indexes usable.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<String>,
}

impl QueryBuf {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Register a parameter and return its placeholder number
    pub fn push_param(&mut self, value: String) -> usize {
        self.params.push(value);
        self.params.len()
    }

    pub fn push_str(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }
}

/// A filter condition over record fields
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    All,
    /// `field = value`; a JSON null compares as `IS NULL`
    Eq(String, Value),
    /// `field = id` on a uuid column
    EqUuid(String, Uuid),
    /// `field IS NULL`
    IsNull(String),
    /// Every inner predicate holds
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: &str, value: impl Into<Value>) -> ApiResult<Self> {
        validate_identifier(field)?;
        Ok(Predicate::Eq(field.to_string(), value.into()))
    }

    pub fn eq_uuid(field: &str, id: Uuid) -> ApiResult<Self> {
        validate_identifier(field)?;
        Ok(Predicate::EqUuid(field.to_string(), id))
    }

    pub fn is_null(field: &str) -> ApiResult<Self> {
        validate_identifier(field)?;
        Ok(Predicate::IsNull(field.to_string()))
    }

    /// Conjunction of two predicates, flattening nested `And`s
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Evaluate against a JSON object row
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq(field, Value::Null) | Predicate::IsNull(field) => {
                row.get(field).is_none_or(Value::is_null)
            }
            Predicate::Eq(field, value) => row.get(field) == Some(value),
            Predicate::EqUuid(field, id) => row
                .get(field)
                .and_then(Value::as_str)
                .and_then(|raw| Uuid::parse_str(raw).ok())
                == Some(*id),
            Predicate::And(inner) => inner.iter().all(|p| p.matches(row)),
        }
    }

    /// Append ` WHERE <condition>` unless the predicate matches everything
    pub fn push_where(&self, q: &mut QueryBuf) {
        if *self != Predicate::All {
            q.push_str(" WHERE ");
            self.push_condition(q);
        }
    }

    fn push_condition(&self, q: &mut QueryBuf) {
        match self {
            Predicate::All => q.push_str("TRUE"),
            Predicate::Eq(field, Value::Null) | Predicate::IsNull(field) => {
                q.push_str(&format!("{} IS NULL", quoted(field)));
            }
            Predicate::Eq(field, value) => {
                let n = q.push_param(param_text(value));
                q.push_str(&format!("{}::text = ${}", quoted(field), n));
            }
            Predicate::EqUuid(field, id) => {
                let n = q.push_param(id.to_string());
                q.push_str(&format!("{} = ${}::uuid", quoted(field), n));
            }
            Predicate::And(inner) if inner.is_empty() => q.push_str("TRUE"),
            Predicate::And(inner) => {
                for (i, p) in inner.iter().enumerate() {
                    if i > 0 {
                        q.push_str(" AND ");
                    }
                    q.push_str("(");
                    p.push_condition(q);
                    q.push_str(")");
                }
            }
        }
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_field_names() {
        assert!(Predicate::eq("owner_id", "x").is_ok());
        assert!(Predicate::eq("id = '1' OR 1=1 --", "x").is_err());
        assert!(Predicate::eq("1abc", "x").is_err());
        assert!(Predicate::is_null("").is_err());
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let hostile = "' OR '1'='1";
        let predicate = Predicate::eq("id", hostile)
            .unwrap()
            .and(Predicate::eq("owner_id", "u-1").unwrap());

        let mut q = QueryBuf::new("SELECT 1 FROM \"notes\"");
        predicate.push_where(&mut q);

        assert_eq!(
            q.sql,
            "SELECT 1 FROM \"notes\" WHERE (\"id\"::text = $1) AND (\"owner_id\"::text = $2)"
        );
        assert_eq!(q.params, vec![hostile.to_string(), "u-1".to_string()]);
        assert!(!q.sql.contains(hostile));
    }

    #[test]
    fn test_uuid_equality_casts_the_parameter() {
        let id = Uuid::new_v4();
        let mut q = QueryBuf::new("SELECT 1 FROM \"notes\"");
        Predicate::eq_uuid("id", id).unwrap().push_where(&mut q);

        assert_eq!(q.sql, "SELECT 1 FROM \"notes\" WHERE \"id\" = $1::uuid");
        assert_eq!(q.params, vec![id.to_string()]);

        assert!(Predicate::eq_uuid("owner id", id).is_err());
    }

    #[test]
    fn test_uuid_equality_matches_rows() {
        let id = Uuid::new_v4();
        let predicate = Predicate::eq_uuid("owner_id", id).unwrap();

        assert!(predicate.matches(&json!({"owner_id": id.to_string()})));
        assert!(predicate.matches(&json!({"owner_id": id.to_string().to_uppercase()})));
        assert!(!predicate.matches(&json!({"owner_id": Uuid::new_v4().to_string()})));
        assert!(!predicate.matches(&json!({"owner_id": "not-a-uuid"})));
        assert!(!predicate.matches(&json!({})));
    }

    #[test]
    fn test_all_renders_no_where() {
        let mut q = QueryBuf::new("SELECT 1");
        Predicate::All.push_where(&mut q);
        assert_eq!(q.sql, "SELECT 1");
        assert!(q.params.is_empty());
    }

    #[test]
    fn test_null_renders_is_null() {
        let mut q = QueryBuf::new("");
        Predicate::eq("deleted_at", Value::Null)
            .unwrap()
            .push_where(&mut q);
        assert_eq!(q.sql, " WHERE \"deleted_at\" IS NULL");
    }

    #[test]
    fn test_and_flattens() {
        let p = Predicate::eq("a", 1)
            .unwrap()
            .and(Predicate::eq("b", 2).unwrap())
            .and(Predicate::eq("c", 3).unwrap());
        match p {
            Predicate::And(inner) => assert_eq!(inner.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
        assert_eq!(
            Predicate::All.and(Predicate::eq("a", 1).unwrap()),
            Predicate::eq("a", 1).unwrap()
        );
    }

    #[test]
    fn test_matches_rows() {
        let row = json!({"id": "n1", "owner_id": "u1", "pinned": true, "archived_at": null});

        assert!(Predicate::All.matches(&row));
        assert!(Predicate::eq("owner_id", "u1").unwrap().matches(&row));
        assert!(!Predicate::eq("owner_id", "u2").unwrap().matches(&row));
        assert!(Predicate::eq("pinned", true).unwrap().matches(&row));
        assert!(Predicate::is_null("archived_at").unwrap().matches(&row));
        assert!(Predicate::is_null("missing").unwrap().matches(&row));
        assert!(
            !Predicate::eq("id", "n1")
                .unwrap()
                .and(Predicate::eq("owner_id", "u2").unwrap())
                .matches(&row)
        );
    }
}
