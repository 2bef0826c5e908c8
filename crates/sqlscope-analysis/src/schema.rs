// Lineage schema
//
// Caller-supplied table definitions: table name to ordered columns, each with
// an optional type. Columns may be written as bare names or as objects:
//
//   {"orders": ["id", "customer_id"]}
//   {"orders": [{"name": "id", "type": "INT64"}]}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlscope_ast::ObjectName;
use sqlscope_parser::Dialect;

/// One schema column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnSpec")]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl SchemaColumn {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    #[must_use]
    pub fn typed(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
        }
    }
}

impl From<&str> for SchemaColumn {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type", default)]
        data_type: Option<String>,
    },
}

impl From<ColumnSpec> for SchemaColumn {
    fn from(spec: ColumnSpec) -> Self {
        match spec {
            ColumnSpec::Name(name) => Self::new(name),
            ColumnSpec::Typed { name, data_type } => Self { name, data_type },
        }
    }
}

/// Table definitions available to lineage analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    tables: BTreeMap<String, Vec<SchemaColumn>>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Schema::insert`].
    #[must_use]
    pub fn with_table<C>(mut self, name: impl Into<String>, columns: impl IntoIterator<Item = C>) -> Self
    where
        C: Into<SchemaColumn>,
    {
        self.insert(name, columns);
        self
    }

    /// Define (or replace) a table.
    pub fn insert<C>(&mut self, name: impl Into<String>, columns: impl IntoIterator<Item = C>)
    where
        C: Into<SchemaColumn>,
    {
        self.tables
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &[SchemaColumn])> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Find the definition of a table reference.
    ///
    /// A match on every name part wins; otherwise the table
    /// is matched on its last name part, provided exactly one schema table
    /// has that last part. Returns the schema's own spelling of the name.
    #[must_use]
    pub fn lookup(&self, name: &ObjectName, dialect: &Dialect) -> Option<(&str, &[SchemaColumn])> {
        let exact = self.tables.iter().find(|(key, _)| {
            let key_parts: Vec<&str> = key.split('.').collect();
            key_parts.len() == name.parts.len()
                && name
                    .parts
                    .iter()
                    .zip(&key_parts)
                    .all(|(part, k)| dialect.ident_names(part, k))
        });
        if let Some((key, columns)) = exact {
            return Some((key.as_str(), columns.as_slice()));
        }

        let last = name.name()?;
        let mut by_last = self.tables.iter().filter(|(key, _)| {
            let key_last = key.rsplit('.').next().unwrap_or(key);
            dialect.ident_names(last, key_last)
        });
        match (by_last.next(), by_last.next()) {
            (Some((key, columns)), None) => Some((key.as_str(), columns.as_slice())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscope_ast::{Ident, Span};
    use sqlscope_parser::dialect::{ANSI, BIGQUERY, POSTGRES};

    fn name(parts: &[&str]) -> ObjectName {
        ObjectName::from_parts(parts.iter().map(|p| Ident::new(*p, Span::ZERO)))
    }

    #[test]
    fn deserializes_both_column_forms() {
        let json = r#"{
            "orders": ["id", "customer_id"],
            "customers": [{"name": "id", "type": "INT64"}, {"name": "name"}]
        }"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.len(), 2);
        let (_, orders) = schema.lookup(&name(&["orders"]), &ANSI).unwrap();
        assert_eq!(orders, &[SchemaColumn::new("id"), SchemaColumn::new("customer_id")]);
        let (_, customers) = schema.lookup(&name(&["customers"]), &ANSI).unwrap();
        assert_eq!(customers[0], SchemaColumn::typed("id", "INT64"));
        assert_eq!(customers[1].data_type, None);
    }

    #[test]
    fn serializes_typed_columns_as_objects() {
        let schema = Schema::new().with_table("t", [SchemaColumn::typed("a", "INT"), "b".into()]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"t": [{"name": "a", "type": "INT"}, {"name": "b"}]})
        );
    }

    #[test]
    fn lookup_exact_then_last_part() {
        let schema = Schema::new()
            .with_table("sales.Orders", ["id"])
            .with_table("customers", ["id", "name"]);
        assert_eq!(
            schema.lookup(&name(&["SALES", "orders"]), &ANSI).map(|(k, _)| k),
            Some("sales.Orders")
        );
        assert_eq!(
            schema.lookup(&name(&["orders"]), &ANSI).map(|(k, _)| k),
            Some("sales.Orders")
        );
        assert_eq!(
            schema.lookup(&name(&["crm", "customers"]), &ANSI).map(|(k, _)| k),
            Some("customers")
        );
        assert!(schema.lookup(&name(&["missing"]), &ANSI).is_none());
    }

    #[test]
    fn ambiguous_last_part_is_no_match() {
        let schema = Schema::new().with_table("a.t", ["x"]).with_table("b.t", ["y"]);
        assert!(schema.lookup(&name(&["t"]), &ANSI).is_none());
        assert!(schema.lookup(&name(&["a", "t"]), &ANSI).is_some());
    }

    #[test]
    fn case_sensitive_dialect_does_not_fold() {
        let schema = Schema::new().with_table("Orders", ["id"]);
        assert!(schema.lookup(&name(&["orders"]), &BIGQUERY).is_none());
        assert!(schema.lookup(&name(&["Orders"]), &BIGQUERY).is_some());
    }

    #[test]
    fn quoted_reference_matches_exact_spelling() {
        let schema = Schema::new().with_table("Orders", ["id"]).with_table("orders", ["ref"]);
        let quoted = ObjectName::bare(Ident::quoted("Orders", '"', Span::ZERO));
        assert_eq!(schema.lookup(&quoted, &POSTGRES).map(|(k, _)| k), Some("Orders"));

        let schema = Schema::new().with_table("orders", ["id"]);
        assert!(schema.lookup(&quoted, &POSTGRES).is_none());
        assert_eq!(
            schema.lookup(&name(&["ORDERS"]), &POSTGRES).map(|(k, _)| k),
            Some("orders")
        );
    }
}
