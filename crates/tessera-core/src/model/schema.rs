use std::collections::HashSet;
use std::sync::Arc;

use super::column::{ColumnDescriptor, ColumnSet};
use crate::errors::{Result, SessionError};

/// Validated, ordered column list of one model
///
/// The model name is the identity "type" in the identity map, so two
/// schemas registered under the same name address the same rows.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    columns: Vec<ColumnDescriptor>,
    /// Column indexes in primary-key order
    primary_keys: Vec<usize>,
    has_counter: bool,
}

impl ModelSchema {
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every column in declaration order (inherited column sets first)
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Primary-key columns in key-tuple order
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.primary_keys.iter().map(|&i| &self.columns[i])
    }

    /// Column indexes of the primary key, in key-tuple order
    pub fn primary_key_indexes(&self) -> &[usize] {
        &self.primary_keys
    }

    pub fn key_arity(&self) -> usize {
        self.primary_keys.len()
    }

    pub fn has_counter(&self) -> bool {
        self.has_counter
    }
}

/// Builder collecting columns before validation
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

impl ModelSchemaBuilder {
    /// Merge an abstract column set; its columns precede the ones declared after
    pub fn extends(mut self, set: &ColumnSet) -> Self {
        self.columns.extend(set.columns().iter().cloned());
        self
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Validate and freeze the schema
    ///
    /// # Errors
    ///
    /// `InvalidSchema` when the name is empty, a column name repeats, there
    /// is no primary key, explicit key orders collide or are given for only
    /// some key columns, a key column is a counter, or counters are mixed
    /// with regular non-key columns.
    pub fn build(self) -> Result<Arc<ModelSchema>> {
        let invalid = |reason: String| SessionError::InvalidSchema {
            model: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("model name cannot be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name().trim().is_empty() {
                return Err(invalid("column name cannot be empty".to_string()));
            }
            if !seen.insert(column.name()) {
                return Err(invalid(format!("duplicate column '{}'", column.name())));
            }
        }

        let mut keyed: Vec<(u32, usize)> = Vec::new();
        let mut explicit_orders = HashSet::new();
        for (index, column) in self.columns.iter().enumerate() {
            if !column.is_primary_key() {
                continue;
            }
            if column.is_counter() {
                return Err(invalid(format!(
                    "counter column '{}' cannot be part of the primary key",
                    column.name()
                )));
            }
            let order = match column.primary_key_order() {
                Some(order) => {
                    if !explicit_orders.insert(order) {
                        return Err(invalid(format!(
                            "primary key order {} is declared twice",
                            order
                        )));
                    }
                    order
                }
                None => keyed.len() as u32,
            };
            keyed.push((order, index));
        }

        if keyed.is_empty() {
            return Err(invalid("at least one primary key column is required".to_string()));
        }
        // implicit positions would collide with explicit ones
        if !explicit_orders.is_empty() && explicit_orders.len() != keyed.len() {
            return Err(invalid(
                "primary key order must be given for every key column or for none".to_string(),
            ));
        }

        // stable: ties fall back to declaration order
        keyed.sort_by_key(|&(order, _)| order);
        let primary_keys: Vec<usize> = keyed.into_iter().map(|(_, index)| index).collect();

        let has_counter = self.columns.iter().any(ColumnDescriptor::is_counter);
        if has_counter {
            if let Some(column) = self
                .columns
                .iter()
                .find(|c| !c.is_primary_key() && !c.is_counter())
            {
                return Err(invalid(format!(
                    "column '{}' cannot share a table with counter columns",
                    column.name()
                )));
            }
        }

        tracing::debug!(
            model = %self.name,
            columns = self.columns.len(),
            key_arity = primary_keys.len(),
            "model schema registered"
        );

        Ok(Arc::new(ModelSchema {
            name: self.name,
            columns: self.columns,
            primary_keys,
            has_counter,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::{now_default, uuid4_default};

    fn multi_key() -> Arc<ModelSchema> {
        ModelSchema::builder("multi_todo")
            .column(ColumnDescriptor::uuid("partition").primary_key().default_with(uuid4_default()))
            .column(ColumnDescriptor::uuid("uuid").primary_key().default_with(uuid4_default()))
            .column(ColumnDescriptor::text("title"))
            .column(ColumnDescriptor::timestamp("pub_date").primary_key().default_with(now_default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_primary_keys_follow_declaration_order() {
        let schema = multi_key();
        let names: Vec<&str> = schema.primary_keys().map(|c| c.name()).collect();
        assert_eq!(names, vec!["partition", "uuid", "pub_date"]);
        assert_eq!(schema.key_arity(), 3);
        assert!(!schema.has_counter());
    }

    #[test]
    fn test_explicit_key_order_wins() {
        let schema = ModelSchema::builder("ordered")
            .column(ColumnDescriptor::int("b").primary_key_at(1))
            .column(ColumnDescriptor::int("a").primary_key_at(0))
            .build()
            .unwrap();
        let names: Vec<&str> = schema.primary_keys().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_extends_merges_abstract_columns_first() {
        let base = ColumnSet::new("base").column(ColumnDescriptor::text("base_text"));
        let schema = ModelSchema::builder("todo")
            .extends(&base)
            .column(ColumnDescriptor::uuid("uuid").primary_key())
            .build()
            .unwrap();
        assert_eq!(schema.columns()[0].name(), "base_text");
        assert!(schema.column("base_text").is_some());
        assert_eq!(schema.column_index("uuid"), Some(1));
    }

    #[test]
    fn test_rejects_missing_primary_key() {
        let err = ModelSchema::builder("keyless")
            .column(ColumnDescriptor::text("title"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSchema { .. }));
    }

    #[test]
    fn test_rejects_duplicate_from_column_set() {
        let base = ColumnSet::new("base").column(ColumnDescriptor::text("title"));
        let err = ModelSchema::builder("todo")
            .extends(&base)
            .column(ColumnDescriptor::uuid("uuid").primary_key())
            .column(ColumnDescriptor::text("title"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column 'title'"));
    }

    #[test]
    fn test_rejects_duplicate_explicit_order() {
        let err = ModelSchema::builder("clash")
            .column(ColumnDescriptor::int("a").primary_key_at(0))
            .column(ColumnDescriptor::int("b").primary_key_at(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSchema { .. }));
    }

    #[test]
    fn test_rejects_partially_explicit_order() {
        let err = ModelSchema::builder("partial")
            .column(ColumnDescriptor::int("a").primary_key())
            .column(ColumnDescriptor::int("b").primary_key_at(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSchema { .. }));
        assert!(err.to_string().contains("every key column or for none"));
    }

    #[test]
    fn test_counter_rules() {
        let ok = ModelSchema::builder("hits")
            .column(ColumnDescriptor::uuid("page").primary_key())
            .column(ColumnDescriptor::counter("views"))
            .build()
            .unwrap();
        assert!(ok.has_counter());

        let mixed = ModelSchema::builder("mixed")
            .column(ColumnDescriptor::uuid("page").primary_key())
            .column(ColumnDescriptor::counter("views"))
            .column(ColumnDescriptor::text("title"))
            .build();
        assert!(mixed.is_err());

        let keyed = ModelSchema::builder("keyed")
            .column(ColumnDescriptor::counter("views").primary_key())
            .build();
        assert!(keyed.is_err());
    }
}
