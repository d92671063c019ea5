//! Column/value pairs for inserts and updates.

use rusqlite::types::Value;

/// Ordered set of column values.
///
/// Putting a column twice replaces the earlier value in place, so the column
/// order in generated SQL follows first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentValues {
    entries: Vec<(String, Value)>,
}

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any previous value for the column.
    pub fn put(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column.to_string(), value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_keeps_insertion_order() {
        let mut values = ContentValues::new();
        values.put("column1", "value".to_string()).put("column2", 1234i64);

        assert_eq!(values.columns().collect::<Vec<_>>(), vec!["column1", "column2"]);
        assert_eq!(values.get("column2"), Some(&Value::Integer(1234)));
    }

    #[test]
    fn test_put_replaces_existing_column() {
        let mut values = ContentValues::new();
        values.put("a", 1i64).put("b", 2i64).put("a", 3i64);

        assert_eq!(values.len(), 2);
        assert_eq!(values.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(values.get("a"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_get_missing_column() {
        let mut values = ContentValues::new();
        assert!(values.is_empty());

        values.put("a", Option::<i64>::None);
        assert_eq!(values.get("a"), Some(&Value::Null));
        assert!(values.get("missing").is_none());
    }
}
