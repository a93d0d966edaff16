use crate::Value;
use ::std::collections::{BTreeMap, HashMap};
use ::std::hash::BuildHasher;

/// A fetched row, exposing its ordering fields by name.
///
/// `None` means the record has no such field, which is an error wherever a
/// cursor position has to be read off the record.
pub trait Record {
    fn field(&self, name: &str) -> Option<Value>;
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}

impl<V: Clone + Into<Value>> Record for BTreeMap<String, V> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl<V: Clone + Into<Value>, S: BuildHasher> Record for HashMap<String, V, S> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl Record for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::from)
    }
}

/// Non-object JSON values have no fields.
impl Record for serde_json::Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.as_object().and_then(|object| object.field(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_records() {
        let record = HashMap::from([("id".to_string(), 7_i64)]);
        assert_eq!(record.field("id"), Some(Value::Int(7)));
        assert_eq!(record.field("missing"), None);
    }

    #[test]
    fn json_records() {
        let record = serde_json::json!({ "id": 3, "name": "ada", "deleted_at": null });
        assert_eq!(record.field("id"), Some(Value::Int(3)));
        assert_eq!(record.field("name"), Some(Value::from("ada")));
        assert_eq!(record.field("deleted_at"), Some(Value::Null));
        assert_eq!(serde_json::json!([1, 2]).field("id"), None);
    }
}
