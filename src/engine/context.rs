use crate::ast::Value;
use crate::formula::Scope;
use ahash::AHashMap;

/// The per-run variable environment: an append-only mapping from field and
/// step ids to values, seeded from validated input. Insertion order is
/// recorded so snapshots stay readable and deterministic.
///
/// Every run owns its own context; nothing here is shared, which is what
/// makes concurrent executions of the same compiled tool safe.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: Scope,
    order: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fresh context from validated input values.
    pub fn seeded(seed: Vec<(String, Value)>) -> Self {
        let mut context = Self::new();
        for (key, value) in seed {
            context.insert(key, value);
        }
        context
    }

    /// Appends one entry. Key uniqueness is guaranteed upstream: field and
    /// step ids are checked disjoint at compile time and each step writes
    /// only under its own id.
    pub fn insert(&mut self, key: String, value: Value) {
        if self.values.insert(key.clone(), value).is_none() {
            self.order.push(key);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The bindings view used for formula evaluation.
    pub fn scope(&self) -> &Scope {
        &self.values
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The whole context as one object value.
    pub fn to_object(&self) -> Value {
        let map: AHashMap<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(map)
    }

    /// JSON snapshot of the whole context.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for key in &self.order {
            if let Some(value) = self.values.get(key) {
                map.insert(key.clone(), value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }
}
