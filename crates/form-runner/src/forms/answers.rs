use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw field inputs submitted for one page, keyed by input name.
pub type FormData = Map<String, Value>;

const ITEM_COUNT_PREFIX: &str = "__count__";

/// Accumulated answers for an application, keyed by component name.
///
/// Repeating groups keep their instances as a dense JSON array of objects under
/// the group's answer key, and the item count under a reserved key derived from
/// the hub page id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<String, Value>);

/// Where a page reads and writes its answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerScope<'a> {
    Root,
    Item { key: &'a str, index: usize },
}

impl Answers {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_key(hub_id: &str) -> String {
        format!("{ITEM_COUNT_PREFIX}{hub_id}")
    }

    pub fn item_count(&self, hub_id: &str) -> usize {
        self.0
            .get(&Self::count_key(hub_id))
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .unwrap_or(0)
    }

    pub fn items(&self, key: &str) -> &[Value] {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn item(&self, key: &str, index: usize) -> Option<&Map<String, Value>> {
        self.items(key).get(index).and_then(Value::as_object)
    }

    /// Appends `additional` empty items and returns the new count.
    pub fn push_items(&mut self, hub_id: &str, key: &str, additional: usize) -> usize {
        let items = self.items_mut(key);
        items.extend((0..additional).map(|_| Value::Object(Map::new())));
        let count = items.len();
        self.insert(Self::count_key(hub_id), Value::from(count));
        count
    }

    /// Removes one item, shifting later items down, and returns the new count.
    pub fn remove_item(&mut self, hub_id: &str, key: &str, index: usize) -> usize {
        let items = self.items_mut(key);
        if index < items.len() {
            items.remove(index);
        }
        let count = items.len();
        self.insert(Self::count_key(hub_id), Value::from(count));
        count
    }

    pub fn scoped(&self, scope: AnswerScope<'_>, name: &str) -> Option<&Value> {
        match scope {
            AnswerScope::Root => self.get(name),
            AnswerScope::Item { key, index } => self.item(key, index)?.get(name),
        }
    }

    /// Writes or clears one answer in the given scope.
    pub fn set_scoped(&mut self, scope: AnswerScope<'_>, name: &str, value: Option<Value>) {
        match scope {
            AnswerScope::Root => match value {
                Some(value) => self.insert(name, value),
                None => {
                    self.remove(name);
                }
            },
            AnswerScope::Item { key, index } => {
                let items = self.items_mut(key);
                if items.len() <= index {
                    items.resize_with(index + 1, || Value::Object(Map::new()));
                }
                if !items[index].is_object() {
                    items[index] = Value::Object(Map::new());
                }
                if let Value::Object(item) = &mut items[index] {
                    match value {
                        Some(value) => {
                            item.insert(name.to_string(), value);
                        }
                        None => {
                            item.remove(name);
                        }
                    }
                }
            }
        }
    }

    /// JSON object used for expression evaluation. Item scopes overlay the item's
    /// fields on top of the root answers.
    pub fn context(&self, scope: AnswerScope<'_>) -> Value {
        let mut root: Map<String, Value> = self
            .0
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if let AnswerScope::Item { key, index } = scope {
            if let Some(item) = self.item(key, index) {
                for (name, value) in item {
                    root.insert(name.clone(), value.clone());
                }
            }
        }
        Value::Object(root)
    }

    fn items_mut(&mut self, key: &str) -> &mut Vec<Value> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        match entry {
            Value::Array(items) => items,
            _ => unreachable!("entry was normalised to an array"),
        }
    }
}

impl FromIterator<(String, Value)> for Answers {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validation messages for one page, keyed by component name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageErrors(BTreeMap<String, Vec<String>>);

impl PageErrors {
    pub fn record(&mut self, name: &str, messages: Vec<String>) {
        if !messages.is_empty() {
            self.0.entry(name.to_string()).or_default().extend(messages);
        }
    }

    pub fn for_field(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
