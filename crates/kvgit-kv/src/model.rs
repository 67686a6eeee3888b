//! Items, keys, schemas and write expressions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KvError, KvResult};

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// UTF-8 string.
    S(String),
    /// Unsigned number.
    N(u64),
    /// Boolean.
    Bool(bool),
}

impl AttributeValue {
    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric payload, if this is a number.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttributeValue::N(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::S(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::S(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<u64> for AttributeValue {
    fn from(n: u64) -> Self {
        AttributeValue::N(n)
    }
}

/// A stored item: attribute name to value, key attributes included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item(BTreeMap<String, AttributeValue>);

impl Item {
    /// Create an empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.0.insert(name.into(), value);
    }

    /// Remove an attribute, returning its old value.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.0.remove(name)
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    /// Look up a string attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    /// Look up a boolean attribute.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::as_bool)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the item has no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Primary key of an item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    /// Partition key value.
    pub partition: String,
    /// Sort key value, for tables that declare a sort key.
    pub sort: Option<String>,
}

impl ItemKey {
    /// Key for a table with only a partition key.
    pub fn partition(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    /// Key for a table with a partition key and a sort key.
    pub fn composite(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }
}

/// Provisioned capacity hints used when a table is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub read_capacity: u64,
    pub write_capacity: u64,
}

/// Everything needed to create a table on first use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Name of the partition key attribute (string typed).
    pub partition_key: String,
    /// Name of the sort key attribute (string typed), if any.
    pub sort_key: Option<String>,
    /// Capacity hints; `None` leaves the store's defaults.
    pub throughput: Option<Throughput>,
}

impl TableSchema {
    /// Schema for a table keyed by partition key only.
    pub fn partitioned(name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
            throughput: None,
        }
    }

    /// Schema for a table keyed by partition key and sort key.
    pub fn sorted(
        name: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
            throughput: None,
        }
    }

    /// Attach capacity hints.
    pub fn with_throughput(mut self, read_capacity: u64, write_capacity: u64) -> Self {
        self.throughput = Some(Throughput {
            read_capacity,
            write_capacity,
        });
        self
    }

    /// Extract an item's primary key according to this schema.
    pub fn key_of(&self, item: &Item) -> KvResult<ItemKey> {
        let partition = item
            .get_str(&self.partition_key)
            .ok_or_else(|| self.invalid(format!("missing key attribute {}", self.partition_key)))?;
        let sort = match &self.sort_key {
            Some(sort_key) => Some(
                item.get_str(sort_key)
                    .ok_or_else(|| self.invalid(format!("missing key attribute {sort_key}")))?
                    .to_string(),
            ),
            None => None,
        };
        Ok(ItemKey {
            partition: partition.to_string(),
            sort,
        })
    }

    /// Check that a key has exactly the parts this schema declares.
    pub fn check_key(&self, key: &ItemKey) -> KvResult<()> {
        match (&self.sort_key, &key.sort) {
            (Some(_), None) => Err(self.invalid("sort key value missing".into())),
            (None, Some(_)) => Err(self.invalid("table has no sort key".into())),
            _ => Ok(()),
        }
    }

    /// An item holding only the key attributes of `key`.
    pub fn key_item(&self, key: &ItemKey) -> Item {
        let mut item = Item::new().with(self.partition_key.clone(), key.partition.clone());
        if let (Some(sort_key), Some(sort)) = (&self.sort_key, &key.sort) {
            item.set(sort_key.clone(), AttributeValue::S(sort.clone()));
        }
        item
    }

    fn invalid(&self, reason: String) -> KvError {
        KvError::InvalidKey {
            table: self.name.clone(),
            reason,
        }
    }
}

/// One attribute change inside an [`Update`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    /// Set the attribute to a value.
    Set(AttributeValue),
    /// Remove the attribute if present.
    Remove,
}

/// An upsert: attribute changes applied to the item at a key, creating the
/// item if it does not exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Update {
    actions: Vec<(String, UpdateAction)>,
}

impl Update {
    /// An update with no changes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions
            .push((name.into(), UpdateAction::Set(value.into())));
        self
    }

    /// Remove an attribute.
    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.actions.push((name.into(), UpdateAction::Remove));
        self
    }

    /// The changes, in the order they were added.
    pub fn actions(&self) -> &[(String, UpdateAction)] {
        &self.actions
    }

    /// Apply the changes to an item.
    pub fn apply_to(&self, item: &mut Item) {
        for (name, action) in &self.actions {
            match action {
                UpdateAction::Set(value) => item.set(name.clone(), value.clone()),
                UpdateAction::Remove => {
                    item.remove(name);
                }
            }
        }
    }
}

/// Precondition on the currently stored item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// The stored item exists and its attribute equals the value.
    AttributeEquals {
        attribute: String,
        value: AttributeValue,
    },
    /// The stored item is absent or lacks the attribute.
    AttributeNotExists(String),
}

impl Condition {
    /// Shorthand for [`Condition::AttributeEquals`].
    pub fn equals(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Condition::AttributeEquals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Evaluate against the currently stored item, if any.
    pub fn holds_for(&self, current: Option<&Item>) -> bool {
        match self {
            Condition::AttributeEquals { attribute, value } => {
                current.and_then(|item| item.get(attribute)) == Some(value)
            }
            Condition::AttributeNotExists(attribute) => {
                current.map_or(true, |item| item.get(attribute).is_none())
            }
        }
    }
}

/// One element of a batch write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteRequest {
    /// Replace the whole item at its key.
    Put(Item),
    /// Delete the item at a key.
    Delete(ItemKey),
}

/// One page of a partition query, sorted ascending by sort key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Key of the last item returned when more items remain.
    pub last_evaluated: Option<ItemKey>,
}
