// Toggle-able metrics of a polled chart
use super::error::ChartError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub active: bool,
}

/// Registry of data items keyed by name, kept in registration order.
/// Items are never removed, only toggled inactive.
#[derive(Debug, Clone, Default)]
pub struct DataItemRegistry {
    items: Vec<DataItem>,
}

impl DataItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric as inactive. Re-registering a name keeps its position
    /// but replaces id and color and resets it to inactive.
    pub fn register(&mut self, id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) {
        let item = DataItem {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            active: false,
        };

        match self.items.iter_mut().find(|i| i.name == item.name) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Flip the item's active flag and return the new state
    pub fn toggle(&mut self, name: &str) -> Result<bool, ChartError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| ChartError::UnknownDataItem(name.to_string()))?;

        item.active = !item.active;
        Ok(item.active)
    }

    pub fn is_active(&self, name: &str) -> Result<bool, ChartError> {
        self.items
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.active)
            .ok_or_else(|| ChartError::UnknownDataItem(name.to_string()))
    }

    pub fn items(&self) -> &[DataItem] {
        &self.items
    }

    pub fn active(&self) -> impl Iterator<Item = &DataItem> {
        self.items.iter().filter(|i| i.active)
    }

    pub fn has_active(&self) -> bool {
        self.items.iter().any(|i| i.active)
    }

    /// Rebuild the data query from the active items:
    /// `ids=<a,b>&names=<a,b>&colors=<a,b>`
    pub fn query_string(&self) -> String {
        format!(
            "ids={}&names={}&colors={}",
            self.joined(|i| &i.id),
            self.joined(|i| &i.name),
            self.joined(|i| &i.color)
        )
    }

    fn joined(&self, field: impl Fn(&DataItem) -> &str) -> String {
        self.active()
            .map(|i| urlencoding::encode(field(i)).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    }
}
