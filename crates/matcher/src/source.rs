use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::types::{Item, ItemSourceError};

/// Where search candidates come from.
///
/// Implementations return the current open lost-item reports. The matcher
/// filters again on `status`/`type`, so a source that returns extra rows is
/// harmless, only slower.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_open_lost_items(&self) -> Result<Vec<Item>, ItemSourceError>;
}

/// Items held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryItemSource {
    items: RwLock<Vec<Item>>,
}

impl InMemoryItemSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Item>> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Item>> {
        self.items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, item: Item) {
        self.write().push(item);
    }

    /// Replace the stored item with the same id. Returns false if none matched.
    pub fn update(&self, item: Item) -> bool {
        let mut items = self.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl FromIterator<Item> for InMemoryItemSource {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl ItemSource for InMemoryItemSource {
    async fn fetch_open_lost_items(&self) -> Result<Vec<Item>, ItemSourceError> {
        Ok(self
            .read()
            .iter()
            .filter(|item| item.is_open_lost())
            .cloned()
            .collect())
    }
}
