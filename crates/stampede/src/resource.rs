// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The values produced by the expensive backing operation.

use std::{ops::Deref, sync::Arc};

use uuid::Uuid;

/// Vocabulary that generated item names are drawn from.
pub const ITEM_NAMES: [&str; 8] = ["Anvil", "Bellows", "Chisel", "Drill", "Easel", "Funnel", "Gimlet", "Hammer"];

/// A single immutable item in a [`ResourceBatch`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceItem {
    id: Uuid,
    name: &'static str,
}

impl ResourceItem {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { id: Uuid::new_v4(), name }
    }

    /// Unique identifier of this item.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of this item, one of [`ITEM_NAMES`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An ordered, shared batch of items; the unit of caching.
///
/// Cloning a batch is cheap and yields a handle to the same allocation, so every caller that
/// observes the same population cycle holds the same batch. Use [`ResourceBatch::same_batch`]
/// to tell whether two handles came from one generation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceBatch {
    items: Arc<[ResourceItem]>,
}

impl ResourceBatch {
    pub(crate) fn new(items: Vec<ResourceItem>) -> Self {
        Self { items: items.into() }
    }

    /// Returns the items in generation order.
    #[must_use]
    pub fn items(&self) -> &[ResourceItem] {
        &self.items
    }

    /// Returns `true` if both handles refer to the batch produced by one generation call.
    #[must_use]
    pub fn same_batch(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl Deref for ResourceBatch {
    type Target = [ResourceItem];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}
