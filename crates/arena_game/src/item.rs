//! Cosmetic item catalog and the per-player display state of each item.

use crate::error::{ArenaError, ArenaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub type CategoryId = u32;
pub type ItemId = u32;

/// Currencies an item can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Coins,
    Gems,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Coins => write!(f, "coins"),
            Currency::Gems => write!(f, "gems"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub currency: Currency,
    pub amount: u64,
}

impl Price {
    pub const fn new(currency: Currency, amount: u64) -> Self {
        Self { currency, amount }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Identifies an item across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub category: CategoryId,
    pub item: ItemId,
}

impl ItemKey {
    pub const fn new(category: CategoryId, item: ItemId) -> Self {
        Self { category, item }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameItem {
    pub id: ItemId,
    #[serde(default)]
    pub category: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Vec<String>,
    pub price: Price,
}

impl GameItem {
    pub fn new(id: ItemId, name: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            category: 0,
            name: name.into(),
            description: Vec::new(),
            price,
        }
    }

    pub fn with_description<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.description = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.category, self.id)
    }
}

/// A named group of items of which a player selects at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCategory {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    items: Vec<GameItem>,
}

impl ItemCategory {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Adds an item, stamping it with this category's id.
    ///
    /// An item with the same id replaces the earlier one in place.
    pub fn add_item(&mut self, mut item: GameItem) {
        item.category = self.id;
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn with_item(mut self, item: GameItem) -> Self {
        self.add_item(item);
        self
    }

    pub fn item(&self, id: ItemId) -> Option<&GameItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items in display order.
    pub fn items(&self) -> &[GameItem] {
        &self.items
    }

    /// Re-stamps every item with this category's id; used after deserializing.
    pub(crate) fn normalize(&mut self) {
        for item in &mut self.items {
            item.category = self.id;
        }
    }
}

#[derive(Debug, Default)]
pub struct ItemCatalog {
    categories: BTreeMap<CategoryId, ItemCategory>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a category; an existing category with the same id is replaced.
    pub fn register(&mut self, mut category: ItemCategory) {
        category.normalize();
        debug!(
            "🎨 Registered item category {} '{}' with {} items",
            category.id,
            category.name,
            category.items.len()
        );
        self.categories.insert(category.id, category);
    }

    pub fn get(&self, id: CategoryId) -> Option<&ItemCategory> {
        self.categories.get(&id)
    }

    /// Looks up an item, telling a missing category apart from a missing item.
    pub fn item(&self, key: ItemKey) -> ArenaResult<&GameItem> {
        let category = self
            .get(key.category)
            .ok_or(ArenaError::UnknownCategory(key.category))?;
        category.item(key.item).ok_or(ArenaError::UnknownItem {
            category: key.category,
            item: key.item,
        })
    }

    pub fn categories(&self) -> impl Iterator<Item = &ItemCategory> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// How an item is presented to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemDisplayState {
    /// The player's current pick in this category
    Selected,
    /// Owned, click to select
    Owned,
    /// Not owned, the player can pay for it
    Affordable,
    /// Not owned, the player cannot pay for it
    Unaffordable,
}

impl ItemDisplayState {
    pub fn resolve(owned: bool, selected: bool, affordable: bool) -> Self {
        match (selected, owned, affordable) {
            (true, _, _) => ItemDisplayState::Selected,
            (false, true, _) => ItemDisplayState::Owned,
            (false, false, true) => ItemDisplayState::Affordable,
            (false, false, false) => ItemDisplayState::Unaffordable,
        }
    }

    /// Hint line shown under the item.
    pub fn hint(self) -> &'static str {
        match self {
            ItemDisplayState::Selected => "Item selected",
            ItemDisplayState::Owned => "Click to select",
            ItemDisplayState::Affordable => "Click to purchase",
            ItemDisplayState::Unaffordable => "Not enough funds",
        }
    }
}

/// Display data handed to the menu renderer for one item slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub key: ItemKey,
    pub name: String,
    pub description: Vec<String>,
    pub state: ItemDisplayState,
    /// Price text, present only while the item is not owned
    pub price_label: Option<String>,
    pub glowing: bool,
}

impl ItemView {
    pub fn new(item: &GameItem, state: ItemDisplayState) -> Self {
        let price_label = matches!(
            state,
            ItemDisplayState::Affordable | ItemDisplayState::Unaffordable
        )
        .then(|| item.price.to_string());

        Self {
            key: item.key(),
            name: item.name.clone(),
            description: item.description.clone(),
            state,
            price_label,
            glowing: state == ItemDisplayState::Selected,
        }
    }
}
