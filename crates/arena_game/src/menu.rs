//! Slot layout of the paginated item menu.
//!
//! A menu is a chest-style grid nine slots wide. Items fill the inner block of
//! the grid: every row except the first and the last, with a one-slot margin
//! left and right. The back button sits on the bottom row, four slots from
//! the end. Slots are numbered from zero, row by row.

use crate::error::{ArenaError, ArenaResult};
use crate::item::ItemView;
use serde::Serialize;

pub const COLUMNS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuLayout {
    rows: u8,
}

impl MenuLayout {
    pub const MIN_ROWS: u8 = 3;
    pub const MAX_ROWS: u8 = 6;

    pub fn new(rows: u8) -> ArenaResult<Self> {
        if !(Self::MIN_ROWS..=Self::MAX_ROWS).contains(&rows) {
            return Err(ArenaError::InvalidLayout(rows));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn size(&self) -> usize {
        self.rows as usize * COLUMNS
    }

    /// Item slots in fill order.
    pub fn item_slots(&self) -> Vec<usize> {
        (1..self.rows as usize - 1)
            .flat_map(|row| (1..COLUMNS - 1).map(move |column| row * COLUMNS + column))
            .collect()
    }

    pub fn items_per_page(&self) -> usize {
        (self.rows as usize - 2) * (COLUMNS - 2)
    }

    pub fn back_slot(&self) -> usize {
        self.size() - 4
    }

    /// Pages needed for `item_count` items; an empty menu still has one page.
    pub fn page_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.items_per_page()).max(1)
    }

    /// Pairs the items of page `page` with their slots.
    ///
    /// Pages past the end are empty.
    pub fn page<'a, T>(&self, items: &'a [T], page: usize) -> Vec<(usize, &'a T)> {
        let per_page = self.items_per_page();
        let start = page.saturating_mul(per_page).min(items.len());
        let end = start.saturating_add(per_page).min(items.len());

        self.item_slots()
            .into_iter()
            .zip(&items[start..end])
            .collect()
    }
}

/// One rendered page of a category menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuPage {
    pub title: String,
    pub page: usize,
    pub page_count: usize,
    pub slots: Vec<(usize, ItemView)>,
    pub back_slot: usize,
}
