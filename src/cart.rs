//! In-memory order builder.
//!
//! Holds the lines of the order currently being composed at the till,
//! before submission to the order store. Adding an already-present product
//! merges into its line; quantity adjustments that reach zero remove the
//! line outright rather than clamping.

use serde::{Deserialize, Serialize};

use crate::menu;

/// Maximum note length, matching the note textarea cap.
pub const MAX_NOTE_LEN: usize = 300;

/// One product line within an in-progress order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product: String,
    pub price: f64,
    pub quantity: i64,
}

/// The order currently being built.
#[derive(Debug, Default, Clone)]
pub struct Cart {
    items: Vec<OrderItem>,
    note: String,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a menu product. Silent no-op when the name is empty
    /// or not on the menu; merges into an existing line if present.
    pub fn add_product(&mut self, product: &str) {
        if product.is_empty() {
            return;
        }
        let Some(menu_item) = menu::find_item(product) else {
            return;
        };

        if let Some(line) = self.items.iter_mut().find(|line| line.product == product) {
            line.quantity += 1;
        } else {
            self.items.push(OrderItem {
                product: menu_item.product.to_string(),
                price: menu_item.price,
                quantity: 1,
            });
        }
    }

    /// Add `delta` to a line's quantity. The line is removed entirely when
    /// the result is <= 0. Out-of-range index is a no-op.
    pub fn adjust_quantity(&mut self, index: usize, delta: i64) {
        let Some(line) = self.items.get_mut(index) else {
            return;
        };
        line.quantity += delta;
        if line.quantity <= 0 {
            self.items.remove(index);
        }
    }

    /// Sum of price x quantity over all lines. Pure.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|line| line.price * line.quantity as f64)
            .sum()
    }

    /// Set the order note, trimmed and capped at [`MAX_NOTE_LEN`] characters
    /// (the input field enforces the same cap).
    pub fn set_note(&mut self, note: &str) {
        self.note = note.trim().chars().take(MAX_NOTE_LEN).collect();
    }

    /// The note, or `None` when empty.
    pub fn note(&self) -> Option<&str> {
        if self.note.is_empty() {
            None
        } else {
            Some(&self.note)
        }
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Clear all lines and the note, called after successful submission.
    pub fn reset(&mut self) {
        self.items.clear();
        self.note.clear();
    }
}
