//! Static menu catalog for Gato Coffee Bar.
//!
//! Pure reference data consumed by the order builder; prices are in TL.
//! The catalog is fixed at build time; menu administration is out of scope.

use serde::Serialize;

/// One sellable product.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MenuItem {
    pub category: &'static str,
    pub product: &'static str,
    pub price: f64,
}

/// The full catalog, in display order.
pub const MENU_ITEMS: &[MenuItem] = &[
    MenuItem { category: "Kahve", product: "Espresso (S)", price: 130.0 },
    MenuItem { category: "Kahve", product: "Espresso (D)", price: 150.0 },
    MenuItem { category: "Kahve", product: "Americano", price: 175.0 },
    MenuItem { category: "Kahve", product: "Indirimli Americano", price: 155.0 },
    MenuItem { category: "Kahve", product: "Ice Americano", price: 195.0 },
    MenuItem { category: "Kahve", product: "Filtre Kahve", price: 165.0 },
    MenuItem { category: "Kahve", product: "Indirimli Filtre", price: 145.0 },
    MenuItem { category: "Kahve", product: "V60", price: 240.0 },
    MenuItem { category: "Kahve", product: "Latte", price: 195.0 },
    MenuItem { category: "Kahve", product: "Indirimli Latte", price: 175.0 },
    MenuItem { category: "Kahve", product: "Ice Latte", price: 215.0 },
    MenuItem { category: "Kahve", product: "Yulaf Sütlü", price: 260.0 },
    MenuItem { category: "Kahve", product: "Vanilla Latte", price: 215.0 },
    MenuItem { category: "Kahve", product: "Pumpkin Spice", price: 275.0 },
    MenuItem { category: "Kahve", product: "Flat White", price: 195.0 },
    MenuItem { category: "Kahve", product: "Cappuccino", price: 195.0 },
    MenuItem { category: "Kahve", product: "Cortado", price: 165.0 },
    MenuItem { category: "Kahve", product: "Mocha", price: 230.0 },
    MenuItem { category: "Kahve", product: "White Chocolate", price: 230.0 },
    MenuItem { category: "Kahve", product: "Türk Kahve", price: 135.0 },
    MenuItem { category: "Matcha", product: "Matcha Latte", price: 230.0 },
    MenuItem { category: "Matcha", product: "Yulaf Sütlü", price: 295.0 },
    MenuItem { category: "Matcha", product: "Iced Strawberry", price: 300.0 },
    MenuItem { category: "Matcha", product: "Iced Vanilla", price: 290.0 },
    MenuItem { category: "Özel İçecek", product: "Sıcak Çikolata", price: 195.0 },
    MenuItem { category: "Özel İçecek", product: "Chai Latte", price: 195.0 },
    MenuItem { category: "Özel İçecek", product: "Salep", price: 195.0 },
    MenuItem { category: "Özel İçecek", product: "Kış Çayı", price: 180.0 },
    MenuItem { category: "Özel İçecek", product: "Rooibos", price: 180.0 },
    MenuItem { category: "Tatlı", product: "Cookie", price: 195.0 },
    MenuItem { category: "Tatlı", product: "Indirimli Cookie", price: 175.0 },
    MenuItem { category: "Tatlı", product: "Kek", price: 240.0 },
    MenuItem { category: "Tatlı", product: "Indirimli Kek", price: 220.0 },
];

/// The whole catalog.
pub fn all() -> &'static [MenuItem] {
    MENU_ITEMS
}

/// Look up a product by name. First match wins ("Yulaf Sütlü" appears under
/// both Kahve and Matcha).
pub fn find_item(product: &str) -> Option<&'static MenuItem> {
    MENU_ITEMS.iter().find(|item| item.product == product)
}

/// Catalog grouped by category, categories in first-appearance order.
pub fn grouped_by_category() -> Vec<(&'static str, Vec<&'static MenuItem>)> {
    let mut groups: Vec<(&'static str, Vec<&'static MenuItem>)> = Vec::new();
    for item in MENU_ITEMS {
        match groups.iter_mut().find(|(cat, _)| *cat == item.category) {
            Some((_, items)) => items.push(item),
            None => groups.push((item.category, vec![item])),
        }
    }
    groups
}
