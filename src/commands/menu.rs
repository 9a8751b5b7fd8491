//! Menu commands: the static catalog for the product picker.

use crate::menu;

/// Handle menu:get-items. Returns the full catalog in display order.
pub async fn menu_get_items() -> Result<serde_json::Value, String> {
    serde_json::to_value(menu::all()).map_err(|e| format!("serialize menu: {e}"))
}

/// Handle menu:get-categories. Catalog grouped for the select's optgroups.
pub async fn menu_get_categories() -> Result<serde_json::Value, String> {
    let groups: Vec<serde_json::Value> = menu::grouped_by_category()
        .into_iter()
        .map(|(category, items)| {
            serde_json::json!({
                "category": category,
                "items": items,
            })
        })
        .collect();
    Ok(serde_json::Value::Array(groups))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn items_expose_product_and_price() {
        let items = menu_get_items().await.unwrap();
        let arr = items.as_array().unwrap();
        assert_eq!(arr.len(), 33);
        assert_eq!(arr[2]["product"], "Americano");
        assert_eq!(arr[2]["price"], 175.0);
    }

    #[tokio::test]
    async fn categories_are_grouped_in_order() {
        let groups = menu_get_categories().await.unwrap();
        let arr = groups.as_array().unwrap();
        assert_eq!(arr[0]["category"], "Kahve");
        assert_eq!(arr.last().unwrap()["category"], "Tatlı");
    }
}
