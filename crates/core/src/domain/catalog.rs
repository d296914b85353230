use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default, alias = "display_order")]
    pub display_order: u32,
}

fn default_available() -> bool {
    true
}

impl CatalogItem {
    /// An item can enter a draft only when it is available and carries a price.
    pub fn is_orderable(&self) -> bool {
        self.available && self.price > Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    #[serde(alias = "is_open")]
    pub is_open: bool,
    #[serde(default, alias = "next_open_time", skip_serializing_if = "Option::is_none")]
    pub next_open_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StoreStatus {
    pub fn open() -> Self {
        Self { is_open: true, next_open_time: None, message: None }
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self { is_open: false, next_open_time: None, message: Some(message.into()) }
    }
}

impl Default for StoreStatus {
    fn default() -> Self {
        Self::open()
    }
}

pub const BEEF_BURGER_ID: &str = "burger-bovino";
pub const CHICKEN_BURGER_ID: &str = "burger-frango";
pub const FRIES_ID: &str = "batata-frita";
pub const SODA_ID: &str = "refrigerante";

/// Minimal catalog served when the tenant catalog cannot be fetched.
pub fn default_catalog() -> Vec<CatalogItem> {
    vec![
        item(BEEF_BURGER_ID, "Hambúrguer de Bovino", Decimal::new(2_500, 2), "lanches", 1),
        item(CHICKEN_BURGER_ID, "Hambúrguer de Frango", Decimal::new(2_200, 2), "lanches", 2),
        item(FRIES_ID, "Batata Frita", Decimal::new(1_200, 2), "acompanhamentos", 1),
        item(SODA_ID, "Refrigerante Lata", Decimal::new(600, 2), "bebidas", 1),
    ]
}

fn item(id: &str, name: &str, price: Decimal, category: &str, display_order: u32) -> CatalogItem {
    CatalogItem {
        id: ItemId::new(id),
        name: name.to_owned(),
        price,
        category: category.to_owned(),
        available: true,
        display_order,
    }
}

/// Orders items the way they are shown to the counterparty: by category, then
/// by display order inside the category, then by name.
pub fn display_order(items: &[CatalogItem]) -> Vec<CatalogItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|left, right| {
        left.category
            .cmp(&right.category)
            .then(left.display_order.cmp(&right.display_order))
            .then(left.name.cmp(&right.name))
    });
    sorted
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{default_catalog, display_order, CatalogItem, ItemId, StoreStatus};

    #[test]
    fn default_catalog_is_fully_orderable() {
        let catalog = default_catalog();
        assert!(!catalog.is_empty());
        assert!(catalog.iter().all(CatalogItem::is_orderable));
    }

    #[test]
    fn unpriced_or_unavailable_items_are_not_orderable() {
        let mut item = default_catalog().remove(0);
        item.price = Decimal::ZERO;
        assert!(!item.is_orderable());

        let mut item = default_catalog().remove(0);
        item.available = false;
        assert!(!item.is_orderable());
    }

    #[test]
    fn display_order_groups_by_category_then_position() {
        let sorted = display_order(&default_catalog());
        let ids: Vec<&str> = sorted.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["batata-frita", "refrigerante", "burger-bovino", "burger-frango"]);
    }

    #[test]
    fn catalog_item_parses_provider_shape_with_defaults() {
        let item: CatalogItem =
            serde_json::from_str(r#"{"id":"x-salada","name":"X-Salada","price":19.9}"#)
                .expect("parse item");

        assert_eq!(item.id, ItemId::new("x-salada"));
        assert_eq!(item.price, Decimal::new(199, 1));
        assert!(item.available);
        assert_eq!(item.category, "");
    }

    #[test]
    fn store_status_accepts_camel_case_fields() {
        let status: StoreStatus =
            serde_json::from_str(r#"{"isOpen":false,"nextOpenTime":"18:00","message":"Fechado"}"#)
                .expect("parse status");

        assert!(!status.is_open);
        assert_eq!(status.next_open_time.as_deref(), Some("18:00"));
        assert_eq!(status.message.as_deref(), Some("Fechado"));
    }
}
