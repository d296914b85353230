use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{CatalogItem, ItemId};

pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    DineIn,
    Delivery,
}

impl OrderKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DineIn => "Consumo no local",
            Self::Delivery => "Entrega",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    InstantTransfer,
    Card,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [Self::Cash, Self::InstantTransfer, Self::Card];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Dinheiro",
            Self::InstantTransfer => "Pix",
            Self::Card => "Cartão",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn from_catalog(item: &CatalogItem, quantity: u32) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            quantity: quantity.max(MIN_QUANTITY),
            unit_price: item.price.max(Decimal::ZERO),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn summary_line(&self) -> String {
        format!("{}x {} - {}", self.quantity, self.name, format_brl(self.line_total()))
    }
}

/// Item picked in the browse step that is still waiting for a quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    pub id: ItemId,
    pub name: String,
    pub unit_price: Decimal,
}

impl From<&CatalogItem> for PendingItem {
    fn from(item: &CatalogItem) -> Self {
        Self { id: item.id.clone(), name: item.name.clone(), unit_price: item.price }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub pending_item: Option<PendingItem>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub order_kind: Option<OrderKind>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub total: Decimal,
}

impl OrderDraft {
    pub fn for_phone(phone: impl Into<String>) -> Self {
        Self { customer_phone: Some(phone.into()), ..Self::default() }
    }

    pub fn add_item(&mut self, item: OrderItem) {
        self.items.push(item);
        self.recompute_total();
    }

    pub fn pop_item(&mut self) -> Option<OrderItem> {
        let item = self.items.pop();
        self.recompute_total();
        item
    }

    pub fn computed_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Replaces whatever total was carried over with the sum of the lines.
    pub fn recompute_total(&mut self) {
        self.total = self.computed_total();
    }

    /// Keeps only the customer phone, which belongs to the counterparty
    /// rather than to the order.
    pub fn reset(&mut self) {
        let phone = self.customer_phone.take();
        *self = Self { customer_phone: phone, ..Self::default() };
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.items.is_empty() {
            return "🛒 Seu pedido ainda está vazio.".to_owned();
        }

        let mut lines = vec!["🛒 *Resumo do pedido*".to_owned()];
        lines.extend(self.items.iter().map(OrderItem::summary_line));
        lines.push(format!("*Total: {}*", format_brl(self.computed_total())));
        if let Some(kind) = self.order_kind {
            lines.push(format!("Tipo: {}", kind.label()));
        }
        if let Some(address) = &self.delivery_address {
            lines.push(format!("Endereço: {address}"));
        }
        lines.join("\n")
    }
}

/// Formats an amount the way Brazilian receipts do: `R$ 1.234,50`.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (units, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (index, digit) in units.chars().enumerate() {
        if index > 0 && (units.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents}")
}
