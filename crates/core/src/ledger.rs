use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::conversation::ConversationKey;
use crate::domain::order::{OrderDraft, OrderItem, OrderKind, PaymentMethod, MAX_QUANTITY};
use crate::domain::tenant::TenantConfig;
use crate::errors::{DomainError, LedgerError};

/// Downstream system of record for finalized orders.
///
/// The ledger owns de-duplication; every request carries an
/// `idempotency_key` derived from the counterparty and the draft contents.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn create_order(
        &self,
        tenant: &TenantConfig,
        request: &OrderRequest,
    ) -> Result<OrderAck, LedgerError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl From<&OrderItem> for OrderLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id.0.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderLine>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub order_kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    pub idempotency_key: String,
}

impl OrderRequest {
    /// Builds the creation request from a draft. The total is always
    /// recomputed from the lines; whatever the draft carries is ignored.
    pub fn from_draft(key: &ConversationKey, draft: &OrderDraft) -> Result<Self, DomainError> {
        if draft.items.is_empty() {
            return Err(DomainError::EmptyDraft);
        }
        if let Some(line) = draft.items.iter().find(|item| {
            item.quantity == 0 || item.quantity > MAX_QUANTITY || item.unit_price < Decimal::ZERO
        }) {
            return Err(DomainError::InvalidLine(line.id.0.clone()));
        }

        let customer_name = draft
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(DomainError::MissingCustomerName)?
            .to_owned();
        let order_kind = draft.order_kind.ok_or(DomainError::MissingOrderKind)?;
        let delivery_address = match order_kind {
            OrderKind::Delivery => Some(
                draft
                    .delivery_address
                    .clone()
                    .filter(|address| !address.trim().is_empty())
                    .ok_or(DomainError::MissingDeliveryAddress)?,
            ),
            OrderKind::DineIn => None,
        };
        let payment_method = draft.payment_method.ok_or(DomainError::MissingPaymentMethod)?;

        let items: Vec<OrderLine> = draft.items.iter().map(OrderLine::from).collect();
        let total = draft.computed_total();
        let idempotency_key = idempotency_key(key, &items, order_kind, payment_method);

        Ok(Self {
            customer_name,
            customer_phone: draft
                .customer_phone
                .clone()
                .unwrap_or_else(|| key.counterparty_id.clone()),
            items,
            total,
            payment_method,
            order_kind,
            delivery_address,
            idempotency_key,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    #[serde(alias = "display_id")]
    pub display_id: String,
    #[serde(default, alias = "queue_position")]
    pub queue_position: Option<u32>,
    #[serde(default, alias = "estimated_minutes")]
    pub estimated_minutes: Option<u32>,
}

impl OrderAck {
    pub fn display_label(&self) -> String {
        let trimmed = self.display_id.trim();
        if trimmed.starts_with('#') {
            trimmed.to_owned()
        } else {
            format!("#{trimmed}")
        }
    }
}

fn idempotency_key(
    key: &ConversationKey,
    items: &[OrderLine],
    order_kind: OrderKind,
    payment_method: PaymentMethod,
) -> String {
    let mut material = format!(
        "{}|{}|{order_kind:?}|{payment_method:?}",
        key.endpoint_id, key.counterparty_id
    );
    for item in items {
        let price = item.unit_price.normalize();
        material.push_str(&format!("|{}x{}@{price}", item.quantity, item.id));
    }
    sha256_hex(material.as_bytes())
}

fn sha256_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest.as_slice() {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{OrderAck, OrderRequest};
    use crate::domain::catalog::ItemId;
    use crate::domain::conversation::ConversationKey;
    use crate::domain::order::{OrderDraft, OrderItem, OrderKind, PaymentMethod};
    use crate::errors::DomainError;

    fn complete_draft() -> OrderDraft {
        let mut draft = OrderDraft::for_phone("5511999990000");
        draft.add_item(OrderItem {
            id: ItemId::new("burger-bovino"),
            name: "Hambúrguer de Bovino".to_owned(),
            quantity: 3,
            unit_price: Decimal::new(2_500, 2),
        });
        draft.customer_name = Some("Ana".to_owned());
        draft.order_kind = Some(OrderKind::DineIn);
        draft.payment_method = Some(PaymentMethod::InstantTransfer);
        draft
    }

    fn key() -> ConversationKey {
        ConversationKey::new("PN-1", "5511999990000")
    }

    #[test]
    fn request_total_ignores_stored_total() {
        let mut draft = complete_draft();
        draft.total = Decimal::new(1, 0);

        let request = OrderRequest::from_draft(&key(), &draft).expect("request");

        assert_eq!(request.total, Decimal::new(7_500, 2));
        assert_eq!(request.customer_phone, "5511999990000");
        assert_eq!(request.delivery_address, None);
    }

    #[test]
    fn delivery_requires_address() {
        let mut draft = complete_draft();
        draft.order_kind = Some(OrderKind::Delivery);

        let error = OrderRequest::from_draft(&key(), &draft).expect_err("missing address");
        assert_eq!(error, DomainError::MissingDeliveryAddress);
    }

    #[test]
    fn empty_draft_is_rejected() {
        let error =
            OrderRequest::from_draft(&key(), &OrderDraft::default()).expect_err("empty draft");
        assert_eq!(error, DomainError::EmptyDraft);
    }

    #[test]
    fn idempotency_key_is_stable_for_same_contents() {
        let first = OrderRequest::from_draft(&key(), &complete_draft()).expect("first");
        let second = OrderRequest::from_draft(&key(), &complete_draft()).expect("second");
        assert_eq!(first.idempotency_key, second.idempotency_key);
        assert_eq!(first.idempotency_key.len(), 64);

        let mut other = complete_draft();
        other.payment_method = Some(PaymentMethod::Cash);
        let third = OrderRequest::from_draft(&key(), &other).expect("third");
        assert_ne!(first.idempotency_key, third.idempotency_key);
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = OrderRequest::from_draft(&key(), &complete_draft()).expect("request");
        let json = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["customerName"], "Ana");
        assert_eq!(json["paymentMethod"], "instant_transfer");
        assert_eq!(json["orderKind"], "dine_in");
        assert!(json.get("deliveryAddress").is_none());
    }

    #[test]
    fn ack_accepts_both_field_styles_and_prefixes_hash() {
        let camel: OrderAck =
            serde_json::from_str(r#"{"displayId":"004","queuePosition":4,"estimatedMinutes":25}"#)
                .expect("camel");
        let snake: OrderAck =
            serde_json::from_str(r##"{"display_id":"#004","queue_position":4}"##).expect("snake");

        assert_eq!(camel.display_label(), "#004");
        assert_eq!(snake.display_label(), "#004");
        assert_eq!(snake.estimated_minutes, None);
    }
}
