use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::{OrderKind, PaymentMethod, PendingItem};
use crate::extract::Extraction;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    #[default]
    Initial,
    CatalogBrowse,
    ItemQuantity,
    AddMore,
    OrderKind,
    DeliveryAddress,
    CustomerName,
    PaymentMethod,
}

impl ConversationState {
    pub const ALL: [ConversationState; 8] = [
        Self::Initial,
        Self::CatalogBrowse,
        Self::ItemQuantity,
        Self::AddMore,
        Self::OrderKind,
        Self::DeliveryAddress,
        Self::CustomerName,
        Self::PaymentMethod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::CatalogBrowse => "CATALOG_BROWSE",
            Self::ItemQuantity => "ITEM_QUANTITY",
            Self::AddMore => "ADD_MORE",
            Self::OrderKind => "ORDER_KIND",
            Self::DeliveryAddress => "DELIVERY_ADDRESS",
            Self::CustomerName => "CUSTOMER_NAME",
            Self::PaymentMethod => "PAYMENT_METHOD",
        }
    }

    /// States where nothing has been committed to the draft yet.
    pub fn is_pre_order(&self) -> bool {
        matches!(self, Self::Initial | Self::CatalogBrowse)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown conversation state `{0}`")]
pub struct UnknownState(pub String);

impl FromStr for ConversationState {
    type Err = UnknownState;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == value)
            .ok_or_else(|| UnknownState(value.to_owned()))
    }
}

/// What one inbound message carries once the provider envelope is gone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundInput {
    Text(String),
    Selection { id: String, title: String },
    Unsupported { kind: String },
}

/// Why an input could not be used in the current state. The state does not
/// advance and the step prompt is shown again with a note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    NotUnderstood,
    UnknownItem,
    ItemUnavailable(String),
    NotANumber,
    QuantityOutOfRange(u32),
    ExpectedYesOrNo,
    UnknownOrderKind,
    AddressTooShort,
    EmptyName,
    UnknownPaymentMethod,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Browse,
    Summary,
    HumanHelp,
    Back,
    Cancel,
    NaturalOrder(Extraction),
    SelectItem(PendingItem),
    Quantity(u32),
    Yes,
    No,
    Kind(OrderKind),
    Address(String),
    Name(String),
    Payment(PaymentMethod),
    Invalid(Rejection),
    Unsupported,
    Unrecognized,
}

impl Intent {
    /// Intents that still get through while the store is closed.
    pub fn bypasses_closed_store(&self) -> bool {
        matches!(self, Self::Summary | Self::HumanHelp | Self::Cancel)
    }
}

/// Side effect attached to an edge of the transition table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    ShowMenu,
    ShowMenuAsText,
    ShowCatalog,
    ShowSummary,
    RequestHuman,
    ResetDraft,
    AppendExtracted(Extraction),
    SelectItem(PendingItem),
    ClearPending,
    AddPendingItem(u32),
    ReopenLastItem,
    SetOrderKind(OrderKind),
    SetAddress(String),
    SetName(String),
    Submit(PaymentMethod),
    Reprompt(Rejection),
    ExplainUnsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: ConversationState,
    pub to: ConversationState,
    pub effect: Effect,
}

#[cfg(test)]
mod tests {
    use super::ConversationState;

    #[test]
    fn state_names_round_trip_through_strings() {
        for state in ConversationState::ALL {
            assert_eq!(state.as_str().parse::<ConversationState>(), Ok(state));
        }
        assert!("WAITING".parse::<ConversationState>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ConversationState::DeliveryAddress).expect("serialize");
        assert_eq!(json, "\"DELIVERY_ADDRESS\"");
    }
}
