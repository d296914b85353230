use crate::domain::order::{OrderDraft, OrderKind};
use crate::flows::states::{ConversationState, Effect, Intent, Rejection, Transition};

/// The full conversation graph: `(from, intent) -> (to, effect)`.
///
/// Every reverse edge for `Back` is listed explicitly. Anything not listed
/// keeps the state and re-prompts.
pub fn transition(from: ConversationState, intent: &Intent, draft: &OrderDraft) -> Transition {
    use ConversationState as S;

    let (to, effect) = match (from, intent) {
        (_, Intent::Summary) => (from, Effect::ShowSummary),
        (_, Intent::Cancel) => (S::Initial, Effect::ResetDraft),
        (_, Intent::Unsupported) => (from, Effect::ExplainUnsupported),
        (_, Intent::Invalid(rejection)) => (from, Effect::Reprompt(rejection.clone())),

        (S::Initial, Intent::Greeting) => (S::Initial, Effect::ShowMenu),
        (S::Initial, Intent::HumanHelp) => (S::Initial, Effect::RequestHuman),
        (S::Initial, Intent::Browse) | (S::CatalogBrowse, Intent::Browse) => {
            (S::CatalogBrowse, Effect::ShowCatalog)
        }
        (S::Initial, Intent::NaturalOrder(extraction)) => {
            let to = match (extraction.order_kind, extraction.address.as_deref()) {
                (Some(OrderKind::Delivery), Some(address)) if address_is_valid(address) => {
                    S::CustomerName
                }
                (Some(OrderKind::Delivery), _) => S::DeliveryAddress,
                (Some(OrderKind::DineIn), _) => S::CustomerName,
                (None, _) => S::OrderKind,
            };
            (to, Effect::AppendExtracted(extraction.clone()))
        }
        (S::Initial, Intent::Unrecognized) => (S::Initial, Effect::ShowMenuAsText),

        (S::CatalogBrowse, Intent::SelectItem(item)) => {
            (S::ItemQuantity, Effect::SelectItem(item.clone()))
        }
        (S::ItemQuantity, Intent::Quantity(quantity)) => {
            (S::AddMore, Effect::AddPendingItem(*quantity))
        }
        (S::AddMore, Intent::Yes) => (S::CatalogBrowse, Effect::ShowCatalog),
        (S::AddMore, Intent::No) => (S::OrderKind, Effect::None),
        (S::OrderKind, Intent::Kind(kind)) => {
            let to = match kind {
                OrderKind::DineIn => S::CustomerName,
                OrderKind::Delivery => S::DeliveryAddress,
            };
            (to, Effect::SetOrderKind(*kind))
        }
        (S::DeliveryAddress, Intent::Address(address)) => {
            (S::CustomerName, Effect::SetAddress(address.clone()))
        }
        (S::CustomerName, Intent::Name(name)) => (S::PaymentMethod, Effect::SetName(name.clone())),
        (S::PaymentMethod, Intent::Payment(method)) => (S::Initial, Effect::Submit(*method)),

        (S::Initial, Intent::Back) | (S::CatalogBrowse, Intent::Back) => {
            (S::Initial, Effect::ShowMenu)
        }
        (S::ItemQuantity, Intent::Back) => (S::CatalogBrowse, Effect::ClearPending),
        (S::AddMore, Intent::Back) => (S::ItemQuantity, Effect::ReopenLastItem),
        (S::OrderKind, Intent::Back) => (S::AddMore, Effect::None),
        (S::DeliveryAddress, Intent::Back) => (S::OrderKind, Effect::None),
        (S::CustomerName, Intent::Back) => match draft.order_kind {
            Some(OrderKind::Delivery) => (S::DeliveryAddress, Effect::None),
            _ => (S::OrderKind, Effect::None),
        },
        (S::PaymentMethod, Intent::Back) => (S::CustomerName, Effect::None),

        (state, _) => (state, Effect::Reprompt(expected_input(state))),
    };

    Transition { from, to, effect }
}

/// Minimum accepted length of a delivery address, in characters.
pub const MIN_ADDRESS_LEN: usize = 10;

pub fn address_is_valid(address: &str) -> bool {
    address.trim().chars().count() >= MIN_ADDRESS_LEN
}

fn expected_input(state: ConversationState) -> Rejection {
    use ConversationState as S;

    match state {
        S::Initial => Rejection::NotUnderstood,
        S::CatalogBrowse => Rejection::UnknownItem,
        S::ItemQuantity => Rejection::NotANumber,
        S::AddMore => Rejection::ExpectedYesOrNo,
        S::OrderKind => Rejection::UnknownOrderKind,
        S::DeliveryAddress => Rejection::AddressTooShort,
        S::CustomerName => Rejection::EmptyName,
        S::PaymentMethod => Rejection::UnknownPaymentMethod,
    }
}
