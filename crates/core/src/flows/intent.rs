use crate::domain::catalog::CatalogItem;
use crate::domain::order::{OrderKind, PaymentMethod, PendingItem, MAX_QUANTITY, MIN_QUANTITY};
use crate::extract::{extract, fold, parse_quantity};
use crate::flows::states::{ConversationState, InboundInput, Intent, Rejection};
use crate::flows::transitions::address_is_valid;

pub const MENU_BROWSE_ID: &str = "menu.browse";
pub const MENU_SUMMARY_ID: &str = "menu.summary";
pub const MENU_HUMAN_ID: &str = "menu.human";
pub const MORE_YES_ID: &str = "more.yes";
pub const MORE_NO_ID: &str = "more.no";
pub const KIND_DINE_IN_ID: &str = "kind.dine_in";
pub const KIND_DELIVERY_ID: &str = "kind.delivery";
pub const PAY_CASH_ID: &str = "pay.cash";
pub const PAY_PIX_ID: &str = "pay.pix";
pub const PAY_CARD_ID: &str = "pay.card";
pub const NAME_PROFILE_ID: &str = "name.profile";
pub const ITEM_ID_PREFIX: &str = "item:";

const GREETINGS: &[&str] = &["oi", "oie", "ola", "bom dia", "boa tarde", "boa noite", "menu", "inicio"];
const HUMAN: &[&str] = &["atendente", "humano", "ajuda", "falar com alguem"];
const SUMMARY: &[&str] = &["resumo", "carrinho", "ver pedido", "meu pedido"];
const CANCEL: &[&str] = &["cancelar", "cancela", "cancelar pedido"];
const BACK: &[&str] = &["voltar", "volta"];
const BROWSE: &[&str] = &["cardapio", "catalogo", "ver cardapio", "fazer pedido"];
const YES: &[&str] = &["sim", "s", "quero", "mais", "claro"];
const NO: &[&str] = &["nao", "n", "so isso", "finalizar", "fechar"];
const DINE_IN: &[&str] = &["local", "no local", "comer aqui", "mesa"];
const DELIVERY: &[&str] = &["entrega", "entregar", "delivery"];
const CASH: &[&str] = &["dinheiro", "especie"];
const PIX: &[&str] = &["pix"];
const CARD: &[&str] = &["cartao", "credito", "debito"];

/// Short commands are only recognised when they are most of the message.
const COMMAND_MAX_WORDS: usize = 3;

/// Maps one inbound input to an intent for the given state.
///
/// `catalog` must be in display order, since numeric choices index into it.
/// Interactive ids win over their titles; a title is only re-parsed when the
/// id is not one this engine issued.
pub fn classify(
    state: ConversationState,
    input: &InboundInput,
    catalog: &[CatalogItem],
    natural_language: bool,
) -> Intent {
    match input {
        InboundInput::Unsupported { .. } => Intent::Unsupported,
        InboundInput::Selection { id, title } => classify_selection(id, title, catalog)
            .unwrap_or_else(|| classify_text(state, title, catalog, natural_language)),
        InboundInput::Text(text) => classify_text(state, text, catalog, natural_language),
    }
}

fn classify_selection(id: &str, title: &str, catalog: &[CatalogItem]) -> Option<Intent> {
    if let Some(item_id) = id.strip_prefix(ITEM_ID_PREFIX) {
        let item = catalog.iter().find(|item| item.id.as_str() == item_id);
        return Some(selected(item));
    }

    let intent = match id {
        MENU_BROWSE_ID => Intent::Browse,
        MENU_SUMMARY_ID => Intent::Summary,
        MENU_HUMAN_ID => Intent::HumanHelp,
        MORE_YES_ID => Intent::Yes,
        MORE_NO_ID => Intent::No,
        KIND_DINE_IN_ID => Intent::Kind(OrderKind::DineIn),
        KIND_DELIVERY_ID => Intent::Kind(OrderKind::Delivery),
        PAY_CASH_ID => Intent::Payment(PaymentMethod::Cash),
        PAY_PIX_ID => Intent::Payment(PaymentMethod::InstantTransfer),
        PAY_CARD_ID => Intent::Payment(PaymentMethod::Card),
        NAME_PROFILE_ID => match title.trim() {
            "" => Intent::Invalid(Rejection::EmptyName),
            name => Intent::Name(name.to_owned()),
        },
        _ => return None,
    };
    Some(intent)
}

fn classify_text(
    state: ConversationState,
    text: &str,
    catalog: &[CatalogItem],
    natural_language: bool,
) -> Intent {
    let normalized = normalize(text);

    if is_command(&normalized, SUMMARY) {
        return Intent::Summary;
    }
    if is_command(&normalized, CANCEL) {
        return Intent::Cancel;
    }
    if is_command(&normalized, BACK) {
        return Intent::Back;
    }

    match state {
        ConversationState::Initial => classify_initial(text, &normalized, catalog, natural_language),
        ConversationState::CatalogBrowse => {
            if is_command(&normalized, BROWSE) {
                Intent::Browse
            } else {
                select_from_text(text, &normalized, catalog)
            }
        }
        ConversationState::ItemQuantity => match parse_quantity(&normalized) {
            Some(quantity) if (MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) => {
                Intent::Quantity(quantity)
            }
            Some(quantity) => Intent::Invalid(Rejection::QuantityOutOfRange(quantity)),
            None => Intent::Invalid(Rejection::NotANumber),
        },
        ConversationState::AddMore => match normalized.as_str() {
            "1" => Intent::Yes,
            "2" => Intent::No,
            _ if starts_with_any(&normalized, NO) => Intent::No,
            _ if starts_with_any(&normalized, YES) => Intent::Yes,
            _ => Intent::Invalid(Rejection::ExpectedYesOrNo),
        },
        // Dine-in phrases are checked first: "nao precisa entregar" still
        // mentions delivery.
        ConversationState::OrderKind => match normalized.as_str() {
            "1" => Intent::Kind(OrderKind::DineIn),
            "2" => Intent::Kind(OrderKind::Delivery),
            _ if mentions_any(&normalized, DINE_IN) => Intent::Kind(OrderKind::DineIn),
            _ if mentions_any(&normalized, DELIVERY) => Intent::Kind(OrderKind::Delivery),
            _ => Intent::Invalid(Rejection::UnknownOrderKind),
        },
        ConversationState::DeliveryAddress => {
            let address = text.trim();
            if address_is_valid(address) {
                Intent::Address(address.to_owned())
            } else {
                Intent::Invalid(Rejection::AddressTooShort)
            }
        }
        ConversationState::CustomerName => match text.trim() {
            "" => Intent::Invalid(Rejection::EmptyName),
            name => Intent::Name(name.to_owned()),
        },
        // Option numbers only count as the whole answer, so "cartao em 2
        // vezes" is a card payment.
        ConversationState::PaymentMethod => match normalized.as_str() {
            "1" => Intent::Payment(PaymentMethod::Cash),
            "2" => Intent::Payment(PaymentMethod::InstantTransfer),
            "3" => Intent::Payment(PaymentMethod::Card),
            _ if mentions_any(&normalized, PIX) => Intent::Payment(PaymentMethod::InstantTransfer),
            _ if mentions_any(&normalized, CARD) => Intent::Payment(PaymentMethod::Card),
            _ if mentions_any(&normalized, CASH) => Intent::Payment(PaymentMethod::Cash),
            _ => Intent::Invalid(Rejection::UnknownPaymentMethod),
        },
    }
}

fn classify_initial(
    text: &str,
    normalized: &str,
    catalog: &[CatalogItem],
    natural_language: bool,
) -> Intent {
    match normalized {
        "1" => return Intent::Browse,
        "2" => return Intent::Summary,
        "3" => return Intent::HumanHelp,
        _ => {}
    }

    if starts_with_any(normalized, GREETINGS) {
        return Intent::Greeting;
    }
    if mentions_any(normalized, HUMAN) {
        return Intent::HumanHelp;
    }
    if is_command(normalized, BROWSE) {
        return Intent::Browse;
    }

    if natural_language {
        let extraction = extract(text, catalog);
        if !extraction.is_empty() {
            return Intent::NaturalOrder(extraction);
        }
    }
    Intent::Unrecognized
}

fn select_from_text(text: &str, normalized: &str, catalog: &[CatalogItem]) -> Intent {
    let item = match normalized.parse::<usize>() {
        Ok(index) => index.checked_sub(1).and_then(|index| catalog.get(index)),
        Err(_) => catalog
            .iter()
            .find(|item| item.id.as_str().eq_ignore_ascii_case(text.trim()))
            .or_else(|| catalog.iter().find(|item| normalize(&item.name) == normalized)),
    };
    selected(item)
}

fn selected(item: Option<&CatalogItem>) -> Intent {
    match item {
        Some(item) if item.is_orderable() => Intent::SelectItem(PendingItem::from(item)),
        Some(item) => Intent::Invalid(Rejection::ItemUnavailable(item.name.clone())),
        None => Intent::Invalid(Rejection::UnknownItem),
    }
}

/// Folds accents and case, turns punctuation into spaces and collapses runs
/// of whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = fold(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn mentions(normalized: &str, phrase: &str) -> bool {
    format!(" {normalized} ").contains(&format!(" {phrase} "))
}

fn mentions_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| mentions(normalized, phrase))
}

fn starts_with_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        normalized == *phrase
            || normalized.strip_prefix(*phrase).is_some_and(|rest| rest.starts_with(' '))
    })
}

fn is_command(normalized: &str, phrases: &[&str]) -> bool {
    normalized.split(' ').count() <= COMMAND_MAX_WORDS && mentions_any(normalized, phrases)
}

#[cfg(test)]
mod tests {
    use super::{classify, normalize, ITEM_ID_PREFIX, MORE_NO_ID};
    use crate::domain::catalog::{default_catalog, display_order};
    use crate::domain::order::{OrderKind, PaymentMethod};
    use crate::flows::states::{ConversationState as S, InboundInput, Intent, Rejection};

    fn text(value: &str) -> InboundInput {
        InboundInput::Text(value.to_owned())
    }

    fn classify_text(state: S, value: &str) -> Intent {
        classify(state, &text(value), &display_order(&default_catalog()), true)
    }

    #[test]
    fn initial_state_keywords() {
        assert_eq!(classify_text(S::Initial, "Oi, tudo bem?"), Intent::Greeting);
        assert_eq!(classify_text(S::Initial, "Boa noite!"), Intent::Greeting);
        assert_eq!(classify_text(S::Initial, "quero falar com um atendente"), Intent::HumanHelp);
        assert_eq!(classify_text(S::Initial, "1"), Intent::Browse);
        assert_eq!(classify_text(S::Initial, "2"), Intent::Summary);
        assert_eq!(classify_text(S::Initial, "3"), Intent::HumanHelp);
        assert_eq!(classify_text(S::Initial, "cardápio"), Intent::Browse);
        assert_eq!(classify_text(S::Initial, "qual o horario?"), Intent::Unrecognized);
    }

    #[test]
    fn natural_language_only_when_enabled() {
        let catalog = display_order(&default_catalog());
        let input = text("2 batatas fritas");

        assert!(matches!(classify(S::Initial, &input, &catalog, true), Intent::NaturalOrder(_)));
        assert_eq!(classify(S::Initial, &input, &catalog, false), Intent::Unrecognized);
    }

    #[test]
    fn global_commands_apply_in_every_state() {
        for state in S::ALL {
            assert_eq!(classify_text(state, "resumo"), Intent::Summary, "{state}");
            assert_eq!(classify_text(state, "Cancelar"), Intent::Cancel, "{state}");
            assert_eq!(classify_text(state, "voltar"), Intent::Back, "{state}");
        }
    }

    #[test]
    fn browse_selection_is_one_indexed_and_checks_availability() {
        let mut catalog = display_order(&default_catalog());
        let first = catalog[0].clone();

        match classify(S::CatalogBrowse, &text("1"), &catalog, true) {
            Intent::SelectItem(item) => assert_eq!(item.id, first.id),
            other => panic!("unexpected intent {other:?}"),
        }
        assert_eq!(
            classify(S::CatalogBrowse, &text("0"), &catalog, true),
            Intent::Invalid(Rejection::UnknownItem)
        );
        assert_eq!(
            classify(S::CatalogBrowse, &text("99"), &catalog, true),
            Intent::Invalid(Rejection::UnknownItem)
        );

        catalog[0].available = false;
        assert_eq!(
            classify(S::CatalogBrowse, &text("1"), &catalog, true),
            Intent::Invalid(Rejection::ItemUnavailable(first.name.clone()))
        );
        let by_id = InboundInput::Selection {
            id: format!("{ITEM_ID_PREFIX}{}", first.id),
            title: "2".to_owned(),
        };
        assert_eq!(
            classify(S::CatalogBrowse, &by_id, &catalog, true),
            Intent::Invalid(Rejection::ItemUnavailable(first.name))
        );
    }

    #[test]
    fn browse_accepts_catalog_id_and_name() {
        let catalog = display_order(&default_catalog());
        assert!(matches!(
            classify(S::CatalogBrowse, &text("refrigerante"), &catalog, true),
            Intent::SelectItem(item) if item.id.as_str() == "refrigerante"
        ));
        assert!(matches!(
            classify(S::CatalogBrowse, &text("batata frita"), &catalog, true),
            Intent::SelectItem(item) if item.id.as_str() == "batata-frita"
        ));
    }

    #[test]
    fn quantity_must_be_between_one_and_ten() {
        assert_eq!(classify_text(S::ItemQuantity, "3"), Intent::Quantity(3));
        assert_eq!(classify_text(S::ItemQuantity, "dez"), Intent::Quantity(10));
        assert_eq!(
            classify_text(S::ItemQuantity, "11"),
            Intent::Invalid(Rejection::QuantityOutOfRange(11))
        );
        assert_eq!(
            classify_text(S::ItemQuantity, "0"),
            Intent::Invalid(Rejection::QuantityOutOfRange(0))
        );
        assert_eq!(classify_text(S::ItemQuantity, "muitos"), Intent::Invalid(Rejection::NotANumber));
    }

    #[test]
    fn interactive_id_wins_over_title() {
        let selection =
            InboundInput::Selection { id: MORE_NO_ID.to_owned(), title: "Sim".to_owned() };
        assert_eq!(
            classify(S::AddMore, &selection, &display_order(&default_catalog()), true),
            Intent::No
        );

        let unknown = InboundInput::Selection { id: "legacy".to_owned(), title: "Sim".to_owned() };
        assert_eq!(
            classify(S::AddMore, &unknown, &display_order(&default_catalog()), true),
            Intent::Yes
        );
    }

    #[test]
    fn later_steps_parse_their_own_answers() {
        assert_eq!(classify_text(S::AddMore, "não, só isso"), Intent::No);
        assert_eq!(classify_text(S::AddMore, "sim"), Intent::Yes);
        assert_eq!(classify_text(S::OrderKind, "entrega"), Intent::Kind(OrderKind::Delivery));
        assert_eq!(classify_text(S::OrderKind, "no local"), Intent::Kind(OrderKind::DineIn));
        assert_eq!(
            classify_text(S::DeliveryAddress, "Rua A 1"),
            Intent::Invalid(Rejection::AddressTooShort)
        );
        assert_eq!(
            classify_text(S::DeliveryAddress, "  Rua das Flores 123  "),
            Intent::Address("Rua das Flores 123".to_owned())
        );
        assert_eq!(classify_text(S::CustomerName, "  Ana "), Intent::Name("Ana".to_owned()));
        assert_eq!(classify_text(S::CustomerName, "   "), Intent::Invalid(Rejection::EmptyName));
        assert_eq!(
            classify_text(S::PaymentMethod, "pix"),
            Intent::Payment(PaymentMethod::InstantTransfer)
        );
        assert_eq!(classify_text(S::PaymentMethod, "Cartão"), Intent::Payment(PaymentMethod::Card));
        assert_eq!(classify_text(S::PaymentMethod, "1"), Intent::Payment(PaymentMethod::Cash));
    }

    #[test]
    fn option_numbers_only_count_as_the_whole_answer() {
        assert_eq!(
            classify_text(S::PaymentMethod, "cartão em 2 vezes"),
            Intent::Payment(PaymentMethod::Card)
        );
        assert_eq!(
            classify_text(S::PaymentMethod, "2"),
            Intent::Payment(PaymentMethod::InstantTransfer)
        );
        assert_eq!(classify_text(S::PaymentMethod, "3"), Intent::Payment(PaymentMethod::Card));
        assert_eq!(
            classify_text(S::PaymentMethod, "vou pagar 1 parte"),
            Intent::Invalid(Rejection::UnknownPaymentMethod)
        );

        assert_eq!(classify_text(S::OrderKind, "1"), Intent::Kind(OrderKind::DineIn));
        assert_eq!(classify_text(S::OrderKind, "2"), Intent::Kind(OrderKind::Delivery));
        assert_eq!(
            classify_text(S::OrderKind, "somos 2 pessoas"),
            Intent::Invalid(Rejection::UnknownOrderKind)
        );

        assert_eq!(classify_text(S::AddMore, "1"), Intent::Yes);
        assert_eq!(classify_text(S::AddMore, "2"), Intent::No);
        assert_eq!(
            classify_text(S::AddMore, "2 coxinhas"),
            Intent::Invalid(Rejection::ExpectedYesOrNo)
        );
    }

    #[test]
    fn dine_in_phrase_wins_over_negated_delivery() {
        assert_eq!(
            classify_text(S::OrderKind, "não precisa entregar, vou comer no local"),
            Intent::Kind(OrderKind::DineIn)
        );
        assert_eq!(
            classify_text(S::OrderKind, "quero delivery"),
            Intent::Kind(OrderKind::Delivery)
        );
    }

    #[test]
    fn unsupported_kinds_map_to_unsupported() {
        let input = InboundInput::Unsupported { kind: "image".to_owned() };
        assert_eq!(classify(S::CatalogBrowse, &input, &[], true), Intent::Unsupported);
    }

    #[test]
    fn normalize_strips_punctuation_and_accents() {
        assert_eq!(normalize("  Não,   SÓ isso!! "), "nao so isso");
    }
}
