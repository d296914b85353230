use chrono::Duration;
use serde::Serialize;

use crate::domain::catalog::{CatalogItem, StoreStatus};
use crate::domain::order::{format_brl, OrderDraft, PendingItem, MAX_QUANTITY, MIN_QUANTITY};
use crate::flows::intent::{
    ITEM_ID_PREFIX, KIND_DELIVERY_ID, KIND_DINE_IN_ID, MENU_BROWSE_ID, MENU_HUMAN_ID,
    MENU_SUMMARY_ID, MORE_NO_ID, MORE_YES_ID, NAME_PROFILE_ID, PAY_CARD_ID, PAY_CASH_ID,
    PAY_PIX_ID,
};
use crate::flows::states::Rejection;
use crate::flows::transitions::MIN_ADDRESS_LEN;

pub const MAX_LIST_ROWS: usize = 10;
pub const MAX_BUTTONS: usize = 3;
pub const MAX_BUTTON_TITLE_CHARS: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

/// Channel-neutral outbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text { body: String },
    Buttons { body: String, buttons: Vec<ReplyButton> },
    List { body: String, button_label: String, sections: Vec<ListSection> },
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Text { body } | Self::Buttons { body, .. } | Self::List { body, .. } => body,
        }
    }

    /// Puts a line above the body, keeping any buttons or rows.
    pub fn with_note(mut self, note: &str) -> Self {
        let body = match &mut self {
            Self::Text { body } | Self::Buttons { body, .. } | Self::List { body, .. } => body,
        };
        *body = format!("{note}\n\n{body}");
        self
    }

    /// Everything the counterparty would read, options included.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text { body } => body.clone(),
            Self::Buttons { body, buttons } => {
                let mut lines = vec![body.clone()];
                lines.extend(buttons.iter().map(|button| format!("[{}]", button.title)));
                lines.join("\n")
            }
            Self::List { body, sections, .. } => {
                let mut lines = vec![body.clone()];
                for row in sections.iter().flat_map(|section| &section.rows) {
                    match &row.description {
                        Some(description) => lines.push(format!("{} ({description})", row.title)),
                        None => lines.push(row.title.clone()),
                    }
                }
                lines.join("\n")
            }
        }
    }
}

fn button(id: &str, title: &str) -> ReplyButton {
    ReplyButton { id: id.to_owned(), title: title.to_owned() }
}

pub fn menu(store_name: &str) -> Reply {
    Reply::Buttons {
        body: format!("Olá! Bem-vindo(a) à *{store_name}* 👋\nComo podemos ajudar?"),
        buttons: vec![
            button(MENU_BROWSE_ID, "Ver cardápio"),
            button(MENU_SUMMARY_ID, "Meu pedido"),
            button(MENU_HUMAN_ID, "Falar com atendente"),
        ],
    }
}

pub fn menu_text(store_name: &str) -> Reply {
    Reply::text(format!(
        "Olá! Aqui é a *{store_name}*. Responda com o número da opção:\n\
         1. Ver cardápio\n\
         2. Ver meu pedido\n\
         3. Falar com atendente\n\n\
         Você também pode escrever o pedido, por exemplo: \"2 hambúrguer de bovino\"."
    ))
}

/// Renders the catalog in display order. Up to ten entries become an
/// interactive list; larger catalogs fall back to a numbered text.
pub fn catalog(items: &[CatalogItem]) -> Reply {
    if items.is_empty() {
        return Reply::text("Nenhum item disponível no momento. Tente novamente mais tarde.");
    }

    let numbered: Vec<(usize, &CatalogItem)> =
        items.iter().enumerate().map(|(index, item)| (index + 1, item)).collect();

    if items.len() > MAX_LIST_ROWS {
        let mut lines = vec!["📋 *Cardápio* (responda com o número do item):".to_owned()];
        lines.extend(numbered.iter().map(|(number, item)| {
            let mut line = format!("{number}. {} - {}", item.name, format_brl(item.price));
            if !item.is_orderable() {
                line.push_str(" (indisponível)");
            }
            line
        }));
        return Reply::text(lines.join("\n"));
    }

    let mut sections: Vec<ListSection> = Vec::new();
    for (number, item) in numbered {
        let row = ListRow {
            id: format!("{ITEM_ID_PREFIX}{}", item.id),
            title: format!("{number}. {}", item.name),
            description: Some(if item.is_orderable() {
                format_brl(item.price)
            } else {
                format!("{} · indisponível", format_brl(item.price))
            }),
        };
        let title = section_title(&item.category);
        match sections.last_mut() {
            Some(section) if section.title == title => section.rows.push(row),
            _ => sections.push(ListSection { title, rows: vec![row] }),
        }
    }

    Reply::List {
        body: "📋 Escolha um item do cardápio (ou responda com o número):".to_owned(),
        button_label: "Ver cardápio".to_owned(),
        sections,
    }
}

fn section_title(category: &str) -> String {
    let mut chars = category.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Cardápio".to_owned(),
    }
}

pub fn quantity_prompt(pending: Option<&PendingItem>) -> Reply {
    match pending {
        Some(item) => Reply::text(format!(
            "Quantas unidades de *{}* ({} cada)? Responda de {MIN_QUANTITY} a {MAX_QUANTITY}.",
            item.name,
            format_brl(item.unit_price)
        )),
        None => Reply::text(format!("Quantas unidades? Responda de {MIN_QUANTITY} a {MAX_QUANTITY}.")),
    }
}

pub fn add_more_prompt(draft: &OrderDraft) -> Reply {
    Reply::Buttons {
        body: format!("{}\n\nDeseja adicionar mais algum item?", draft.summary()),
        buttons: vec![button(MORE_YES_ID, "Sim, adicionar"), button(MORE_NO_ID, "Não, continuar")],
    }
}

pub fn order_kind_prompt() -> Reply {
    Reply::Buttons {
        body: "Como você prefere receber o pedido?".to_owned(),
        buttons: vec![button(KIND_DINE_IN_ID, "Consumir no local"), button(KIND_DELIVERY_ID, "Entrega")],
    }
}

pub fn address_prompt() -> Reply {
    Reply::text("📍 Informe o endereço completo para entrega (rua, número e bairro):")
}

/// Asks for the name. A short provider profile name is offered as a
/// one-tap answer.
pub fn name_prompt(profile_name: Option<&str>) -> Reply {
    let body = "Qual é o seu nome?";
    match profile_name.map(str::trim) {
        Some(name) if !name.is_empty() && name.chars().count() <= MAX_BUTTON_TITLE_CHARS => {
            Reply::Buttons {
                body: format!("{body} Se preferir, toque no botão abaixo ou digite outro nome."),
                buttons: vec![button(NAME_PROFILE_ID, name)],
            }
        }
        _ => Reply::text(body),
    }
}

pub fn payment_prompt(draft: &OrderDraft) -> Reply {
    Reply::Buttons {
        body: format!("{}\n\n💳 Como deseja pagar?", draft.summary()),
        buttons: vec![
            button(PAY_CASH_ID, "Dinheiro"),
            button(PAY_PIX_ID, "Pix"),
            button(PAY_CARD_ID, "Cartão"),
        ],
    }
}

pub fn added_from_text(draft: &OrderDraft, added: usize) -> String {
    let lines: Vec<String> = draft
        .items
        .iter()
        .rev()
        .take(added)
        .rev()
        .map(|item| format!("• {}", item.summary_line()))
        .collect();
    format!("Anotei:\n{}", lines.join("\n"))
}

pub fn closed_store(status: &StoreStatus) -> Reply {
    let mut lines = vec![status
        .message
        .clone()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| "🔒 Estamos fechados no momento.".to_owned())];
    if let Some(next_open) = &status.next_open_time {
        lines.push(format!("Voltamos a atender às {next_open}."));
    }
    Reply::text(lines.join("\n"))
}

pub fn human_help(position: Option<usize>, waited: Duration) -> Reply {
    let mut lines = vec!["🙋 Um atendente vai falar com você em breve.".to_owned()];
    if let Some(position) = position {
        lines.push(format!("Sua posição na fila: {position}º"));
    }
    let minutes = waited.num_minutes();
    if minutes > 0 {
        lines.push(format!("Você está aguardando há {minutes} min."));
    }
    Reply::text(lines.join("\n"))
}

pub fn human_unavailable() -> Reply {
    Reply::text("No momento não temos atendimento humano por aqui. Posso ajudar com o seu pedido!")
}

pub fn cancelled() -> Reply {
    Reply::text("❌ Pedido cancelado. Quando quiser, é só mandar um \"oi\" para recomeçar.")
}

pub fn unsupported_note() -> &'static str {
    "Por enquanto só entendo mensagens de texto e as opções dos botões."
}

pub fn rejection_note(rejection: &Rejection) -> String {
    match rejection {
        Rejection::NotUnderstood => "Não entendi. 🤔".to_owned(),
        Rejection::UnknownItem => "Não encontrei esse item no cardápio.".to_owned(),
        Rejection::ItemUnavailable(name) => {
            format!("*{name}* está indisponível no momento. Escolha outro item.")
        }
        Rejection::NotANumber => {
            format!("Informe a quantidade com um número de {MIN_QUANTITY} a {MAX_QUANTITY}.")
        }
        Rejection::QuantityOutOfRange(quantity) => {
            format!("{quantity} não é uma quantidade válida: use de {MIN_QUANTITY} a {MAX_QUANTITY}.")
        }
        Rejection::ExpectedYesOrNo => "Responda *sim* ou *não*.".to_owned(),
        Rejection::UnknownOrderKind => "Escolha *no local* ou *entrega*.".to_owned(),
        Rejection::AddressTooShort => {
            format!("Endereço muito curto: informe pelo menos {MIN_ADDRESS_LEN} caracteres.")
        }
        Rejection::EmptyName => "Por favor, informe o seu nome.".to_owned(),
        Rejection::UnknownPaymentMethod => "Forma de pagamento não reconhecida.".to_owned(),
    }
}
