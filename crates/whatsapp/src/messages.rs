use serde::Serialize;

use comanda_core::flows::reply::{MAX_BUTTONS, MAX_BUTTON_TITLE_CHARS, MAX_LIST_ROWS};
use comanda_core::flows::{ListSection, Reply, ReplyButton};

pub const MAX_TEXT_BODY_CHARS: usize = 4_096;
pub const MAX_INTERACTIVE_BODY_CHARS: usize = 1_024;
pub const MAX_ROW_TITLE_CHARS: usize = 24;
pub const MAX_ROW_DESCRIPTION_CHARS: usize = 72;
pub const MAX_SECTION_TITLE_CHARS: usize = 24;
pub const MAX_LIST_BUTTON_CHARS: usize = 20;

/// Cloud API `POST /{endpoint}/messages` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: String,
    #[serde(flatten)]
    pub content: OutboundContent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundContent {
    Text { text: TextContent },
    Interactive { interactive: Interactive },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub preview_url: bool,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Interactive {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub body: InteractiveBody,
    pub action: Action,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractiveBody {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Action {
    Buttons { buttons: Vec<ButtonAction> },
    List { button: String, sections: Vec<Section> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub reply: ButtonReply,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OutboundMessage {
    /// Renders a channel-neutral reply within the provider's payload limits.
    pub fn from_reply(to: impl Into<String>, reply: &Reply) -> Self {
        let content = match reply {
            Reply::Text { body } => OutboundContent::Text {
                text: TextContent {
                    preview_url: false,
                    body: truncate(body, MAX_TEXT_BODY_CHARS),
                },
            },
            Reply::Buttons { body, buttons } => OutboundContent::Interactive {
                interactive: Interactive {
                    kind: "button",
                    body: interactive_body(body),
                    action: Action::Buttons { buttons: button_actions(buttons) },
                },
            },
            Reply::List { body, button_label, sections } => OutboundContent::Interactive {
                interactive: Interactive {
                    kind: "list",
                    body: interactive_body(body),
                    action: Action::List {
                        button: truncate(button_label, MAX_LIST_BUTTON_CHARS),
                        sections: list_sections(sections),
                    },
                },
            },
        };

        Self { messaging_product: "whatsapp", recipient_type: "individual", to: to.into(), content }
    }
}

fn interactive_body(body: &str) -> InteractiveBody {
    InteractiveBody { text: truncate(body, MAX_INTERACTIVE_BODY_CHARS) }
}

fn button_actions(buttons: &[ReplyButton]) -> Vec<ButtonAction> {
    buttons
        .iter()
        .take(MAX_BUTTONS)
        .map(|button| ButtonAction {
            kind: "reply",
            reply: ButtonReply {
                id: button.id.clone(),
                title: truncate(&button.title, MAX_BUTTON_TITLE_CHARS),
            },
        })
        .collect()
}

/// Keeps at most ten rows across all sections; sections left empty are dropped.
fn list_sections(sections: &[ListSection]) -> Vec<Section> {
    let mut remaining = MAX_LIST_ROWS;
    let mut rendered = Vec::new();
    for section in sections {
        if remaining == 0 {
            break;
        }
        let rows: Vec<Row> = section
            .rows
            .iter()
            .take(remaining)
            .map(|row| Row {
                id: row.id.clone(),
                title: truncate(&row.title, MAX_ROW_TITLE_CHARS),
                description: row
                    .description
                    .as_deref()
                    .map(|description| truncate(description, MAX_ROW_DESCRIPTION_CHARS)),
            })
            .collect();
        if rows.is_empty() {
            continue;
        }
        remaining -= rows.len();
        rendered.push(Section { title: truncate(&section.title, MAX_SECTION_TITLE_CHARS), rows });
    }
    rendered
}

/// Char-aware truncation; over-long text ends with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use comanda_core::flows::{ListRow, ListSection, Reply, ReplyButton};

    use super::{truncate, OutboundMessage};

    #[test]
    fn text_reply_matches_cloud_api_shape() {
        let message = OutboundMessage::from_reply("5511999990000", &Reply::text("Olá"));

        assert_eq!(
            serde_json::to_value(&message).expect("serialize"),
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "5511999990000",
                "type": "text",
                "text": { "preview_url": false, "body": "Olá" }
            })
        );
    }

    #[test]
    fn buttons_are_capped_and_titles_truncated() {
        let buttons = (1..=4)
            .map(|index| ReplyButton {
                id: format!("b{index}"),
                title: format!("Opção muito comprida número {index}"),
            })
            .collect();
        let reply = Reply::Buttons { body: "Escolha".to_owned(), buttons };

        let value = serde_json::to_value(OutboundMessage::from_reply("1", &reply)).expect("json");

        assert_eq!(value["type"], "interactive");
        assert_eq!(value["interactive"]["type"], "button");
        let rendered = value["interactive"]["action"]["buttons"].as_array().expect("buttons");
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0]["type"], "reply");
        assert_eq!(rendered[0]["reply"]["id"], "b1");
        let title = rendered[0]["reply"]["title"].as_str().expect("title");
        assert_eq!(title.chars().count(), 20);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn list_keeps_ten_rows_across_sections() {
        let section = |name: &str, count: usize| ListSection {
            title: name.to_owned(),
            rows: (0..count)
                .map(|index| ListRow {
                    id: format!("item:{name}-{index}"),
                    title: format!("{index}. {name}"),
                    description: Some("R$ 10,00".to_owned()),
                })
                .collect(),
        };
        let reply = Reply::List {
            body: "Cardápio".to_owned(),
            button_label: "Ver itens".to_owned(),
            sections: vec![section("Lanches", 6), section("Bebidas", 6), section("Doces", 2)],
        };

        let value = serde_json::to_value(OutboundMessage::from_reply("1", &reply)).expect("json");

        let action = &value["interactive"]["action"];
        assert_eq!(action["button"], "Ver itens");
        let sections = action["sections"].as_array().expect("sections");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0]["rows"].as_array().map(Vec::len), Some(6));
        assert_eq!(sections[1]["rows"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("Açaí", 4), "Açaí");
        assert_eq!(truncate("Hambúrguer", 5), "Hamb…");
    }
}
