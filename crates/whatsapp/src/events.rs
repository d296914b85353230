use serde::Deserialize;
use tracing::{debug, warn};

use comanda_core::domain::conversation::ConversationKey;
use comanda_core::flows::{Inbound, InboundInput};

/// One inbound customer message, flattened out of a webhook delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub endpoint_id: String,
    pub counterparty_id: String,
    pub message_id: String,
    pub profile_name: Option<String>,
    pub input: InboundInput,
}

impl InboundEvent {
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.endpoint_id, &self.counterparty_id)
    }

    pub fn to_inbound(&self) -> Inbound {
        Inbound {
            message_id: self.message_id.clone(),
            input: self.input.clone(),
            profile_name: self.profile_name.clone(),
        }
    }

    pub fn kind(&self) -> &str {
        match &self.input {
            InboundInput::Text(_) => "text",
            InboundInput::Selection { .. } => "selection",
            InboundInput::Unsupported { kind } => kind,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeliveryPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
struct Change {
    #[serde(default)]
    value: Option<ChangeValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default, alias = "endpoint_id")]
    phone_number_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Contact {
    #[serde(default)]
    wa_id: Option<String>,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize)]
struct Profile {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMessage {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    text: Option<TextBody>,
    #[serde(default)]
    interactive: Option<Interactive>,
    #[serde(default)]
    button: Option<QuickReplyButton>,
}

#[derive(Debug, Default, Deserialize)]
struct TextBody {
    #[serde(default)]
    body: String,
}

#[derive(Debug, Default, Deserialize)]
struct Interactive {
    #[serde(default)]
    button_reply: Option<Choice>,
    #[serde(default)]
    list_reply: Option<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct QuickReplyButton {
    #[serde(default)]
    payload: Option<String>,
    #[serde(default)]
    text: String,
}

/// Flattens a raw webhook body into inbound events, in payload order.
///
/// Never fails: an empty or malformed body yields no events, and individual
/// messages without a sender are dropped.
pub fn parse_delivery(body: &[u8]) -> Vec<InboundEvent> {
    if body.iter().all(u8::is_ascii_whitespace) {
        debug!(event_name = "ingress.webhook.empty_body", "webhook body is empty");
        return Vec::new();
    }

    let payload = match serde_json::from_slice::<DeliveryPayload>(body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(
                event_name = "ingress.webhook.malformed",
                error = %error,
                "webhook body could not be parsed; acknowledging anyway"
            );
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    for value in payload
        .entry
        .into_iter()
        .flat_map(|entry| entry.changes)
        .filter_map(|change| change.value)
    {
        let endpoint_id = value
            .metadata
            .and_then(|metadata| metadata.phone_number_id)
            .unwrap_or_default();

        for message in value.messages {
            let Some(counterparty_id) = message.from.clone().filter(|from| !from.is_empty())
            else {
                continue;
            };
            let profile_name = value
                .contacts
                .iter()
                .find(|contact| contact.wa_id.as_deref() == Some(counterparty_id.as_str()))
                .or_else(|| value.contacts.first())
                .and_then(|contact| contact.profile.as_ref())
                .and_then(|profile| profile.name.clone())
                .filter(|name| !name.trim().is_empty());

            events.push(InboundEvent {
                endpoint_id: endpoint_id.clone(),
                message_id: message.id.clone().unwrap_or_default(),
                profile_name,
                input: message_input(message),
                counterparty_id,
            });
        }
    }

    events
}

fn message_input(message: RawMessage) -> InboundInput {
    let kind = message.kind.unwrap_or_default();
    match kind.as_str() {
        "text" => InboundInput::Text(message.text.map(|text| text.body).unwrap_or_default()),
        "interactive" => {
            let choice = message
                .interactive
                .and_then(|interactive| interactive.button_reply.or(interactive.list_reply));
            match choice {
                Some(choice) => InboundInput::Selection { id: choice.id, title: choice.title },
                None => InboundInput::Unsupported { kind },
            }
        }
        "button" => match message.button {
            Some(button) => InboundInput::Selection {
                id: button.payload.unwrap_or_else(|| button.text.clone()),
                title: button.text,
            },
            None => InboundInput::Unsupported { kind },
        },
        "" => InboundInput::Unsupported { kind: "unknown".to_owned() },
        _ => InboundInput::Unsupported { kind },
    }
}
