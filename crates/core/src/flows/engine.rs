use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::catalog::{display_order, CatalogItem};
use crate::domain::conversation::Conversation;
use crate::domain::order::{OrderDraft, OrderItem, OrderKind, PendingItem};
use crate::domain::tenant::TenantConfig;
use crate::extract::Extraction;
use crate::flows::intent::classify;
use crate::flows::reply::{self, Reply};
use crate::flows::states::{ConversationState, Effect, InboundInput};
use crate::flows::transitions::{address_is_valid, transition};
use crate::gateway::CatalogGateway;
use crate::ledger::OrderLedger;
use crate::priority::PriorityTracker;
use crate::submission::submit_order;

/// One inbound message addressed to a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    pub message_id: String,
    pub input: InboundInput,
    pub profile_name: Option<String>,
}

impl Inbound {
    pub fn text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            input: InboundInput::Text(text.into()),
            profile_name: None,
        }
    }

    pub fn selection(
        message_id: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            input: InboundInput::Selection { id: id.into(), title: title.into() },
            profile_name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub reply: Reply,
    pub from: ConversationState,
    pub to: ConversationState,
}

/// Drives one conversation one message at a time.
///
/// The engine holds no per-conversation state: the caller loads the
/// [`Conversation`], hands it to [`ConversationEngine::step`] and persists it
/// afterwards.
#[derive(Clone)]
pub struct ConversationEngine {
    catalog: Arc<dyn CatalogGateway>,
    ledger: Arc<dyn OrderLedger>,
    priority: Arc<PriorityTracker>,
}

impl ConversationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogGateway>,
        ledger: Arc<dyn OrderLedger>,
        priority: Arc<PriorityTracker>,
    ) -> Self {
        Self { catalog, ledger, priority }
    }

    pub fn priority(&self) -> &Arc<PriorityTracker> {
        &self.priority
    }

    pub async fn step(
        &self,
        conversation: &mut Conversation,
        inbound: &Inbound,
        tenant: &TenantConfig,
        now: DateTime<Utc>,
    ) -> StepOutcome {
        let from = conversation.state;
        let mut catalog: Option<Vec<CatalogItem>> = None;

        let needs_catalog = from == ConversationState::CatalogBrowse
            || (from == ConversationState::Initial
                && tenant.features.natural_language
                && matches!(inbound.input, InboundInput::Text(_)));
        if needs_catalog {
            self.load_catalog(&mut catalog, tenant).await;
        }

        let intent = classify(
            from,
            &inbound.input,
            catalog.as_deref().unwrap_or_default(),
            tenant.features.natural_language,
        );

        if !intent.bypasses_closed_store()
            && (from.is_pre_order() || conversation.draft.is_empty())
        {
            let status = self.catalog.fetch_store_status(tenant).await;
            if !status.is_open {
                info!(
                    event_name = "conversation.store_closed",
                    correlation_id = %inbound.message_id,
                    endpoint_id = %conversation.key.endpoint_id,
                    counterparty_id = %conversation.key.counterparty_id,
                    state = %from,
                    "store closed, state kept"
                );
                return StepOutcome { reply: reply::closed_store(&status), from, to: from };
            }
        }

        let edge = transition(from, &intent, &conversation.draft);
        debug!(
            event_name = "conversation.intent",
            correlation_id = %inbound.message_id,
            state = %from,
            intent = ?intent,
            effect = ?edge.effect,
            "intent classified"
        );

        conversation.state = edge.to;
        let reply = self.apply(conversation, edge.effect, inbound, tenant, now, &mut catalog).await;
        let to = conversation.state;

        info!(
            event_name = "conversation.transition",
            correlation_id = %inbound.message_id,
            endpoint_id = %conversation.key.endpoint_id,
            counterparty_id = %conversation.key.counterparty_id,
            from = %from,
            to = %to,
            "conversation advanced"
        );

        StepOutcome { reply, from, to }
    }

    async fn apply(
        &self,
        conversation: &mut Conversation,
        effect: Effect,
        inbound: &Inbound,
        tenant: &TenantConfig,
        now: DateTime<Utc>,
        catalog: &mut Option<Vec<CatalogItem>>,
    ) -> Reply {
        let draft = &mut conversation.draft;
        match effect {
            Effect::None => self.prompt(conversation, inbound, tenant, catalog).await,
            Effect::ShowMenu => reply::menu(&tenant.display_name),
            Effect::ShowMenuAsText => reply::menu_text(&tenant.display_name),
            Effect::ShowCatalog => {
                reply::catalog(self.load_catalog(catalog, tenant).await)
            }
            Effect::ShowSummary => Reply::text(draft.summary()),
            Effect::RequestHuman => self.request_human(conversation, inbound, tenant, now).await,
            Effect::ResetDraft => {
                conversation.reset();
                reply::cancelled()
            }
            Effect::AppendExtracted(extraction) => {
                let items = self.load_catalog(catalog, tenant).await.to_vec();
                let added = append_extracted(draft, &extraction, &items);
                let note = reply::added_from_text(draft, added);
                self.prompt(conversation, inbound, tenant, catalog).await.with_note(&note)
            }
            Effect::SelectItem(item) => {
                let prompt = reply::quantity_prompt(Some(&item));
                draft.pending_item = Some(item);
                prompt
            }
            Effect::ClearPending => {
                draft.pending_item = None;
                reply::catalog(self.load_catalog(catalog, tenant).await)
            }
            Effect::AddPendingItem(quantity) => match draft.pending_item.take() {
                Some(pending) => {
                    draft.add_item(OrderItem {
                        id: pending.id,
                        name: pending.name,
                        quantity,
                        unit_price: pending.unit_price,
                    });
                    reply::add_more_prompt(draft)
                }
                None => {
                    conversation.state = ConversationState::CatalogBrowse;
                    reply::catalog(self.load_catalog(catalog, tenant).await)
                }
            },
            Effect::ReopenLastItem => match draft.pop_item() {
                Some(item) => {
                    let pending =
                        PendingItem { id: item.id, name: item.name, unit_price: item.unit_price };
                    let prompt = reply::quantity_prompt(Some(&pending));
                    draft.pending_item = Some(pending);
                    prompt
                }
                None => {
                    conversation.state = ConversationState::CatalogBrowse;
                    reply::catalog(self.load_catalog(catalog, tenant).await)
                }
            },
            Effect::SetOrderKind(kind) => {
                draft.order_kind = Some(kind);
                if kind == OrderKind::DineIn {
                    draft.delivery_address = None;
                }
                self.prompt(conversation, inbound, tenant, catalog).await
            }
            Effect::SetAddress(address) => {
                draft.delivery_address = Some(address);
                self.prompt(conversation, inbound, tenant, catalog).await
            }
            Effect::SetName(name) => {
                draft.customer_name = Some(name);
                self.prompt(conversation, inbound, tenant, catalog).await
            }
            Effect::Submit(method) => {
                draft.payment_method = Some(method);
                let outcome =
                    submit_order(self.ledger.as_ref(), tenant, &conversation.key, draft).await;
                conversation.reset();
                Reply::text(outcome.message())
            }
            Effect::Reprompt(rejection) => {
                let note = reply::rejection_note(&rejection);
                self.prompt(conversation, inbound, tenant, catalog).await.with_note(&note)
            }
            Effect::ExplainUnsupported => self
                .prompt(conversation, inbound, tenant, catalog)
                .await
                .with_note(reply::unsupported_note()),
        }
    }

    /// The question asked by the conversation's current state.
    async fn prompt(
        &self,
        conversation: &Conversation,
        inbound: &Inbound,
        tenant: &TenantConfig,
        catalog: &mut Option<Vec<CatalogItem>>,
    ) -> Reply {
        let draft = &conversation.draft;
        match conversation.state {
            ConversationState::Initial => reply::menu_text(&tenant.display_name),
            ConversationState::CatalogBrowse => {
                reply::catalog(self.load_catalog(catalog, tenant).await)
            }
            ConversationState::ItemQuantity => reply::quantity_prompt(draft.pending_item.as_ref()),
            ConversationState::AddMore => reply::add_more_prompt(draft),
            ConversationState::OrderKind => reply::order_kind_prompt(),
            ConversationState::DeliveryAddress => reply::address_prompt(),
            ConversationState::CustomerName => {
                reply::name_prompt(inbound.profile_name.as_deref())
            }
            ConversationState::PaymentMethod => reply::payment_prompt(draft),
        }
    }

    async fn request_human(
        &self,
        conversation: &Conversation,
        inbound: &Inbound,
        tenant: &TenantConfig,
        now: DateTime<Utc>,
    ) -> Reply {
        if !tenant.features.human_handoff {
            return reply::human_unavailable();
        }

        let marker = self.priority.mark(&conversation.key, now).await;
        let position = self.priority.position(&conversation.key).await;
        info!(
            event_name = "conversation.human_requested",
            correlation_id = %inbound.message_id,
            endpoint_id = %conversation.key.endpoint_id,
            counterparty_id = %conversation.key.counterparty_id,
            requested_at = %marker.requested_at,
            "priority marker recorded"
        );
        reply::human_help(position, marker.wait_time(now))
    }

    /// Fetches the catalog at most once per step, in display order.
    async fn load_catalog<'a>(
        &self,
        slot: &'a mut Option<Vec<CatalogItem>>,
        tenant: &TenantConfig,
    ) -> &'a [CatalogItem] {
        if slot.is_none() {
            let fetched = self.catalog.fetch_catalog(tenant).await;
            *slot = Some(display_order(&fetched));
        }
        slot.as_deref().unwrap_or_default()
    }
}

/// Adds every extracted entry that still resolves to an orderable catalog
/// item and returns how many lines were added.
fn append_extracted(
    draft: &mut OrderDraft,
    extraction: &Extraction,
    catalog: &[CatalogItem],
) -> usize {
    let mut added = 0;
    for entry in &extraction.items {
        let Some(item) = catalog.iter().find(|item| item.id == entry.id && item.is_orderable())
        else {
            continue;
        };
        draft.add_item(OrderItem::from_catalog(item, entry.quantity));
        added += 1;
    }

    if let Some(kind) = extraction.order_kind {
        draft.order_kind = Some(kind);
    }
    if let Some(address) = extraction.address.as_deref().filter(|address| address_is_valid(address))
    {
        draft.delivery_address = Some(address.trim().to_owned());
    }
    added
}
