use tracing::{info, warn};

use crate::domain::conversation::ConversationKey;
use crate::domain::order::{format_brl, OrderDraft};
use crate::domain::tenant::TenantConfig;
use crate::ledger::{OrderAck, OrderLedger, OrderRequest};

pub const INCOMPLETE_DRAFT_MESSAGE: &str =
    "Não foi possível finalizar: faltam informações no pedido. Vamos recomeçar?";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed { ack: OrderAck, message: String },
    Failed { message: String },
}

impl SubmissionOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Confirmed { message, .. } | Self::Failed { message } => message,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Finalizes the draft and hands it to the ledger. Never fails: every
/// problem becomes a user-facing failure message.
pub async fn submit_order(
    ledger: &dyn OrderLedger,
    tenant: &TenantConfig,
    key: &ConversationKey,
    draft: &OrderDraft,
) -> SubmissionOutcome {
    let request = match OrderRequest::from_draft(key, draft) {
        Ok(request) => request,
        Err(error) => {
            warn!(
                event_name = "order.submit_rejected_locally",
                endpoint_id = %key.endpoint_id,
                counterparty_id = %key.counterparty_id,
                error = %error,
                "draft failed submission invariants"
            );
            return SubmissionOutcome::Failed { message: INCOMPLETE_DRAFT_MESSAGE.to_owned() };
        }
    };

    match ledger.create_order(tenant, &request).await {
        Ok(ack) => {
            info!(
                event_name = "order.submitted",
                endpoint_id = %key.endpoint_id,
                counterparty_id = %key.counterparty_id,
                display_id = %ack.display_id,
                queue_position = ack.queue_position,
                total = %request.total,
                "order accepted by ledger"
            );
            let message = confirmation_message(&ack, &request);
            SubmissionOutcome::Confirmed { ack, message }
        }
        Err(error) => {
            warn!(
                event_name = "order.submit_failed",
                endpoint_id = %key.endpoint_id,
                counterparty_id = %key.counterparty_id,
                idempotency_key = %request.idempotency_key,
                error = %error,
                "order ledger did not accept the order"
            );
            SubmissionOutcome::Failed { message: error.user_message().to_owned() }
        }
    }
}

pub fn confirmation_message(ack: &OrderAck, request: &OrderRequest) -> String {
    let mut lines = vec![format!("✅ Pedido {} confirmado!", ack.display_label())];
    if let Some(position) = ack.queue_position {
        lines.push(format!("📋 Posição na fila: {position}º"));
    }
    if let Some(minutes) = ack.estimated_minutes {
        lines.push(format!("⏱️ Tempo estimado: {minutes} min"));
    }

    lines.push(String::new());
    for line in &request.items {
        let line_total = line.unit_price * rust_decimal::Decimal::from(line.quantity);
        lines.push(format!("{}x {} - {}", line.quantity, line.name, format_brl(line_total)));
    }
    lines.push(format!("*Total: {}*", format_brl(request.total)));
    lines.push(format!("Pagamento: {}", request.payment_method.label()));
    lines.push(format!("Tipo: {}", request.order_kind.label()));
    if let Some(address) = &request.delivery_address {
        lines.push(format!("Endereço: {address}"));
    }

    lines.push(String::new());
    lines.push(format!("Obrigado, {}! 😋", request.customer_name));
    lines.join("\n")
}
