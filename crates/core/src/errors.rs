use thiserror::Error;

/// Draft invariants checked right before the order leaves the engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("draft has no items")]
    EmptyDraft,
    #[error("draft is missing the customer name")]
    MissingCustomerName,
    #[error("draft is missing the order kind")]
    MissingOrderKind,
    #[error("delivery draft is missing the address")]
    MissingDeliveryAddress,
    #[error("draft is missing the payment method")]
    MissingPaymentMethod,
    #[error("draft line `{0}` has an invalid quantity or price")]
    InvalidLine(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("order ledger unreachable: {0}")]
    Transport(String),
    #[error("order ledger rejected the order with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("order ledger returned a malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transport(_) => {
                "Não conseguimos falar com a loja agora. Seu pedido não foi registrado, tente novamente em instantes."
            }
            Self::Rejected { .. } | Self::Malformed(_) => {
                "Não foi possível registrar seu pedido. Por favor, tente novamente."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainError, LedgerError};

    #[test]
    fn ledger_errors_have_user_safe_messages() {
        let rejected = LedgerError::Rejected { status: 409, body: "{\"error\":\"dup\"}".into() };
        assert!(!rejected.user_message().contains("409"));
        assert!(!rejected.user_message().contains("dup"));
        assert!(LedgerError::Transport("timeout".into()).user_message().contains("não foi registrado"));
    }

    #[test]
    fn domain_errors_describe_missing_fields() {
        assert_eq!(
            DomainError::MissingDeliveryAddress.to_string(),
            "delivery draft is missing the address"
        );
    }
}
