use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use comanda_core::{LedgerError, OrderAck, OrderLedger, OrderRequest, TenantConfig};

use crate::catalog::TENANT_KEY_HEADER;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Order ledger over HTTP: `POST {base}/orders`.
#[derive(Clone, Debug)]
pub struct HttpOrderLedger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderLedger {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl OrderLedger for HttpOrderLedger {
    async fn create_order(
        &self,
        tenant: &TenantConfig,
        request: &OrderRequest,
    ) -> Result<OrderAck, LedgerError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .header(TENANT_KEY_HEADER, tenant.credential.expose_secret())
            .header(IDEMPOTENCY_KEY_HEADER, &request.idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(|error| LedgerError::Transport(error.to_string()))?;

        let status = response.status();
        let body =
            response.text().await.map_err(|error| LedgerError::Transport(error.to_string()))?;
        if !status.is_success() {
            return Err(LedgerError::Rejected { status: status.as_u16(), body });
        }

        serde_json::from_str::<OrderAck>(&body)
            .map_err(|error| LedgerError::Malformed(format!("{error}: {body}")))
    }
}
