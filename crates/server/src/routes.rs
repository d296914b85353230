use std::sync::Arc;

use axum::Router;
use comanda_core::PriorityTracker;
use comanda_db::DbPool;

use crate::webhook::{self, WebhookState};
use crate::{health, queue};

pub fn router(
    webhook_state: WebhookState,
    priority: Arc<PriorityTracker>,
    db_pool: DbPool,
) -> Router {
    Router::new()
        .merge(webhook::router(webhook_state))
        .merge(queue::router(priority))
        .merge(health::router(db_pool))
}
