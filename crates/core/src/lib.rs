pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod flows;
pub mod gateway;
pub mod ledger;
pub mod priority;
pub mod submission;

pub use domain::catalog::{CatalogItem, ItemId, StoreStatus};
pub use domain::conversation::{Conversation, ConversationKey};
pub use domain::order::{OrderDraft, OrderItem, OrderKind, PaymentMethod};
pub use domain::tenant::{TenantConfig, TenantDirectory, TenantFeatures};
pub use errors::{DomainError, LedgerError};
pub use extract::{extract, ExtractedItem, Extraction};
pub use flows::{ConversationEngine, ConversationState, Inbound, InboundInput, Reply, StepOutcome};
pub use gateway::{CatalogGateway, StaticCatalogGateway};
pub use ledger::{OrderAck, OrderLedger, OrderRequest};
pub use priority::{PriorityMarker, PriorityTracker};
pub use submission::{submit_order, SubmissionOutcome};
