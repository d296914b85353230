pub mod engine;
pub mod intent;
pub mod reply;
pub mod states;
pub mod transitions;

pub use engine::{ConversationEngine, Inbound, StepOutcome};
pub use intent::classify;
pub use reply::{ListRow, ListSection, Reply, ReplyButton};
pub use states::{
    ConversationState, Effect, InboundInput, Intent, Rejection, Transition, UnknownState,
};
pub use transitions::transition;
