pub mod catalog;
pub mod conversation;
pub mod order;
pub mod tenant;
