//! Room-scoped conversation history with bounded memory.

pub mod store;

pub use store::SessionStore;
