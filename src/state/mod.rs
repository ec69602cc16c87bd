mod provider;
mod store;

pub use provider::{DisplayEvent, StateProvider, StateSetter};
pub use store::{EditorStateStore, DEFAULT_EDITOR};
