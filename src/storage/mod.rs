pub mod engine;
pub mod entry;
pub mod jsonl;

pub use engine::{LogEngine, LogStore};
pub use entry::JsonlEntry;
pub use jsonl::{JsonlEngine, JsonlStore};
