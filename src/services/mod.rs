pub mod extractor;
pub mod line;
pub mod memory_store;
pub mod pipeline;
pub mod reconciler;
pub mod sheets;
pub mod signature;
