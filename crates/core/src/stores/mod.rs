pub mod azure_search;
pub mod memory;

pub use azure_search::AzureSearchStore;
pub use memory::MemoryIndex;
