pub mod dao;
pub mod enrichment;
pub mod filter_chain;
pub mod integrity;
pub mod memory;
pub mod pipeline;
pub mod privacy;
pub mod retention;
