pub mod base;
pub mod integrity_event;
pub mod memory_node;
pub mod retention_audit;
pub mod segment;
pub mod structured_event;
pub mod transcription;

pub use base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
pub use integrity_event::IntegrityEventDao;
pub use memory_node::MemoryNodeDao;
pub use retention_audit::RetentionAuditDao;
pub use segment::SegmentDao;
pub use structured_event::StructuredEventDao;
pub use transcription::TranscriptionDao;
