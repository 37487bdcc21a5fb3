pub mod integrity_event;
pub mod memory_node;
pub mod retention_audit;
pub mod segment;
pub mod structured_event;
pub mod transcription;

pub use integrity_event::IntegrityEvent;
pub use memory_node::MemoryNode;
pub use retention_audit::RetentionAuditRecord;
pub use segment::Segment;
pub use structured_event::{StructuredEvent, Task};
pub use transcription::{Transcription, TranscriptSpan};
