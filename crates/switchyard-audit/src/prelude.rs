//! Convenience re-exports for crates consuming the audit log.

pub use crate::entry::{AuditQuery, AuditRecord};
pub use crate::error::{AuditError, AuditResult};
pub use crate::storage::{AuditSink, InMemoryAuditSink};
