//! Uploaded files that live independently of discussions until bound.

mod reclaim;
mod service;

pub use reclaim::{ReclaimReport, reclaim_orphans, run_reclaimer};
pub use service::AttachmentService;
