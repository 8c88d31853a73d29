//! Key-bound domain storage.

pub mod record;
pub mod table;

pub use record::{DomainId, DomainRecord};
pub use table::DomainTable;
