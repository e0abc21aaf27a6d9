//! Domain records, collection identifiers and derived values.

mod collection;
mod invoice;
pub(crate) mod samples;
mod types;

pub use collection::{assign_id, Collection, Insertion, Record};
pub use invoice::InvoiceLine;
pub use types::{
  Client, DashboardStats, Employee, Invoice, InvoiceStatus, Material, Report, Supplier, Worksite,
  WorksiteStatus,
};
