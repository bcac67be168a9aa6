//! Patient records: the CRUD service and the default in-process store.
//!
//! | Operation | Failure |
//! |-----------|---------|
//! | create | `Validation`, `Conflict` on a taken id |
//! | get / update / delete | `NotFound` |
//! | list | none (paged in insertion order) |

pub mod service;
pub mod store;

pub use service::{DEFAULT_PAGE_LIMIT, PatientService};
pub use store::InMemoryPatientStore;
