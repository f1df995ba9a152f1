//! # Postgres Storage
//!
//! Production implementations of the storage traits. Queries are built at
//! runtime so the crate compiles without a live database; the schema lives in
//! `migrations/` and is embedded for [`DatabaseConnection::migrate`].

pub mod connection;
pub mod import_jobs;
pub mod work_items;

pub use connection::DatabaseConnection;
pub use import_jobs::{PgImportJobRepository, IMPORT_JOB_KIND};
pub use work_items::PgWorkItemRepository;
