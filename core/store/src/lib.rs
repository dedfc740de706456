//! Record storage for vidrelay: per-user provider credentials and upload
//! history.
//!
//! Both stores are small synchronous traits so the hub can hold them as
//! `Arc<dyn ...>`. In-memory implementations back tests and single-process
//! use; [`SqliteStore`] persists both record kinds in one database file.

pub mod credentials;
pub mod history;
pub mod sqlite;

pub use credentials::{CredentialRecord, CredentialStore, KeyStatus, MemoryCredentialStore};
pub use history::{HistoryRecord, HistoryStore, MemoryHistoryStore, ADMIN_HISTORY_LIMIT};
pub use sqlite::SqliteStore;
