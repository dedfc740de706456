//! Common types shared across vidrelay crates.
//!
//! Holds the closed provider set, the error taxonomy, and the normalized
//! shapes (outcomes, listings, account details) every adapter produces.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    AccountInfo, BatchStatus, Credential, ItemKind, Listing, ListingItem, ProviderId,
    UploadOptions, UploadOutcome, UploadedFile,
};
