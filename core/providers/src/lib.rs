//! Hosting provider adapters for vidrelay.
//!
//! Each supported video host gets one adapter behind the [`HostProvider`]
//! trait. Adapters hide how the host authenticates, how uploads are staged,
//! and how responses are wrapped; callers only see normalized results and
//! one error taxonomy.
//!
//! # Design Principles
//! - Stateless adapters: the credential is passed into every call
//! - Explicit timeouts on every outbound request
//! - Capability gaps are reported as `Unsupported`, never faked
//! - Listings are normalized tolerantly; a malformed item is dropped, not fatal

pub mod bigwarp;
pub mod doodstream;
mod http;
pub mod listing;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod scripted;
pub mod streamtape;
pub mod vidguard;

pub use bigwarp::{BigWarpEndpoints, BigWarpProvider};
pub use doodstream::{DoodStreamEndpoints, DoodStreamProvider};
pub use http::HttpConfig;
pub use provider::HostProvider;
pub use registry::{create_default_registry, ProviderRegistry, ProvidersConfig};
pub use retry::{Backoff, RetryConfig, RetryExecutor};
pub use scripted::ScriptedProvider;
pub use streamtape::{StreamTapeEndpoints, StreamTapeProvider};
pub use vidguard::{VidGuardEndpoints, VidGuardProvider};
