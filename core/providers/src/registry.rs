//! Provider registry: maps provider identifiers to adapters.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vidrelay_common::{Error, ProviderId, Result};

use crate::bigwarp::{self, BigWarpEndpoints, BigWarpProvider};
use crate::doodstream::{DoodStreamEndpoints, DoodStreamProvider};
use crate::http::HttpConfig;
use crate::provider::HostProvider;
use crate::retry::RetryConfig;
use crate::streamtape::{StreamTapeEndpoints, StreamTapeProvider};
use crate::vidguard::{VidGuardEndpoints, VidGuardProvider};

/// Registry of provider adapters.
///
/// Adapters are stateless, so one shared instance serves every request.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn HostProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the provider it reports.
    ///
    /// # Errors
    /// - Returns error if that provider already has an adapter
    pub fn register(&mut self, adapter: Arc<dyn HostProvider>) -> Result<()> {
        let id = adapter.id();
        if self.adapters.contains_key(&id) {
            return Err(Error::Validation(format!(
                "Provider '{}' is already registered",
                id
            )));
        }
        self.adapters.insert(id, adapter);
        Ok(())
    }

    /// Resolve an adapter from a wire name.
    ///
    /// # Errors
    /// - `UnknownProvider` if the name is outside the supported set
    /// - `NotFound` if the provider is supported but has no adapter here
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn HostProvider>> {
        let id: ProviderId = name.parse()?;
        self.get(id)
    }

    /// Adapter for a known provider.
    pub fn get(&self, id: ProviderId) -> Result<Arc<dyn HostProvider>> {
        self.adapters
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Provider '{}' is not registered", id)))
    }

    /// Registered providers in canonical order.
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.adapters.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, id: ProviderId) -> bool {
        self.adapters.contains_key(&id)
    }
}

/// Settings for building the production adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub http: HttpConfig,
    pub doodstream: DoodStreamEndpoints,
    pub streamtape: StreamTapeEndpoints,
    pub vidguard: VidGuardEndpoints,
    pub bigwarp: BigWarpEndpoints,
    /// Policy for BigWarp's upload-server request.
    pub bigwarp_retry: RetryConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            doodstream: DoodStreamEndpoints::default(),
            streamtape: StreamTapeEndpoints::default(),
            vidguard: VidGuardEndpoints::default(),
            bigwarp: BigWarpEndpoints::default(),
            bigwarp_retry: bigwarp::default_server_retry(),
        }
    }
}

/// Create a registry with all four providers.
///
/// # Errors
/// - Returns error if the HTTP client cannot be built
pub fn create_default_registry(config: &ProvidersConfig) -> Result<ProviderRegistry> {
    let client = config.http.build_client()?;
    let mut registry = ProviderRegistry::new();

    registry.register(Arc::new(DoodStreamProvider::with_endpoints(
        client.clone(),
        config.doodstream.clone(),
    )))?;
    registry.register(Arc::new(StreamTapeProvider::with_endpoints(
        client.clone(),
        config.streamtape.clone(),
    )))?;
    registry.register(Arc::new(VidGuardProvider::with_endpoints(
        client.clone(),
        config.vidguard.clone(),
    )))?;
    registry.register(Arc::new(
        BigWarpProvider::with_endpoints(client, config.bigwarp.clone())
            .with_retry(config.bigwarp_retry.clone()),
    ))?;

    Ok(registry)
}
