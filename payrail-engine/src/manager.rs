//! Adapter registry and manager.
//!
//! The registry is an explicitly constructed name -> driver map; nothing is
//! process-global, so tests can run several isolated registries in one
//! process. The manager owns construction: it builds each configured driver
//! with environment-specific settings, runs its init step, and only then
//! exposes it. Any failure aborts the whole construction - there is no
//! degraded mode.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use payrail_adapters::{AdapterError, GatewayDriver};
use payrail_domain::Environment;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Settings & Factories
// =============================================================================

/// Environment-specific inputs for driver construction.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Which gateway endpoints to talk to
    pub environment: Environment,
    /// Callback URL gateways should deliver webhooks to
    pub webhook_url: Option<String>,
    /// Per-request timeout for gateway HTTP calls
    pub http_timeout: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Sandbox,
            webhook_url: None,
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Constructor for one gateway driver.
///
/// Integrations contribute one factory per adapter name; the manager calls
/// it with the environment settings during construction.
pub type DriverFactory =
    Box<dyn Fn(&AdapterSettings) -> Result<Arc<dyn GatewayDriver>, AdapterError> + Send + Sync>;

/// Factory that hands out an already-built driver instance.
///
/// Useful in tests, where the caller keeps a handle on the driver to
/// script its behavior.
pub fn shared_driver_factory<D>(driver: Arc<D>) -> DriverFactory
where
    D: GatewayDriver + 'static,
{
    Box::new(move |_settings| Ok(Arc::clone(&driver) as Arc<dyn GatewayDriver>))
}

// =============================================================================
// Adapter Registry
// =============================================================================

/// Name -> driver mapping.
pub struct AdapterRegistry {
    drivers: HashMap<String, Arc<dyn GatewayDriver>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Register a driver under a name. Re-registering overwrites.
    pub fn register(&mut self, name: &str, driver: Arc<dyn GatewayDriver>) {
        self.drivers.insert(name.to_string(), driver);
    }

    /// Resolve a driver by name.
    ///
    /// An unknown name is a configuration error, never silently ignored.
    pub fn get(&self, name: &str) -> EngineResult<Arc<dyn GatewayDriver>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::AdapterNotRegistered(name.to_string()))
    }

    /// Registered adapter names.
    pub fn names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Adapter Manager
// =============================================================================

/// Builds and owns the configured gateway drivers.
pub struct AdapterManager {
    registry: AdapterRegistry,
}

impl AdapterManager {
    /// Construct every configured adapter, fail-fast.
    ///
    /// For each `(name, factory)` pair in order: construct the driver with
    /// the shared settings, run its `init()` step, then register it. Names
    /// are lowercased. A failing construction or init aborts the manager
    /// entirely.
    pub async fn create(
        settings: &AdapterSettings,
        factories: Vec<(String, DriverFactory)>,
    ) -> EngineResult<Self> {
        let mut registry = AdapterRegistry::new();

        for (name, factory) in factories {
            let name = name.to_lowercase();

            let driver = factory(settings)?;
            driver.init().await?;
            registry.register(&name, driver);

            debug!(
                adapter = %name,
                environment = %settings.environment,
                webhook_url = ?settings.webhook_url,
                "Adapter initialized"
            );
        }

        info!(adapters = ?registry.names(), "Adapter manager ready");
        Ok(Self { registry })
    }

    /// Resolve a driver by name.
    pub fn get(&self, name: &str) -> EngineResult<Arc<dyn GatewayDriver>> {
        self.registry.get(name)
    }

    /// Registered adapter names.
    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }
}

// =============================================================================
// Tests
// =============================================================================
