//! Global platform registry for looking up vendor profiles.

use std::sync::{LazyLock, RwLock};

use indexmap::IndexMap;
use log::error;

use super::Platform;
use super::definition::VendorProfile;
use crate::error::{PlatformError, Result};

/// Global platform registry.
static REGISTRY: LazyLock<RwLock<PlatformRegistry>> = LazyLock::new(|| {
    let registry = PlatformRegistry::with_builtins().unwrap_or_else(|e| {
        error!("failed to build built-in platforms: {}", e);
        PlatformRegistry::new()
    });
    RwLock::new(registry)
});

/// Registry for vendor profiles, keyed by dialect tag.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: IndexMap<String, VendorProfile>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            platforms: IndexMap::new(),
        }
    }

    /// Create a registry holding every built-in dialect.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for platform in Platform::ALL {
            registry.register(platform.profile()?)?;
        }
        Ok(registry)
    }

    /// Get the global registry.
    pub fn global() -> &'static RwLock<PlatformRegistry> {
        &REGISTRY
    }

    /// Look up a profile in the global registry.
    pub fn lookup(name: &str) -> Result<VendorProfile> {
        Self::global()
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| {
                PlatformError::UnknownPlatform {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Register a vendor profile.
    pub fn register(&mut self, profile: VendorProfile) -> Result<()> {
        if self.platforms.contains_key(&profile.name) {
            return Err(PlatformError::AlreadyRegistered {
                name: profile.name.clone(),
            }
            .into());
        }
        self.platforms.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Get a profile by name.
    pub fn get(&self, name: &str) -> Option<&VendorProfile> {
        self.platforms.get(name)
    }

    /// Check if a platform is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.platforms.contains_key(name)
    }

    /// List all registered platform names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.platforms.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_builtins_in_order() {
        let registry = PlatformRegistry::with_builtins().unwrap();
        let names: Vec<&str> = registry.names().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["base", "cisco_ios", "cisco_nxos", "cisco_xr", "juniper_junos", "linux"]
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = PlatformRegistry::with_builtins().unwrap();
        let err = registry.register(VendorProfile::new("linux")).unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_global_lookup() {
        assert_eq!(PlatformRegistry::lookup("cisco_xr").unwrap().name, "cisco_xr");
        assert!(matches!(
            PlatformRegistry::lookup("nope"),
            Err(Error::Platform(PlatformError::UnknownPlatform { .. }))
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = PlatformRegistry::new();
        registry
            .register(VendorProfile::new("mikrotik").with_preparation("/terminal length=0"))
            .unwrap();
        assert!(registry.contains("mikrotik"));
        assert_eq!(
            registry.get("mikrotik").unwrap().session_preparation,
            vec!["/terminal length=0".to_string()]
        );
    }
}
