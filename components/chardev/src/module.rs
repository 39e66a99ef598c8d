//! Module lifecycle: metadata, device number registration, load/unload
//!
//! A [`ChardevModule`] is the explicit init/teardown owner of one [`Device`].
//! Registration with the host OS goes through the [`Registrar`] trait; the
//! in-process [`LocalRegistrar`] stands in for it on hosted builds and in tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::device::Device;
use crate::{DeviceError, Result};

/// Static module metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub author: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub license: &'static str,
}

/// Metadata of the character device module
pub const CHARDEV_MODULE: ModuleInfo = ModuleInfo {
    name: "mychardev",
    author: "SD",
    description: "A simple character device driver example",
    version: "0.1",
    license: "GPL",
};

/// Device number registration boundary
pub trait Registrar: Send {
    /// Register a character device and return its major number
    fn register(&mut self, name: &str) -> Result<u32>;

    /// Drop a previous registration
    fn unregister(&mut self, major: u32, name: &str);
}

/// First major in the local/experimental range
pub const LOCAL_MAJOR_FIRST: u32 = 240;

/// Last major in the local/experimental range
pub const LOCAL_MAJOR_LAST: u32 = 254;

/// In-process registrar handing out majors from 240..=254
#[derive(Debug, Default)]
pub struct LocalRegistrar {
    registered: BTreeMap<u32, String>,
}

impl LocalRegistrar {
    /// Create an empty registrar
    pub fn new() -> Self {
        Self::default()
    }

    /// Name registered under `major`, if any
    pub fn lookup(&self, major: u32) -> Option<&str> {
        self.registered.get(&major).map(String::as_str)
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

impl<R: Registrar + ?Sized> Registrar for &mut R {
    fn register(&mut self, name: &str) -> Result<u32> {
        (**self).register(name)
    }

    fn unregister(&mut self, major: u32, name: &str) {
        (**self).unregister(major, name)
    }
}

impl Registrar for LocalRegistrar {
    fn register(&mut self, name: &str) -> Result<u32> {
        if self.registered.values().any(|n| n == name) {
            return Err(DeviceError::Registration(format!(
                "device {:?} already registered",
                name
            )));
        }

        let major = (LOCAL_MAJOR_FIRST..=LOCAL_MAJOR_LAST)
            .find(|m| !self.registered.contains_key(m))
            .ok_or_else(|| DeviceError::Registration("no free major numbers".into()))?;

        self.registered.insert(major, name.to_string());
        Ok(major)
    }

    fn unregister(&mut self, major: u32, name: &str) {
        match self.registered.get(&major) {
            Some(n) if n == name => {
                self.registered.remove(&major);
            }
            _ => log::warn!("unregister of unknown device {} (major {})", name, major),
        }
    }
}

/// Loaded module owning one registered device
pub struct ChardevModule<R: Registrar> {
    info: ModuleInfo,
    major: u32,
    device: Arc<Device>,
    registrar: R,
}

impl<R: Registrar> ChardevModule<R> {
    /// Load the module: validate config, register, create the device
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a bad configuration and `Registration` if
    /// the registrar refuses the device. Nothing is registered on failure.
    pub fn load(config: DeviceConfig, mut registrar: R) -> Result<Self> {
        let device = Device::new(config)?;
        let major = registrar.register(device.name())?;

        let info = CHARDEV_MODULE;
        log::info!("{}: module loaded, major number {}", device.name(), major);
        log::info!("\tAuthor: {}", info.author);
        log::info!("\tDescription: {}", info.description);
        log::info!("\tVersion: {}", info.version);
        log::info!("\tLicense: {}", info.license);

        Ok(Self {
            info,
            major,
            device: Arc::new(device),
            registrar,
        })
    }

    /// Module metadata
    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Major number assigned at load time
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Shared handle to the device
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Registrar the module was loaded with
    pub fn registrar(&self) -> &R {
        &self.registrar
    }

    /// Unload the module, unregistering the device
    ///
    /// Same as dropping the module; any `Arc<Device>` clones stay usable.
    pub fn unload(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        let open = self.device.open_count();
        if open > 0 {
            log::warn!(
                "{}: unloading with {} open handle(s)",
                self.device.name(),
                open
            );
        }

        self.registrar.unregister(self.major, self.device.name());
        log::info!("{}: module unloaded", self.device.name());
    }
}

impl<R: Registrar> Drop for ChardevModule<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
