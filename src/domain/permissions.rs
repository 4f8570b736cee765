//! Runtime permission gating for scanning.
//!
//! Grants are requested once at start-up. Until a request has confirmed every
//! grant, each scan re-checks them individually.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    FineLocation,
    BluetoothScan,
    BluetoothConnect,
}

impl Permission {
    pub const REQUIRED: [Permission; 3] = [
        Permission::FineLocation,
        Permission::BluetoothScan,
        Permission::BluetoothConnect,
    ];

    /// Platform name of the grant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Self::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Self::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of permission grants on the host platform.
pub trait PermissionProvider: Send + Sync {
    /// Ask the user for `permissions`; returns the subset that was granted.
    fn request(&self, permissions: &[Permission]) -> HashSet<Permission>;
    /// Whether `permission` is currently granted, without prompting.
    fn check(&self, permission: Permission) -> bool;
}

/// Provider with a fixed set of grants.
///
/// Desktop Bluetooth stacks do not gate scanning behind runtime grants, so the
/// desktop build uses [`StaticPermissions::all_granted`].
#[derive(Debug, Clone)]
pub struct StaticPermissions {
    granted: HashSet<Permission>,
}

impl StaticPermissions {
    pub fn all_granted() -> Self {
        Self {
            granted: Permission::REQUIRED.into_iter().collect(),
        }
    }

    pub fn denying(denied: &[Permission]) -> Self {
        Self {
            granted: Permission::REQUIRED
                .into_iter()
                .filter(|p| !denied.contains(p))
                .collect(),
        }
    }
}

impl PermissionProvider for StaticPermissions {
    fn request(&self, permissions: &[Permission]) -> HashSet<Permission> {
        permissions
            .iter()
            .copied()
            .filter(|p| self.granted.contains(p))
            .collect()
    }

    fn check(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }
}

pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    confirmed: bool,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            confirmed: false,
        }
    }

    /// Request every required grant. Called once at process start.
    pub fn request_all(&mut self) -> bool {
        let granted = self.provider.request(&Permission::REQUIRED);
        self.confirmed = Permission::REQUIRED.iter().all(|p| granted.contains(p));
        if self.confirmed {
            info!("All required permissions granted");
        } else {
            warn!(granted = granted.len(), "Not all required permissions granted");
        }
        self.confirmed
    }

    /// Returns the missing grants, if any.
    pub fn ensure_granted(&self) -> Result<(), Vec<Permission>> {
        if self.confirmed {
            return Ok(());
        }

        let missing: Vec<Permission> = Permission::REQUIRED
            .into_iter()
            .filter(|p| !self.provider.check(*p))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}
