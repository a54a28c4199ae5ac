use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_DEVICE, default_os, default_sdk_version};

/// Description of the instrumented application, sent when connecting.
///
/// Field names follow the desktop's handshake vocabulary (`deviceId`,
/// `sdkVersion`) when serialised.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientIdentity {
    /// Operating system name.
    pub os: String,
    /// Human-readable device name.
    pub device: String,
    /// Stable device identifier.
    pub device_id: String,
    /// Application name shown by the desktop tool.
    pub app: String,
    /// Version of the client engine.
    pub sdk_version: String,
    /// Whether the application is currently in the foreground.
    pub foreground: bool,
}

impl ClientIdentity {
    /// Builds an identity for the named application with default device
    /// details.
    #[must_use]
    pub fn for_app(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            os: default_os().to_owned(),
            device: DEFAULT_DEVICE.to_owned(),
            device_id: DEFAULT_DEVICE.to_owned(),
            app: String::new(),
            sdk_version: default_sdk_version().to_owned(),
            foreground: true,
        }
    }
}
