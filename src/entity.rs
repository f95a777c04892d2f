use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use log::{debug, error};
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::cache::SnapshotCache;
use crate::client::LedFxApi;
use crate::model::{Device, Virtual};
use crate::translate::{EffectCommand, Rgb};

pub mod light;
pub mod select;
pub mod switch;

pub const DOMAIN: &str = "ledfx";

const HIDDEN_SUFFIXES: [&str; 3] = ["-background", "-foreground", "-mask"];

/// LedFx creates helper virtuals for layered effects; they are not user-facing.
pub fn is_hidden(display_name: &str) -> bool {
    let name = display_name.to_lowercase();
    HIDDEN_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

pub fn light_unique_id(virtual_id: &str) -> String {
    format!("{}_{}", DOMAIN, virtual_id)
}

/// Devices missing from the map, or virtuals without a device, count as online.
pub fn device_online(virt: &Virtual, devices: &BTreeMap<String, Device>) -> bool {
    virt.device_id()
        .and_then(|id| devices.get(id))
        .map(|device| device.online)
        .unwrap_or(true)
}

/// Groups all entities of one virtual under a single device.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    pub fn for_virtual(virtual_id: &str, virt: &Virtual) -> Self {
        DeviceInfo {
            identifiers: (DOMAIN.to_string(), virtual_id.to_string()),
            name: virt.display_name(virtual_id).to_string(),
            manufacturer: "LEDFX".to_string(),
            model: "Virtual LED".to_string(),
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum EntityState {
    Light {
        on: bool,
        brightness: u8,
        rgb_color: Option<Rgb>,
    },
    Switch {
        on: bool,
    },
    Select {
        current_option: Option<String>,
        options: Vec<String>,
    },
}

#[skip_serializing_none]
#[derive(Serialize, Debug, Clone)]
pub struct EntityReport {
    pub unique_id: String,
    pub name: Option<String>,
    pub available: bool,
    #[serde(flatten)]
    pub state: EntityState,
}

pub trait Entity: Debug + Send + Sync {
    fn unique_id(&self) -> &str;
    /// `None` means the entity takes the device name.
    fn name(&self) -> Option<&str>;
    fn device_info(&self) -> &DeviceInfo;
    fn available(&self) -> bool;
    fn state(&self) -> EntityState;

    fn report(&self) -> EntityReport {
        EntityReport {
            unique_id: self.unique_id().to_string(),
            name: self.name().map(str::to_string),
            available: self.available(),
            state: self.state(),
        }
    }
}

/// What every entity of one virtual needs: the API, the shared cache and
/// which virtual it stands for.
#[derive(Clone)]
pub struct VirtualHandle {
    api: Arc<dyn LedFxApi>,
    cache: SnapshotCache,
    virtual_id: String,
}

impl Debug for VirtualHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualHandle")
            .field("virtual_id", &self.virtual_id)
            .finish()
    }
}

impl VirtualHandle {
    pub fn new(api: Arc<dyn LedFxApi>, cache: SnapshotCache, virtual_id: &str) -> Self {
        VirtualHandle {
            api,
            cache,
            virtual_id: virtual_id.to_string(),
        }
    }

    pub fn virtual_id(&self) -> &str {
        &self.virtual_id
    }

    pub fn api(&self) -> &Arc<dyn LedFxApi> {
        &self.api
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// This virtual as of the current snapshot; defaults if it has vanished.
    pub fn current(&self) -> Virtual {
        self.cache
            .current()
            .and_then(|snapshot| snapshot.get(&self.virtual_id).cloned())
            .unwrap_or_default()
    }

    /// Send `command`, then refresh. A failed call is logged and otherwise
    /// ignored; the entity keeps showing the last polled state.
    pub async fn dispatch(&self, command: Option<EffectCommand>) {
        if let Some(command) = command {
            debug!("Sending {:?} to virtual {}", command, self.virtual_id);
            let result = match &command {
                EffectCommand::Create(request) => self.api.set_effect(&self.virtual_id, request).await,
                EffectCommand::Update(request) => {
                    self.api.update_effect(&self.virtual_id, request).await
                }
                EffectCommand::Clear => self.api.clear_effect(&self.virtual_id).await,
            };

            if let Err(e) = result {
                error!("Error updating effect for virtual {}: {}", self.virtual_id, e);
            }
        }

        self.cache.request_refresh().await;
    }
}
