use crate::entity::{DeviceInfo, Entity, EntityState, VirtualHandle, light_unique_id};
use crate::model::Virtual;
use crate::translate::{self, EffectCommand, LightChanges, Rgb};

/// RGB light backed by a virtual. Brightness and color live in the running
/// effect's config.
#[derive(Debug)]
pub struct LedFxLight {
    handle: VirtualHandle,
    unique_id: String,
    name: String,
    device_info: DeviceInfo,
}

impl LedFxLight {
    pub fn new(handle: VirtualHandle, virt: &Virtual) -> Self {
        let id = handle.virtual_id().to_string();
        LedFxLight {
            unique_id: light_unique_id(&id),
            name: virt.display_name(&id).to_string(),
            device_info: DeviceInfo::for_virtual(&id, virt),
            handle,
        }
    }

    pub fn is_on(&self) -> bool {
        translate::is_on(&self.handle.current())
    }

    pub fn brightness(&self) -> u8 {
        translate::brightness(&self.handle.current())
    }

    pub fn rgb_color(&self) -> Option<Rgb> {
        translate::rgb_color(&self.handle.current())
    }

    pub async fn turn_on(&self, changes: LightChanges) {
        let command = translate::plan_light_turn_on(&self.handle.current(), &changes);
        self.handle.dispatch(command).await;
    }

    pub async fn turn_off(&self) {
        self.handle.dispatch(Some(EffectCommand::Clear)).await;
    }
}

impl Entity for LedFxLight {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn available(&self) -> bool {
        self.handle.cache().last_refresh_succeeded()
    }

    fn state(&self) -> EntityState {
        let virt = self.handle.current();
        EntityState::Light {
            on: translate::is_on(&virt),
            brightness: translate::brightness(&virt),
            rgb_color: translate::rgb_color(&virt),
        }
    }
}
