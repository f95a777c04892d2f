use crate::entity::{DeviceInfo, Entity, EntityState, VirtualHandle, light_unique_id};
use crate::model::Virtual;
use crate::translate::{self, EffectCommand};

/// On/off view of a virtual. Turning on restarts the last effect with its config.
#[derive(Debug)]
pub struct LedFxSwitch {
    handle: VirtualHandle,
    unique_id: String,
    device_info: DeviceInfo,
    device_online: bool,
}

impl LedFxSwitch {
    pub fn new(handle: VirtualHandle, virt: &Virtual, device_online: bool) -> Self {
        let id = handle.virtual_id().to_string();
        LedFxSwitch {
            unique_id: light_unique_id(&id),
            device_info: DeviceInfo::for_virtual(&id, virt),
            handle,
            device_online,
        }
    }

    pub fn is_on(&self) -> bool {
        translate::is_on(&self.handle.current())
    }

    pub async fn turn_on(&self) {
        let command = translate::plan_switch_turn_on(&self.handle.current());
        self.handle.dispatch(Some(command)).await;
    }

    pub async fn turn_off(&self) {
        self.handle.dispatch(Some(EffectCommand::Clear)).await;
    }
}

impl Entity for LedFxSwitch {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> Option<&str> {
        None
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn available(&self) -> bool {
        self.device_online
    }

    fn state(&self) -> EntityState {
        EntityState::Switch { on: self.is_on() }
    }
}
