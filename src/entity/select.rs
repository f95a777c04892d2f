use std::sync::RwLock;

use log::{error, warn};

use crate::entity::{DeviceInfo, Entity, EntityState, VirtualHandle, light_unique_id};
use crate::model::{EffectSchema, Virtual};
use crate::presets::{gradient_preset, gradient_preset_names};
use crate::translate::{self, EffectGroup};

#[derive(Debug, Default)]
struct EffectOptions {
    schema: EffectSchema,
    names: Vec<String>,
}

/// Picks the effect of a virtual from one [`EffectGroup`].
#[derive(Debug)]
pub struct EffectSelect {
    handle: VirtualHandle,
    group: EffectGroup,
    unique_id: String,
    device_info: DeviceInfo,
    device_online: bool,
    options: RwLock<EffectOptions>,
}

impl EffectSelect {
    pub fn new(handle: VirtualHandle, virt: &Virtual, device_online: bool, group: EffectGroup) -> Self {
        let id = handle.virtual_id().to_string();
        let suffix = match group {
            EffectGroup::AudioReactive => "effect_reactive",
            EffectGroup::NonReactive => "effect_static",
        };
        EffectSelect {
            unique_id: format!("{}_{}", light_unique_id(&id), suffix),
            device_info: DeviceInfo::for_virtual(&id, virt),
            handle,
            group,
            device_online,
            options: RwLock::new(EffectOptions::default()),
        }
    }

    pub fn group(&self) -> EffectGroup {
        self.group
    }

    /// Fetch the effect schema and keep the effects of this selector's group.
    /// On failure the selector is left without options, which makes it unavailable.
    pub async fn load_options(&self) {
        let loaded = match self.handle.api().effect_schema().await {
            Ok(schema) => {
                let names = translate::effects_in_group(&schema, self.group);
                EffectOptions { schema, names }
            }
            Err(e) => {
                error!("Error fetching effects: {}", e);
                EffectOptions::default()
            }
        };

        match self.options.write() {
            Ok(mut guard) => *guard = loaded,
            Err(poisoned) => *poisoned.into_inner() = loaded,
        }
    }

    pub fn options(&self) -> Vec<String> {
        match self.options.read() {
            Ok(guard) => guard.names.clone(),
            Err(poisoned) => poisoned.into_inner().names.clone(),
        }
    }

    pub fn current_option(&self) -> Option<String> {
        translate::current_effect_option(&self.handle.current(), &self.options())
    }

    /// Start `option`, keeping the settings of the running effect where the
    /// new one declares them.
    pub async fn select_option(&self, option: &str) {
        let command = {
            let options = match self.options.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !options.names.iter().any(|name| name == option) {
                warn!("Effect {} is not offered by {}", option, self.unique_id);
                return;
            }
            translate::plan_effect_selection(
                &self.handle.current(),
                option,
                options.schema.get(option),
            )
        };

        self.handle.dispatch(Some(command)).await;
    }
}

impl Entity for EffectSelect {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> Option<&str> {
        match self.group {
            EffectGroup::AudioReactive => Some("Effect (Audio Reactive)"),
            EffectGroup::NonReactive => Some("Effect (Static)"),
        }
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn available(&self) -> bool {
        self.device_online && !self.options().is_empty()
    }

    fn state(&self) -> EntityState {
        EntityState::Select {
            current_option: self.current_option(),
            options: self.options(),
        }
    }
}

/// Applies one of the static gradient presets to the running effect.
#[derive(Debug)]
pub struct GradientSelect {
    handle: VirtualHandle,
    unique_id: String,
    device_info: DeviceInfo,
    device_online: bool,
}

impl GradientSelect {
    pub fn new(handle: VirtualHandle, virt: &Virtual, device_online: bool) -> Self {
        let id = handle.virtual_id().to_string();
        GradientSelect {
            unique_id: format!("{}_gradient", light_unique_id(&id)),
            device_info: DeviceInfo::for_virtual(&id, virt),
            handle,
            device_online,
        }
    }

    pub fn options(&self) -> Vec<String> {
        gradient_preset_names()
    }

    pub fn current_option(&self) -> Option<String> {
        translate::current_gradient_preset(&self.handle.current()).map(str::to_string)
    }

    pub async fn select_option(&self, option: &str) {
        let Some(gradient) = gradient_preset(option) else {
            warn!("Unknown gradient preset {}", option);
            return;
        };

        let virt = self.handle.current();
        if virt.effect_type().is_none() {
            warn!(
                "No active effect for virtual {}, using last effect",
                self.handle.virtual_id()
            );
        }

        let command = translate::plan_gradient_selection(&virt, gradient);
        self.handle.dispatch(Some(command)).await;
    }
}

impl Entity for GradientSelect {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> Option<&str> {
        Some("Gradient")
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn available(&self) -> bool {
        self.device_online
    }

    fn state(&self) -> EntityState {
        EntityState::Select {
            current_option: self.current_option(),
            options: self.options(),
        }
    }
}
