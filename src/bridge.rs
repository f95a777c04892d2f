use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, error, info};

use crate::cache::SnapshotCache;
use crate::client::LedFxApi;
use crate::config::PollSettings;
use crate::entity::light::LedFxLight;
use crate::entity::select::{EffectSelect, GradientSelect};
use crate::entity::switch::LedFxSwitch;
use crate::entity::{Entity, VirtualHandle, device_online, is_hidden};
use crate::model::Device;
use crate::poller::Poller;
use crate::translate::EffectGroup;

/// A running integration: the poller plus every entity built at setup.
pub struct Bridge {
    poller: Poller,
    pub lights: Vec<LedFxLight>,
    pub switches: Vec<LedFxSwitch>,
    pub effect_selects: Vec<EffectSelect>,
    pub gradient_selects: Vec<GradientSelect>,
}

impl Bridge {
    /// Check connectivity, run the first poll and build the entities.
    ///
    /// Fails if LedFx cannot be reached or the first poll fails. A failed
    /// device or schema fetch only degrades the affected entities.
    pub async fn setup(api: Arc<dyn LedFxApi>, settings: &PollSettings) -> anyhow::Result<Self> {
        let info = api
            .info()
            .await
            .inspect_err(|e| error!("Could not connect to LedFx: {}", e))
            .context("cannot connect")?;
        info!(
            "Connected to {} {}",
            info.name.as_deref().unwrap_or("LedFx"),
            info.version.as_deref().unwrap_or("(unknown version)")
        );

        let cache = SnapshotCache::new(api.clone());
        let mut poller = Poller::new(cache.clone(), settings.interval);
        let snapshot = poller.start().await?;

        let devices: BTreeMap<String, Device> = api.devices().await.unwrap_or_else(|e| {
            error!("Failed to get devices: {}", e);
            BTreeMap::new()
        });

        let mut bridge = Bridge {
            poller,
            lights: Vec::new(),
            switches: Vec::new(),
            effect_selects: Vec::new(),
            gradient_selects: Vec::new(),
        };

        for (id, virt) in snapshot.iter() {
            if is_hidden(virt.display_name(id)) {
                debug!("Skipping helper virtual {}", id);
                continue;
            }

            let online = device_online(virt, &devices);
            let handle = VirtualHandle::new(api.clone(), cache.clone(), id);

            bridge.lights.push(LedFxLight::new(handle.clone(), virt));
            bridge.switches.push(LedFxSwitch::new(handle.clone(), virt, online));
            for group in [EffectGroup::AudioReactive, EffectGroup::NonReactive] {
                bridge
                    .effect_selects
                    .push(EffectSelect::new(handle.clone(), virt, online, group));
            }
            bridge
                .gradient_selects
                .push(GradientSelect::new(handle, virt, online));
        }

        for select in bridge.effect_selects.iter() {
            select.load_options().await;
        }

        info!("Set up {} LedFx virtuals", bridge.lights.len());
        Ok(bridge)
    }

    pub fn cache(&self) -> &SnapshotCache {
        self.poller.cache()
    }

    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        let lights = self.lights.iter().map(|e| e as &dyn Entity);
        let switches = self.switches.iter().map(|e| e as &dyn Entity);
        let effects = self.effect_selects.iter().map(|e| e as &dyn Entity);
        let gradients = self.gradient_selects.iter().map(|e| e as &dyn Entity);
        lights.chain(switches).chain(effects).chain(gradients)
    }

    pub fn light(&self, virtual_id: &str) -> Option<&LedFxLight> {
        self.lights
            .iter()
            .find(|light| light.device_info().identifiers.1 == virtual_id)
    }

    pub fn switch(&self, virtual_id: &str) -> Option<&LedFxSwitch> {
        self.switches
            .iter()
            .find(|switch| switch.device_info().identifiers.1 == virtual_id)
    }

    pub fn effect_select(&self, virtual_id: &str, group: EffectGroup) -> Option<&EffectSelect> {
        self.effect_selects.iter().find(|select| {
            select.group() == group && select.device_info().identifiers.1 == virtual_id
        })
    }

    pub fn gradient_select(&self, virtual_id: &str) -> Option<&GradientSelect> {
        self.gradient_selects
            .iter()
            .find(|select| select.device_info().identifiers.1 == virtual_id)
    }

    /// Stop polling. Entities keep answering from the last snapshot.
    pub async fn teardown(mut self) -> anyhow::Result<()> {
        self.poller.stop().await?;
        info!("LedFx bridge stopped");
        Ok(())
    }
}
