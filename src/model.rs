use std::collections::BTreeMap;
use std::time::Instant;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type EffectConfig = Map<String, Value>;

/// A LedFx virtual: a logical strip that runs one effect at a time.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Virtual {
    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub effect: Option<Effect>,

    #[serde(default)]
    pub last_effect: Option<String>,

    #[serde(default)]
    pub config: VirtualConfig,

    #[serde(default)]
    pub is_device: Option<Value>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct VirtualConfig {
    #[serde(default)]
    pub name: Option<String>,
}

/// LedFx reports an idle virtual as `"effect": {}`, so both fields are optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Effect {
    #[serde(rename = "type", default)]
    pub effect_type: Option<String>,

    #[serde(default)]
    pub config: EffectConfig,
}

impl Virtual {
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.config.name.as_deref().unwrap_or(id)
    }

    /// Type of the running effect, if any.
    pub fn effect_type(&self) -> Option<&str> {
        self.effect
            .as_ref()
            .and_then(|effect| effect.effect_type.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn effect_config(&self) -> Option<&EffectConfig> {
        self.effect.as_ref().map(|effect| &effect.config)
    }

    /// Id of the physical device behind this virtual. LedFx uses a string id,
    /// but older servers send `false` or an empty string for pure virtuals.
    pub fn device_id(&self) -> Option<&str> {
        match &self.is_device {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Device {
    #[serde(default = "default_online")]
    pub online: bool,
}

fn default_online() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

/// One entry of `/api/schema` → `effects`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct EffectDefinition {
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub schema: Map<String, Value>,
}

impl EffectDefinition {
    /// Field defaults declared by the schema. Entries without a `default` are skipped.
    pub fn defaults(&self) -> EffectConfig {
        self.schema
            .iter()
            .filter_map(|(key, field)| {
                field
                    .as_object()
                    .and_then(|field| field.get("default"))
                    .map(|default| (key.clone(), default.clone()))
            })
            .collect()
    }
}

pub type EffectSchema = BTreeMap<String, EffectDefinition>;

/// Body of the create/update effect calls.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EffectRequest {
    #[serde(rename = "type")]
    pub effect_type: String,
    pub config: EffectConfig,
}

/// State of every virtual as of one successful poll.
#[derive(Debug, Clone)]
pub struct Snapshot {
    virtuals: BTreeMap<String, Virtual>,
    fetched_at: Instant,
}

impl Snapshot {
    pub fn new(virtuals: BTreeMap<String, Virtual>) -> Self {
        Snapshot {
            virtuals,
            fetched_at: Instant::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Virtual> {
        self.virtuals.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Virtual)> {
        self.virtuals.iter()
    }

    pub fn len(&self) -> usize {
        self.virtuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.virtuals.is_empty()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// Decode the `virtuals` object one entry at a time so a single odd virtual
/// cannot take the whole poll down.
pub fn decode_virtuals(raw: Map<String, Value>) -> BTreeMap<String, Virtual> {
    raw.into_iter()
        .map(|(id, value)| {
            let virt = serde_json::from_value::<Virtual>(value).unwrap_or_else(|e| {
                warn!("Virtual {} has an unexpected shape, using defaults: {}", id, e);
                Virtual::default()
            });
            (id, virt)
        })
        .collect()
}

/// Same policy as [`decode_virtuals`], for `/api/schema` effects.
pub fn decode_effects(raw: Map<String, Value>) -> EffectSchema {
    raw.into_iter()
        .map(|(name, value)| {
            let definition = serde_json::from_value::<EffectDefinition>(value).unwrap_or_else(|e| {
                warn!("Effect {} has an unexpected schema, ignoring it: {}", name, e);
                EffectDefinition::default()
            });
            (name, definition)
        })
        .collect()
}

/// `/api/devices` entries. An entry that does not decode counts as online.
pub fn decode_devices(raw: Map<String, Value>) -> BTreeMap<String, Device> {
    raw.into_iter()
        .map(|(id, value)| {
            let device = serde_json::from_value::<Device>(value).unwrap_or_else(|e| {
                warn!("Device {} has an unexpected shape, treating it as online: {}", id, e);
                Device { online: true }
            });
            (id, device)
        })
        .collect()
}
