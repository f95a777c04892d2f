//! Mapping between LedFx effect configs and what the entities present.
//!
//! Everything here is pure: reads take a [`Virtual`] from the current
//! snapshot, writes return an [`EffectCommand`] for the caller to send.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::model::{EffectConfig, EffectDefinition, EffectRequest, EffectSchema, Virtual};
use crate::presets::{
    AUDIO_REACTIVE_CATEGORIES, DEFAULT_EFFECT_TYPE, GRADIENT_PRESETS, NON_REACTIVE_CATEGORIES,
};

pub type Rgb = (u8, u8, u8);

static RGB_TRIPLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rgb\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)").expect("rgb() pattern is valid")
});

/// A remote call that realises a UI action.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectCommand {
    /// `POST`: start an effect.
    Create(EffectRequest),
    /// `PUT`: reconfigure the running effect.
    Update(EffectRequest),
    /// `DELETE`: stop the effect.
    Clear,
}

/// Brightness and color requested by a light turn-on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightChanges {
    pub brightness: Option<u8>,
    pub rgb: Option<Rgb>,
}

impl LightChanges {
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.rgb.is_none()
    }
}

pub fn is_on(virt: &Virtual) -> bool {
    virt.active
}

/// LedFx brightness is 0.0-1.0, the light entity exposes 0-255.
pub fn brightness(virt: &Virtual) -> u8 {
    let level = virt
        .effect_config()
        .and_then(|config| config.get("brightness"))
        .and_then(Value::as_f64)
        .unwrap_or(1.0);
    (level.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Representative color of the running effect.
///
/// A gradient wins over `color` since that is what a solid color set from
/// the light entity writes first.
pub fn rgb_color(virt: &Virtual) -> Option<Rgb> {
    let config = virt.effect_config()?;

    if let Some(rgb) = config
        .get("gradient")
        .and_then(Value::as_str)
        .and_then(first_rgb_in_gradient)
    {
        return Some(rgb);
    }

    match config.get("color")? {
        Value::Array(items) if items.len() == 3 => {
            let channels: Option<Vec<u8>> = items.iter().map(channel).collect();
            channels.map(|c| (c[0], c[1], c[2]))
        }
        Value::String(hex) => parse_hex_color(hex),
        _ => None,
    }
}

fn channel(value: &Value) -> Option<u8> {
    value
        .as_f64()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
}

pub fn first_rgb_in_gradient(gradient: &str) -> Option<Rgb> {
    let caps = RGB_TRIPLET.captures(gradient)?;
    let part = |i: usize| -> Option<u8> {
        let value: u32 = caps.get(i)?.as_str().parse().ok()?;
        Some(value.min(255) as u8)
    };
    Some((part(1)?, part(2)?, part(3)?))
}

/// `"#ff8000"` or `"ff8000"`.
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((byte(0)?, byte(2)?, byte(4)?))
}

/// Two-stop gradient holding a single color.
pub fn solid_gradient((r, g, b): Rgb) -> String {
    format!(
        "linear-gradient(90deg, rgb({r}, {g}, {b}) 0%, rgb({r}, {g}, {b}) 100%)"
    )
}

fn current_config(virt: &Virtual) -> EffectConfig {
    virt.effect_config().cloned().unwrap_or_default()
}

/// Type to start when activating: the running effect, else the last one, else the default.
pub fn resolve_effect_type(virt: &Virtual) -> String {
    virt.effect_type()
        .or(virt.last_effect.as_deref().filter(|name| !name.is_empty()))
        .unwrap_or(DEFAULT_EFFECT_TYPE)
        .to_string()
}

/// Patch `config` with the requested changes, keeping every other key.
pub fn apply_light_changes(mut config: EffectConfig, changes: &LightChanges) -> EffectConfig {
    if let Some(brightness) = changes.brightness {
        config.insert("brightness".to_string(), json!(f64::from(brightness) / 255.0));
    }

    if let Some(rgb @ (r, g, b)) = changes.rgb {
        config.insert("gradient".to_string(), json!(solid_gradient(rgb)));
        config.insert("color".to_string(), json!([r, g, b]));
    }

    config
}

/// Light turn-on. An inactive virtual is started with `Create`; an active one
/// is only touched when something changed, with `Update`.
pub fn plan_light_turn_on(virt: &Virtual, changes: &LightChanges) -> Option<EffectCommand> {
    let request = EffectRequest {
        effect_type: resolve_effect_type(virt),
        config: apply_light_changes(current_config(virt), changes),
    };

    if !virt.active {
        Some(EffectCommand::Create(request))
    } else if !changes.is_empty() {
        Some(EffectCommand::Update(request))
    } else {
        None
    }
}

pub fn plan_switch_turn_on(virt: &Virtual) -> EffectCommand {
    EffectCommand::Create(EffectRequest {
        effect_type: resolve_effect_type(virt),
        config: current_config(virt),
    })
}

/// The two effect selectors offered per virtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectGroup {
    AudioReactive,
    NonReactive,
}

impl EffectGroup {
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            EffectGroup::AudioReactive => AUDIO_REACTIVE_CATEGORIES,
            EffectGroup::NonReactive => NON_REACTIVE_CATEGORIES,
        }
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories().contains(&category)
    }
}

/// Sorted names of the effects whose category belongs to `group`.
pub fn effects_in_group(schema: &EffectSchema, group: EffectGroup) -> Vec<String> {
    schema
        .iter()
        .filter(|(_, definition)| group.contains(&definition.category))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Schema defaults overlaid by the current config. Current values win and
/// keys the new effect does not declare are carried along.
pub fn merge_with_defaults(defaults: EffectConfig, current: &EffectConfig) -> EffectConfig {
    let mut merged = defaults;
    for (key, value) in current {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

pub fn plan_effect_selection(
    virt: &Virtual,
    effect_type: &str,
    definition: Option<&EffectDefinition>,
) -> EffectCommand {
    let defaults = definition.map(EffectDefinition::defaults).unwrap_or_default();
    EffectCommand::Create(EffectRequest {
        effect_type: effect_type.to_string(),
        config: merge_with_defaults(defaults, &current_config(virt)),
    })
}

/// Selected option of an effect selector, restricted to its own options.
pub fn current_effect_option(virt: &Virtual, options: &[String]) -> Option<String> {
    let listed = |name: &str| options.iter().any(|option| option == name);

    match virt.effect_type() {
        Some(effect) => listed(effect).then(|| effect.to_string()),
        None => virt
            .last_effect
            .as_deref()
            .filter(|last| listed(*last))
            .map(str::to_string),
    }
}

/// Preset whose gradient string equals the running gradient exactly.
pub fn current_gradient_preset(virt: &Virtual) -> Option<&'static str> {
    let gradient = virt
        .effect_config()
        .and_then(|config| config.get("gradient"))
        .and_then(Value::as_str)?;

    GRADIENT_PRESETS
        .iter()
        .find(|(_, preset)| *preset == gradient)
        .map(|(name, _)| *name)
}

/// Replace only `gradient`; this starts the effect if the virtual is idle.
pub fn plan_gradient_selection(virt: &Virtual, gradient: &str) -> EffectCommand {
    let mut config = current_config(virt);
    config.insert("gradient".to_string(), json!(gradient));
    EffectCommand::Create(EffectRequest {
        effect_type: resolve_effect_type(virt),
        config,
    })
}
