use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use ledfx_bridge::config::PollSettings;
use ledfx_bridge::entity::Entity;
use ledfx_bridge::model::{
    Device, EffectRequest, EffectSchema, ServerInfo, Virtual, decode_virtuals,
};
use ledfx_bridge::translate::{EffectGroup, LightChanges};
use ledfx_bridge::{Bridge, LedFxApi, LedFxError, SnapshotCache};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(String, EffectRequest),
    Update(String, EffectRequest),
    Clear(String),
}

struct MockApi {
    virtuals: Mutex<Result<BTreeMap<String, Virtual>, LedFxError>>,
    devices: Mutex<Result<BTreeMap<String, Device>, LedFxError>>,
    schema: Mutex<Result<EffectSchema, LedFxError>>,
    info: Mutex<Result<ServerInfo, LedFxError>>,
    mutation_error: Mutex<Option<LedFxError>>,
    /// When set, every virtuals fetch waits for a permit.
    gate: Option<Semaphore>,
    fetches: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl MockApi {
    fn new(virtuals: Value) -> Self {
        MockApi {
            virtuals: Mutex::new(Ok(decode(virtuals))),
            devices: Mutex::new(Ok(BTreeMap::new())),
            schema: Mutex::new(Ok(serde_json::from_value(schema()).unwrap())),
            info: Mutex::new(Ok(ServerInfo::default())),
            mutation_error: Mutex::new(None),
            gate: None,
            fetches: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn gated(virtuals: Value) -> Self {
        MockApi {
            gate: Some(Semaphore::new(0)),
            ..MockApi::new(virtuals)
        }
    }

    fn set_virtuals(&self, virtuals: Result<BTreeMap<String, Virtual>, LedFxError>) {
        *self.virtuals.lock().unwrap() = virtuals;
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), LedFxError> {
        self.calls.lock().unwrap().push(call);
        match self.mutation_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedFxApi for MockApi {
    async fn info(&self) -> Result<ServerInfo, LedFxError> {
        self.info.lock().unwrap().clone()
    }

    async fn virtuals(&self) -> Result<BTreeMap<String, Virtual>, LedFxError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.virtuals.lock().unwrap().clone()
    }

    async fn devices(&self) -> Result<BTreeMap<String, Device>, LedFxError> {
        self.devices.lock().unwrap().clone()
    }

    async fn effect_schema(&self) -> Result<EffectSchema, LedFxError> {
        self.schema.lock().unwrap().clone()
    }

    async fn set_effect(&self, virtual_id: &str, request: &EffectRequest) -> Result<(), LedFxError> {
        self.record(Call::Create(virtual_id.to_string(), request.clone()))
    }

    async fn update_effect(
        &self,
        virtual_id: &str,
        request: &EffectRequest,
    ) -> Result<(), LedFxError> {
        self.record(Call::Update(virtual_id.to_string(), request.clone()))
    }

    async fn clear_effect(&self, virtual_id: &str) -> Result<(), LedFxError> {
        self.record(Call::Clear(virtual_id.to_string()))
    }
}

fn decode(virtuals: Value) -> BTreeMap<String, Virtual> {
    decode_virtuals(virtuals.as_object().cloned().unwrap())
}

fn refused() -> LedFxError {
    LedFxError::Connectivity {
        url: "http://ledfx.test:8888/api/virtuals".to_string(),
        reason: "connection refused".to_string(),
    }
}

fn schema() -> Value {
    json!({
        "energy": {
            "category": "Classic",
            "schema": { "speed": { "default": 1 }, "size": { "default": 3 } }
        },
        "scroll": { "category": "Atmospheric", "schema": {} },
        "singleColor": {
            "category": "Non-Reactive",
            "schema": { "color": { "default": "#ff0000" } }
        },
        "experimental": { "category": "Lab", "schema": {} }
    })
}

fn lounge_and_mask() -> Value {
    json!({
        "lounge": {
            "active": true,
            "effect": { "type": "energy", "config": { "speed": 5, "brightness": 0.5 } },
            "last_effect": "energy",
            "config": { "name": "Lounge" },
            "is_device": "wled-lounge"
        },
        "lounge-mask": {
            "active": false,
            "effect": {},
            "config": { "name": "Lounge-mask" }
        },
        "desk": {
            "active": false,
            "effect": {},
            "last_effect": "scroll",
            "config": { "name": "Desk" }
        }
    })
}

fn settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn concurrent_refreshes_share_one_fetch() {
    let api = Arc::new(MockApi::gated(lounge_and_mask()));
    let cache = SnapshotCache::new(api.clone());

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh().await })
        })
        .collect();

    while api.fetches() == 0 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    api.gate.as_ref().unwrap().add_permits(1);

    let mut snapshots = Vec::new();
    for waiter in waiters {
        snapshots.push(waiter.await.unwrap().unwrap());
    }

    assert_eq!(api.fetches(), 1);
    for snapshot in &snapshots {
        assert!(Arc::ptr_eq(snapshot, &snapshots[0]));
    }
    assert!(Arc::ptr_eq(&cache.current().unwrap(), &snapshots[0]));
}

#[tokio::test]
async fn sequential_refreshes_each_fetch() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let cache = SnapshotCache::new(api.clone());

    cache.refresh().await.unwrap();
    cache.refresh().await.unwrap();

    assert_eq!(api.fetches(), 2);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let cache = SnapshotCache::new(api.clone());
    assert!(cache.current().is_none());

    let first = cache.refresh().await.unwrap();
    assert!(cache.last_refresh_succeeded());

    api.set_virtuals(Err(refused()));
    let err = cache.refresh().await.unwrap_err();
    assert!(err.is_connectivity());
    assert!(!cache.last_refresh_succeeded());
    assert!(Arc::ptr_eq(&cache.current().unwrap(), &first));
    assert_eq!(cache.current().unwrap().len(), 3);
}

#[tokio::test]
async fn setup_fails_when_ledfx_is_unreachable() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    *api.info.lock().unwrap() = Err(refused());

    let err = Bridge::setup(api.clone(), &settings()).await.err().unwrap();
    assert!(err.downcast_ref::<LedFxError>().unwrap().is_connectivity());
    assert_eq!(api.fetches(), 0);
}

#[tokio::test]
async fn setup_fails_when_first_poll_fails() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    api.set_virtuals(Err(LedFxError::BadStatus {
        url: "http://ledfx.test:8888/api/virtuals".to_string(),
        status: 500,
        body: "boom".to_string(),
    }));

    let err = Bridge::setup(api, &settings()).await.err().unwrap();
    assert!(err.downcast_ref::<LedFxError>().unwrap().is_protocol());
}

#[tokio::test]
async fn setup_builds_entities_for_visible_virtuals() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api, &settings()).await.unwrap();

    let ids: Vec<&str> = bridge.entities().map(|e| e.unique_id()).collect();
    assert_eq!(
        ids,
        vec![
            "ledfx_desk",
            "ledfx_lounge",
            "ledfx_desk",
            "ledfx_lounge",
            "ledfx_desk_effect_reactive",
            "ledfx_desk_effect_static",
            "ledfx_lounge_effect_reactive",
            "ledfx_lounge_effect_static",
            "ledfx_desk_gradient",
            "ledfx_lounge_gradient",
        ]
    );
    assert!(bridge.light("lounge-mask").is_none());

    let lounge = bridge.light("lounge").unwrap();
    assert_eq!(lounge.name(), Some("Lounge"));
    assert!(lounge.is_on());
    assert_eq!(lounge.brightness(), 128);
    assert!(lounge.available());

    let reactive = bridge.effect_select("lounge", EffectGroup::AudioReactive).unwrap();
    assert_eq!(reactive.options(), vec!["energy", "scroll"]);
    assert_eq!(reactive.current_option().as_deref(), Some("energy"));

    let fixed = bridge.effect_select("lounge", EffectGroup::NonReactive).unwrap();
    assert_eq!(fixed.options(), vec!["singleColor"]);
    assert_eq!(fixed.current_option(), None);

    let desk = bridge.effect_select("desk", EffectGroup::AudioReactive).unwrap();
    assert_eq!(desk.current_option().as_deref(), Some("scroll"));

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn offline_device_and_missing_schema_degrade_selectors() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    *api.schema.lock().unwrap() = Err(refused());
    let mut devices = BTreeMap::new();
    devices.insert("wled-lounge".to_string(), Device { online: false });
    *api.devices.lock().unwrap() = Ok(devices);

    let bridge = Bridge::setup(api, &settings()).await.unwrap();

    let reactive = bridge.effect_select("desk", EffectGroup::AudioReactive).unwrap();
    assert!(reactive.options().is_empty());
    assert!(!reactive.available());

    assert!(!bridge.switch("lounge").unwrap().available());
    assert!(!bridge.gradient_select("lounge").unwrap().available());
    assert!(bridge.switch("desk").unwrap().available());

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn device_fetch_failure_counts_as_online() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    *api.devices.lock().unwrap() = Err(refused());

    let bridge = Bridge::setup(api, &settings()).await.unwrap();
    assert!(bridge.switch("lounge").unwrap().available());

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn turning_off_sends_one_clear() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();
    let fetches = api.fetches();

    bridge.light("lounge").unwrap().turn_off().await;

    assert_eq!(api.calls(), vec![Call::Clear("lounge".to_string())]);
    assert_eq!(api.fetches(), fetches + 1);

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn brightness_on_inactive_light_creates_effect() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();

    bridge
        .light("desk")
        .unwrap()
        .turn_on(LightChanges {
            brightness: Some(51),
            rgb: None,
        })
        .await;

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Call::Create(id, request) => {
            assert_eq!(id, "desk");
            assert_eq!(request.effect_type, "scroll");
            assert_eq!(Value::Object(request.config.clone()), json!({ "brightness": 0.2 }));
        }
        other => panic!("expected create, got {other:?}"),
    }

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn color_on_active_light_updates_with_type() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();

    bridge
        .light("lounge")
        .unwrap()
        .turn_on(LightChanges {
            brightness: None,
            rgb: Some((10, 20, 30)),
        })
        .await;

    let expected = EffectRequest {
        effect_type: "energy".to_string(),
        config: json!({
            "speed": 5,
            "brightness": 0.5,
            "gradient": "linear-gradient(90deg, rgb(10, 20, 30) 0%, rgb(10, 20, 30) 100%)",
            "color": [10, 20, 30]
        })
        .as_object()
        .cloned()
        .unwrap(),
    };
    assert_eq!(api.calls(), vec![Call::Update("lounge".to_string(), expected)]);

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn plain_turn_on_of_active_light_sends_nothing() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();

    bridge.light("lounge").unwrap().turn_on(LightChanges::default()).await;
    assert!(api.calls().is_empty());

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn failed_mutation_is_swallowed_and_state_is_unchanged() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();
    *api.mutation_error.lock().unwrap() = Some(refused());

    let lounge = bridge.light("lounge").unwrap();
    lounge
        .turn_on(LightChanges {
            brightness: Some(255),
            rgb: None,
        })
        .await;

    assert_eq!(api.calls().len(), 1);
    assert_eq!(lounge.brightness(), 128);
    assert!(lounge.is_on());

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn state_follows_the_next_refresh() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();
    let switch = bridge.switch("desk").unwrap();
    assert!(!switch.is_on());

    let mut after = lounge_and_mask();
    after["desk"]["active"] = json!(true);
    api.set_virtuals(Ok(decode(after)));

    switch.turn_on().await;

    assert!(switch.is_on());
    assert_eq!(
        api.calls(),
        vec![Call::Create(
            "desk".to_string(),
            EffectRequest {
                effect_type: "scroll".to_string(),
                config: Default::default(),
            }
        )]
    );

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn effect_selection_merges_schema_defaults() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();
    let fixed = bridge.effect_select("lounge", EffectGroup::NonReactive).unwrap();

    fixed.select_option("singleColor").await;
    fixed.select_option("energy").await;

    assert_eq!(
        api.calls(),
        vec![Call::Create(
            "lounge".to_string(),
            EffectRequest {
                effect_type: "singleColor".to_string(),
                config: json!({ "speed": 5, "brightness": 0.5, "color": "#ff0000" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            }
        )]
    );

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn gradient_preset_replaces_only_the_gradient() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();
    let gradients = bridge.gradient_select("lounge").unwrap();
    assert_eq!(gradients.options().len(), 8);
    assert_eq!(gradients.current_option(), None);

    gradients.select_option("Plaid").await;
    gradients.select_option("Fire").await;

    let calls = api.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Call::Create(id, request) => {
            assert_eq!(id, "lounge");
            assert_eq!(request.effect_type, "energy");
            assert_eq!(request.config["speed"], json!(5));
            assert_eq!(request.config["brightness"], json!(0.5));
            assert_eq!(
                request.config["gradient"],
                json!(ledfx_bridge::presets::gradient_preset("Fire").unwrap())
            );
        }
        other => panic!("expected create, got {other:?}"),
    }

    bridge.teardown().await.unwrap();
}

#[tokio::test]
async fn light_goes_unavailable_after_failed_poll() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(api.clone(), &settings()).await.unwrap();
    let lounge = bridge.light("lounge").unwrap();
    assert!(lounge.available());

    api.set_virtuals(Err(refused()));
    assert!(bridge.cache().refresh().await.is_err());

    assert!(!lounge.available());
    assert_eq!(lounge.brightness(), 128);

    bridge.teardown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn poller_refreshes_on_interval_until_stopped() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(
        api.clone(),
        &PollSettings {
            interval: Duration::from_secs(30),
        },
    )
    .await
    .unwrap();
    assert_eq!(api.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(api.fetches(), 3);

    bridge.teardown().await.unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(api.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_bridge_stops_polling() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let bridge = Bridge::setup(
        api.clone(),
        &PollSettings {
            interval: Duration::from_secs(30),
        },
    )
    .await
    .unwrap();
    assert_eq!(api.fetches(), 1);

    drop(bridge);
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(api.fetches(), 1);
}

#[tokio::test]
async fn setup_refuses_a_zero_interval() {
    let api = Arc::new(MockApi::new(lounge_and_mask()));
    let result = Bridge::setup(
        api.clone(),
        &PollSettings {
            interval: Duration::ZERO,
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(api.fetches(), 0);
}
