use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::LedFxSettings;
use crate::error::LedFxError;
use crate::model::{
    Device, EffectRequest, EffectSchema, ServerInfo, Virtual, decode_devices, decode_effects,
    decode_virtuals,
};

pub const API_INFO: &str = "/api/info";
pub const API_VIRTUALS: &str = "/api/virtuals";
pub const API_DEVICES: &str = "/api/devices";
pub const API_SCHEMA: &str = "/api/schema";

fn effects_path(virtual_id: &str) -> String {
    format!("{}/{}/effects", API_VIRTUALS, virtual_id)
}

/// The slice of the LedFx REST API this crate consumes.
#[async_trait]
pub trait LedFxApi: Send + Sync {
    async fn info(&self) -> Result<ServerInfo, LedFxError>;
    async fn virtuals(&self) -> Result<BTreeMap<String, Virtual>, LedFxError>;
    async fn devices(&self) -> Result<BTreeMap<String, Device>, LedFxError>;
    async fn effect_schema(&self) -> Result<EffectSchema, LedFxError>;

    /// `POST`: start an effect, activating the virtual.
    async fn set_effect(&self, virtual_id: &str, request: &EffectRequest) -> Result<(), LedFxError>;

    /// `PUT`: change the config of the running effect. LedFx wants the type
    /// even though it does not change.
    async fn update_effect(
        &self,
        virtual_id: &str,
        request: &EffectRequest,
    ) -> Result<(), LedFxError>;

    /// `DELETE`: stop the effect, deactivating the virtual.
    async fn clear_effect(&self, virtual_id: &str) -> Result<(), LedFxError>;
}

pub struct LedFxClient {
    http: reqwest::Client,
    base_url: String,
}

impl LedFxClient {
    pub fn new(settings: &LedFxSettings) -> Result<Self, LedFxError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(LedFxClient {
            http,
            base_url: settings.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, LedFxError> {
        let url = self.endpoint(path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LedFxError::transport(&url, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LedFxError::transport(&url, e))?;

        if !status.is_success() {
            return Err(LedFxError::BadStatus {
                url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        trace!("{} answered {} bytes", url, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedFxError> {
        let bytes = self.send::<()>(Method::GET, path, None).await?;
        serde_json::from_slice(&bytes).map_err(|e| LedFxError::Decode {
            url: self.endpoint(path),
            reason: e.to_string(),
        })
    }

    /// GET an envelope like `{"virtuals": {...}}` and return the inner object.
    /// A missing key is an empty collection.
    async fn get_collection(&self, path: &str, key: &str) -> Result<Map<String, Value>, LedFxError> {
        let mut envelope: Map<String, Value> = self.get_json(path).await?;
        match envelope.remove(key) {
            Some(Value::Object(inner)) => Ok(inner),
            Some(Value::Null) | None => Ok(Map::new()),
            Some(other) => Err(LedFxError::Decode {
                url: self.endpoint(path),
                reason: format!("expected an object under \"{}\", got {}", key, other),
            }),
        }
    }
}

#[async_trait]
impl LedFxApi for LedFxClient {
    async fn info(&self) -> Result<ServerInfo, LedFxError> {
        self.get_json(API_INFO).await
    }

    async fn virtuals(&self) -> Result<BTreeMap<String, Virtual>, LedFxError> {
        let raw = self.get_collection(API_VIRTUALS, "virtuals").await?;
        Ok(decode_virtuals(raw))
    }

    async fn devices(&self) -> Result<BTreeMap<String, Device>, LedFxError> {
        let raw = self.get_collection(API_DEVICES, "devices").await?;
        Ok(decode_devices(raw))
    }

    async fn effect_schema(&self) -> Result<EffectSchema, LedFxError> {
        let raw = self.get_collection(API_SCHEMA, "effects").await?;
        Ok(decode_effects(raw))
    }

    async fn set_effect(&self, virtual_id: &str, request: &EffectRequest) -> Result<(), LedFxError> {
        self.send(Method::POST, &effects_path(virtual_id), Some(request))
            .await
            .map(|_| ())
    }

    async fn update_effect(
        &self,
        virtual_id: &str,
        request: &EffectRequest,
    ) -> Result<(), LedFxError> {
        self.send(Method::PUT, &effects_path(virtual_id), Some(request))
            .await
            .map(|_| ())
    }

    async fn clear_effect(&self, virtual_id: &str) -> Result<(), LedFxError> {
        self.send::<()>(Method::DELETE, &effects_path(virtual_id), None)
            .await
            .map(|_| ())
    }
}
