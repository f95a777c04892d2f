//! Exposes the virtuals of a LedFx server as smart-home entities.
//!
//! A [`cache::SnapshotCache`] holds the latest `/api/virtuals` poll and is
//! shared by every entity; [`translate`] maps effect configs to light state
//! and UI actions back to LedFx effect calls; [`bridge::Bridge`] wires it
//! together for a host adapter.

pub mod bridge;
pub mod cache;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod model;
pub mod poller;
pub mod presets;
pub mod translate;

pub use bridge::Bridge;
pub use cache::SnapshotCache;
pub use client::{LedFxApi, LedFxClient};
pub use error::LedFxError;
pub use poller::Poller;
