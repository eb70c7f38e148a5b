//! # marathon-core
//!
//! Shared vocabulary for the Marathon events client:
//!
//! - **Event catalog**: [`events::EventKind`] maps a wire `eventType` tag to a
//!   stable identity bit and a typed decode target
//! - **Payloads**: [`events::EventPayload`] and the per-kind structs in
//!   [`events::payloads`]
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber
//! - **Text**: [`text::preview`] for UTF-8–safe log previews of raw payloads
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `marathon-events` and `marathon-tail`.

#![deny(unsafe_code)]

pub mod events;
pub mod logging;
pub mod text;

pub use events::{CatalogError, Event, EventKind, EventPayload};
