//! Provisioning lifecycle adapter.
//!
//! Parses custom-resource lifecycle events into a
//! [`MigrationRequest`](migrun_core::request::MigrationRequest), and
//! reports the run's outcome back to the lifecycle's response URL.

pub mod delivery;
pub mod error;
pub mod event;
pub mod response;

pub use delivery::ResponseDelivery;
pub use error::LifecycleError;
pub use event::{LifecycleEvent, TargetDefaults};
pub use response::CompletionResponse;
