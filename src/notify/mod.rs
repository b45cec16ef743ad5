// src/notify/mod.rs
mod broadcaster;
mod error;
mod subscribers;
mod types;

pub use broadcaster::{EventBroadcaster, Subscriber};
pub use error::DeliveryError;
pub use subscribers::{ChannelSubscriber, LogSubscriber};
pub use types::{AttendancePayload, DeliveryReport, SubscriberId};
