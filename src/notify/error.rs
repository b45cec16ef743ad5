// src/notify/error.rs
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Subscriber is closed")]
    Closed,

    #[error("Subscriber queue is full")]
    Full,

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Delivery failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
