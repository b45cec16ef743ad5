// src/storage/mod.rs
mod errors;
mod memory;
mod rocks;
mod types;

pub use errors::{Result, StoreError};
pub use memory::InMemoryAttendanceStore;
pub use rocks::RocksAttendanceStore;
pub use types::{AttendanceRecord, AttendanceStore};

#[cfg(test)]
pub use types::MockAttendanceStore;
