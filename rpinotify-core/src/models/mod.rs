//! Data models for rpinotify

pub mod configuration;
pub mod destination;
pub mod dispatch;
pub mod recipient;
pub mod service;

pub use configuration::*;
pub use destination::*;
pub use dispatch::*;
pub use recipient::*;
pub use service::*;
