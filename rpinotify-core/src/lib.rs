//! # rpinotify core library
//!
//! Notification dispatch for a small fleet of home-automation scripts: resolve who a
//! notification is for, check each recipient is allowed to receive it, and fan it out
//! to every recipient's delivery channel concurrently.

pub mod directory;
pub mod dispatcher;
pub mod downloader;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod models;

pub use directory::{InMemoryDirectory, JsonFileDirectory, RecipientDirectory};
pub use dispatcher::{Dispatcher, NotifyRequest};
pub use downloader::{Downloader, DownloaderConfig};
pub use error::{ChatApiError, DeliveryError, DirectoryError, DownloaderError, NotifyError};
pub use launcher::{ChatBotApi, DeliveryOutcome, Launcher, TelegramBotApi, Transports};
