//! agni: floating AI assistant widget core
//!
//! This library provides:
//! - The cross-context messaging protocol binding the host page, the
//!   injected frame, the content script, and the background worker
//! - The background worker (settings owner, context menus, notifications)
//! - The content-script injector (idempotent install, frame geometry)
//! - Task persistence with a polling reminder scheduler
//! - HTTP proxy endpoints (`/chat`, `/research`) over the completion gateway

pub mod assist;
pub mod background;
pub mod config;
pub mod gateway;
pub mod injector;
pub mod notify;
pub mod protocol;
pub mod proxy;
pub mod runtime;
pub mod storage;
pub mod tasks;

pub use config::Config;
pub use protocol::{CrossContextMessage, Settings};
pub use runtime::WidgetRuntime;
pub use storage::WidgetStorage;
