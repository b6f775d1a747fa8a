pub mod config;
pub mod content_id;
pub mod context;
pub mod history;
pub mod i18n;
pub mod logging;
