pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod filter;
pub mod locator;
pub mod logging;
pub mod notifier;
pub mod signal;
pub mod sink;
pub mod stream;
pub mod watcher;
