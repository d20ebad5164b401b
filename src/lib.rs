// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod api;
pub mod config;
pub mod live;
pub mod local;
pub mod logging;
pub mod session;
pub mod store;
pub mod timer;
pub mod veto;
pub mod ws_client;
