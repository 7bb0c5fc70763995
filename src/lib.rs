pub mod classify;
pub mod config;
pub mod fake_feed;
pub mod http_client;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod render;
pub mod state;
pub mod vpfs_api;
