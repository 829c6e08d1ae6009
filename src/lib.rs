pub mod api;
pub mod config;
pub mod events;
pub mod export;
pub mod humanize;
pub mod manager;
pub mod resolver;
pub mod store;
pub mod transfer;
