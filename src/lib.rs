pub mod combat;
pub mod config;
pub mod domain;
pub mod error;
pub mod net;
pub mod physics;
pub mod room;
pub mod server;
