pub mod config;
pub mod energy;
pub mod feed;
pub mod messages;
pub mod rig;
pub mod runtime;
pub mod stream;
