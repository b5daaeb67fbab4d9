//! Port traits: the capabilities the domain needs from the outside world.

pub mod config_port;
pub mod data_port;
pub mod report_port;
pub mod score_port;
