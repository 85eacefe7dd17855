pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod gating;
pub mod network;
pub mod session_management;
pub mod traffic_analysis;
pub mod web_interface;
