pub mod decision;
pub mod gating_engine;
pub mod marker_parser;
pub mod processor;
pub mod routing;

pub use decision::{GateAction, GateDecision};
pub use gating_engine::GatingEngine;
pub use marker_parser::{parse_marker, Marker};
pub use processor::{EchoProcessor, FrameProcessor};
pub use routing::{FixedRoute, RouteSelector};
