#![allow(dead_code, unused_imports)]

pub mod builders;
pub mod harness;

pub use builders::{point, track, zone, FeatureBuilder, ToolBuilder};
pub use harness::TestHarness;
