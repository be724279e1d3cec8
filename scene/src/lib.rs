pub mod compose;
pub mod engine;
pub mod fixtures;
pub mod geom;
pub mod preview;
