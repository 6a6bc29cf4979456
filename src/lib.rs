pub mod agents;
pub mod constants;
pub mod engine;
pub mod error;
pub mod grid;
pub mod mutator;
pub mod pathfinding;
pub mod rng;
pub mod topology;
pub mod types;
pub mod world;
