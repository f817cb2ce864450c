pub mod assemble;
pub mod collaborators;
pub mod config;
pub mod duration;
pub mod effect;
pub mod model;
pub mod rank;
pub mod report;
pub mod stats;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;
