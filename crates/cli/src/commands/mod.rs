pub mod agents;
pub mod completions;
pub mod context;
pub mod serve;
pub mod status;
