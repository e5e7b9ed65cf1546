pub mod analysis;
pub mod compose;
pub mod context;
pub mod literature;
pub mod outlet;
pub mod outline;
pub mod workflow;
