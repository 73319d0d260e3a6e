pub mod association;
pub mod execution;
pub mod product;
pub mod rule;
