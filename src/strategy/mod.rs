//! Request classification and the caching strategies applied per class.

mod classifier;
mod executor;
mod table;

pub use classifier::{Classification, Classifier};
pub use executor::StrategyExecutor;
pub(crate) use executor::write_through;
pub use table::{partition_capacity, strategy_for, StrategyConfig, StrategyKind};
