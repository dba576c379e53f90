pub mod models;
pub mod error;
pub mod arn;
pub mod actions;
pub mod parameters;
pub mod mutator;
pub mod verdict;
pub mod auth;
pub mod transport;
pub mod response_analysis;
pub mod engine;
pub mod config;
pub mod reporting;

// Re-export commonly used items
pub use models::*;
pub use error::{ProbeError, Result};
pub use arn::*;
pub use actions::{find_action, schedule, select_actions, Action, ActionOrder, ExecutionUnit, ACTIONS};
pub use parameters::*;
pub use mutator::*;
pub use verdict::*;
pub use auth::*;
pub use transport::*;
pub use response_analysis::*;
pub use engine::*;
pub use config::Config;
pub use reporting::*;
