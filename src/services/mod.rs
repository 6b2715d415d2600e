pub mod lottery_entry_service;
pub mod lottery_execution_service;
pub mod lottery_stats_service;

pub use lottery_entry_service::*;
pub use lottery_execution_service::*;
pub use lottery_stats_service::*;
