pub mod lottery;

pub use lottery::lottery_config;
