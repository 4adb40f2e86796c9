pub mod setting;
pub mod config;
pub mod dbconfig;
pub mod calendar;

pub use setting::Settings;
pub use config::{PartitionConfig, TargetConfig};
pub use dbconfig::{ConnectionConfig, DbConfig, RetryConfig, SessionConfig};
pub use calendar::Calendar;
