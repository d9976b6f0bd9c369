pub mod cleanup;
pub mod config;
pub mod dates;
pub mod logging;
pub mod logs;
pub mod records;
pub mod summary;
