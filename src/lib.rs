pub mod config;
pub mod error;
pub mod locate;
pub mod publish;
pub mod report;
