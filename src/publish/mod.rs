pub mod auth;
pub mod retry;
pub mod sheets;

pub use sheets::{SheetsClient, WORKSHEET};
