pub mod capture;
pub mod cli;
pub mod config;
pub mod global;
pub mod terminal;
pub mod timing;
pub mod upload;
