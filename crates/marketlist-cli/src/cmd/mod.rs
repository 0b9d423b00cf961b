pub mod config;
pub mod health;
pub mod init;
pub mod progress;
pub mod run;
pub mod selector;
