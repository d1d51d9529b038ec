pub mod attendance;
pub mod auth;
pub mod docs;
pub mod dto;
pub mod error;
pub mod extract;
pub mod health;
pub mod request_log;
pub mod schedules;
pub mod tasks;
