pub mod config;
pub mod logging;
pub mod paths;

pub mod auth;
pub mod classify;
pub mod conflict;
pub mod console;
pub mod credentials;
pub mod depot;
pub mod job;
pub mod runner;
pub mod scheduler;
pub mod template;
