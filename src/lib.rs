pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use app::{app, build_state};
pub use state::AppState;
