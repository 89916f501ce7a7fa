pub mod cache;
pub mod config;
pub mod constants;
pub mod display;
pub mod domain;
pub mod email;
pub mod error;
pub mod functions;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod queries;
pub mod referral;
pub mod server;
pub mod state;
pub mod storage;
pub mod value;
