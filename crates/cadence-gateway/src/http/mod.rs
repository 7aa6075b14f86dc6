pub mod activity;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod jobs;
pub mod learner;
pub mod queue;
