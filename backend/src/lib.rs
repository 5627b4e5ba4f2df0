pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod images;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod storage;
