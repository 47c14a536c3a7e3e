pub mod auth;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod media;
pub mod models;
pub mod seed;
pub mod services;
pub mod state;
