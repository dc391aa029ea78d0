pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod evidence;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod shipping;
pub mod state;
pub mod store;
