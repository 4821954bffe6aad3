pub mod api;
pub mod db;
pub mod fixtures;
pub mod live;
pub mod models;
pub mod outcome;
pub mod preferences;
pub mod repository;
