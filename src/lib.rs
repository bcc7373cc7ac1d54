pub mod api;
pub mod backup;
pub mod client;
pub mod db;
