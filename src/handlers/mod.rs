pub mod auth;
pub mod db;
pub mod gate;
pub mod password;
