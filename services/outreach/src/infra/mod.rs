pub mod db;
pub mod transport;
