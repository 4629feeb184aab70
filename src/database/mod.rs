pub mod connection;
pub mod indexes;
