pub mod bridge;
pub mod csv;
pub mod script;
