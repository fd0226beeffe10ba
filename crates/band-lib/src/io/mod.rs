pub mod csv;
pub mod serial;
pub mod wire;
