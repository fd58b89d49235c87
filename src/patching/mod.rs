pub mod constants;
pub mod enumerations;
pub mod structures;
pub mod values;
