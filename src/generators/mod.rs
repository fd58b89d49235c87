pub mod ffi;
pub mod krate;
