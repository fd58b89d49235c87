pub mod docs;
pub mod xplm;
