pub mod meta;
pub mod names;
