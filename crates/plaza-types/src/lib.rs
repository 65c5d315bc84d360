pub mod api;
pub mod dates;
pub mod validate;
