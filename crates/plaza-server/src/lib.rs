//! Server assembly. The routing tree lives in [`app`] so the binary and
//! the black-box tests run the same router.

pub mod app;
