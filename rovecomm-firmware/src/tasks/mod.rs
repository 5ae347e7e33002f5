//! Embassy tasks for the reference node

mod link;

pub use link::*;
