mod alloc;
mod schema;
mod sys;

pub use alloc::*;
pub use schema::*;
pub use sys::*;
