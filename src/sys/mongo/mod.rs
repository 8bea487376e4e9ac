mod collections;
mod counter;
mod details;

pub use collections::Collections;
pub use counter::CounterRecord;
pub use details::Mongo;
