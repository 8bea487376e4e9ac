mod allocator;
mod kinds;
mod retry;

pub use allocator::IdAllocator;
pub use kinds::EntityKinds;
pub use retry::RetryPolicy;
