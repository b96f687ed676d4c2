// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod frame;
mod interval;
mod ray;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};
