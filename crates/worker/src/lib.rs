//! Task spawning and generation-token primitives shared by sift services.
//!
//! * [`spawn`] routes futures onto the entered tokio runtime, tagging each task
//!   with a [`TaskClass`] for tracing.
//! * [`GenerationClock`] issues strictly increasing generation IDs.
//! * [`GenerationToken`] pairs one generation with its cancellation signal.

mod class;
mod spawn;
mod token;

pub use class::TaskClass;
pub use spawn::spawn;
pub use token::{GenerationClock, GenerationToken};
