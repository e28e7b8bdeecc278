//! Client side of the TWS API wire protocol: token buffering, scalar readers,
//! and the message decoder that turns token streams into typed events.

pub mod decoder;
pub mod events;
pub mod messages;
pub mod queue;
pub mod scalar;

pub use decoder::Decoder;
pub use events::{ApiError, Event, EventName};
