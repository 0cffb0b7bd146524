//! Domain & integration events.
//!
//! - [`Event`]: trait every engine/domain event implements.
//! - [`EventEnvelope`]: the unit appended to the [`EventLog`] and published on an [`EventBus`].
//! - [`integration`]: order lifecycle / stock events consumed from collaborators.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod integration;
pub mod log;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use log::EventLog;
