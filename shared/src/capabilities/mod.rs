//! Effects the core requests from the shell.
//!
//! Besides rendering, the core needs two things from the platform: the
//! peripheral link ([`PeripheralLink`]) and one-shot timers for expiring
//! feedback ([`FeedbackTimer`]). [`SimulatedLink`] is the shell-side double
//! that answers link operations during development and in tests.

mod link;
mod simulated;
mod timer;

pub use self::link::{
    LinkError, LinkOperation, LinkOutput, LinkResult, LinkStatus, PeripheralLink,
};
pub use self::simulated::{SimulatedLink, SimulatedLinkConfig};
pub use self::timer::{FeedbackTimer, TimerOperation, TimerOutput};
pub use crux_core::render::Render;

// The Effect derive wires `Capabilities` to `App` by name.
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub peripheral_link: PeripheralLink<Event>,
    pub feedback_timer: FeedbackTimer<Event>,
}
