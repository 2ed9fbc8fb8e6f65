//! Live delivery of events to connected clients.
//!
//! `FanOut` keeps one outbound queue per connection; `PresenceTracker`
//! records mentor availability and announces changes through it.

pub mod fanout;
pub mod presence;

pub use fanout::{ConnectionId, FanOut};
pub use presence::PresenceTracker;
