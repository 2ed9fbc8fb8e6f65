//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (mentorline-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod directory;
pub mod ledger;
pub mod presence;
pub mod session;

pub use directory::MentorDirectory;
pub use ledger::LedgerRepository;
pub use presence::PresenceRepository;
pub use session::SessionRepository;
