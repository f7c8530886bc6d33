//! Headless core for multiplexing remote terminal sessions into a pane grid.
//!
//! The crate connects a session-owning backend to a pane-based display:
//! sessions map onto display slots, slots carry a persistent ordering, a
//! layout mode turns the ordering into concrete pane geometry, and each
//! visible pane owns a websocket channel with timeout/retry handling plus an
//! embedded terminal grid. `Workspace` ties the pieces together behind one
//! synchronous, tick-driven surface; a UI shell supplies the event loop, the
//! rendering, and the backend/persistence collaborators.

pub mod config;
pub mod error;
pub mod layout;
pub mod mounts;
pub mod ordering;
pub mod scroll;
pub mod session;
pub mod slots;
pub mod transport;
pub mod workspace;

pub use config::Config;
pub use workspace::Workspace;
