//! Navigation and playback-state coordination for the laud player shell.
//!
//! Everything that mutates `NavState` or `PlaybackSnapshot` runs on the single
//! `ShellCore` event loop; UI taps, the message bus, the hardware cancel
//! signal and engine callbacks all post `ShellEvent`s into its queue.  Engine
//! and favorites calls run off the loop and report back through the same
//! queue.

pub mod back;
pub mod bus;
pub mod context;
pub mod core;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod pending;
pub mod registration;
pub mod router;
pub mod session;
pub mod signals;
pub mod sim;
pub mod state;

pub use crate::core::{Collaborators, ShellBroadcast, ShellCore, ShellEvent, ShellHandle};
pub use crate::error::{CoreError, EngineError, FavoritesError, MirrorError, SessionError};
