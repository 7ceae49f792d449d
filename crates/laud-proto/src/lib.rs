pub mod config;
pub mod nav;
pub mod platform;
pub mod playback;
pub mod protocol;
