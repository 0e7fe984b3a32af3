pub mod config;
pub mod delta;
pub mod encode;
pub mod error;
pub mod sender;
pub mod skeleton;
pub mod source;
pub mod streamer;
