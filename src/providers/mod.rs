//! Line source implementations

pub mod capture;
pub mod channel;

pub use capture::CaptureProvider;
pub use channel::{ChannelProvider, ChunkSender};
