//! ALGE/FDS wire protocol: line framing and packet parsing.
//!
//! Bytes arrive from the timer as CR-terminated ASCII records. The
//! [`LineFramer`] reassembles records split across reads, and the
//! [`PacketParser`] turns each record into a [`Packet`](crate::types::Packet)
//! or a [`Rejection`].

mod channel;
mod framer;
mod parser;
mod time;

pub use framer::{DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR, LineFramer};
pub use parser::{DeltaRules, PacketParser, Rejection, parse};
