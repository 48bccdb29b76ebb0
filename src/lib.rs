#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links, rust_2018_idioms)]
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::explicit_iter_loop,
    clippy::todo,
    clippy::unimplemented,
    clippy::use_self,
    clippy::doc_markdown,
    clippy::print_stdout,
    missing_debug_implementations,
    unused_crate_dependencies,
    unreachable_pub,
    missing_docs
)]

mod errors;
pub use errors::{Error, TlsOp};

mod crc32;

mod padding;

mod packet;
pub use packet::{Packet, PacketType, MAX_PACKET_DATA_LEN, PACKET_LEN};

mod command;
pub use command::{Command, CommandResult, Status};

mod transport;
pub use transport::Transport;

mod client;
pub use client::run;

mod server;
pub use server::{serve_one, HandlerError};

mod tls;
pub use tls::TlsStream;

// Unused crate lint workaround for dev dependency.
#[cfg(test)]
use criterion as _;
