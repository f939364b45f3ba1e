// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A semihosting protocol bridge transported as a RIFF-family binary container.
//!
//! Guest programs running inside an emulator (or on bare-metal hardware) request host
//! services — file I/O, console I/O, time, process lifecycle — through a small
//! memory-mapped device rather than through platform-specific trap instructions. The
//! wire format is a self-describing `RIFF`/`SEMI` container and the service set mirrors
//! the widely implemented Arm semihosting interface.
//!
//! The crate is organized around the two halves of the bridge:
//!
//! - [`wire`], [`proto`], and [`parser`] implement the container format itself: encoding,
//!   the per-opcode operation table, and a single-pass, allocation-free request parser.
//! - [`processor`] and [`sandbox`] implement the host side: a [`processor::Processor`]
//!   that reads a request out of guest memory through a [`memaccess::MemoryAccess`]
//!   capability, dispatches it to a [`backend::Backend`] capability, and writes the
//!   response back in place.
//!
//! [`builder`] is the thin guest-side counterpart: it encodes requests and pre-sizes
//! response chunks from the same operation table the host dispatcher consults, so there
//! is exactly one source of truth for the wire shape of every opcode.
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    single_use_lifetimes,
    unreachable_pub
)]

pub mod backend;
pub mod builder;
pub mod config;
pub mod device;
pub mod error;
pub mod memaccess;
pub mod parser;
pub mod proto;
pub mod processor;
#[cfg(feature = "fs-backend")]
pub mod sandbox;
pub mod session;
pub mod wire;

pub use config::{Endianness, HostConfig};
pub use error::LibraryError;
pub use memaccess::MemoryAccess;
pub use processor::Processor;
pub use proto::opcode::Opcode;
pub use session::Session;
