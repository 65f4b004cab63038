//! Byte streaming primitives shared by the file service and the handlers

pub mod range;

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

pub use range::{plan, DeliveryPlan, RangeWindow, CHUNK_SIZE};

/// A boxed stream of file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Read buffer used when streaming files to clients.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;
