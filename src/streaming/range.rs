//! HTTP range request handling for partial downloads
//!
//! A `Range` header is fitted to the size of the file being served and
//! turned into a [`DeliveryPlan`]. Partial responses never carry more than
//! [`CHUNK_SIZE`] bytes; clients walk a large file by issuing successive
//! requests with increasing start offsets.
//!
//! Only the first range of a `bytes=` range set is honoured. Headers that do
//! not parse are ignored and the whole file is served, which RFC 7233 allows.

use actix_web::http::StatusCode;
use log::debug;

use crate::storage::StorageError;

/// Upper bound on the bytes delivered by one partial response.
pub const CHUNK_SIZE: u64 = 1_000_000;

/// Inclusive byte interval of a file delivered in a partial response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl RangeWindow {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// How a download request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPlan {
    /// 200 with the whole file
    Full { total_size: u64 },
    /// 206 with one window of the file
    Partial(RangeWindow),
}

impl DeliveryPlan {
    pub fn status(&self) -> StatusCode {
        match self {
            DeliveryPlan::Full { .. } => StatusCode::OK,
            DeliveryPlan::Partial(_) => StatusCode::PARTIAL_CONTENT,
        }
    }

    /// Byte offset of the first byte delivered
    pub fn offset(&self) -> u64 {
        match self {
            DeliveryPlan::Full { .. } => 0,
            DeliveryPlan::Partial(window) => window.start,
        }
    }

    /// Number of bytes delivered, i.e. the `Content-Length`
    pub fn length(&self) -> u64 {
        match self {
            DeliveryPlan::Full { total_size } => *total_size,
            DeliveryPlan::Partial(window) => window.len(),
        }
    }

    pub fn total_size(&self) -> u64 {
        match self {
            DeliveryPlan::Full { total_size } => *total_size,
            DeliveryPlan::Partial(window) => window.total_size,
        }
    }

    pub fn content_range(&self) -> Option<String> {
        match self {
            DeliveryPlan::Full { .. } => None,
            DeliveryPlan::Partial(window) => Some(window.content_range()),
        }
    }
}

/// A single byte range as the client wrote it, before it meets a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRangeSpec {
    /// `bytes=<start>-`
    From(u64),
    /// `bytes=<start>-<end>`
    Bounded(u64, u64),
    /// `bytes=-<suffix_length>`
    Suffix(u64),
}

/// Parse the first range of a `bytes=` Range header value.
pub fn parse_range_header(header: &str) -> Option<ByteRangeSpec> {
    let (unit, ranges) = header.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }

    let first = ranges.split(',').map(str::trim).find(|r| !r.is_empty())?;
    let (start, end) = first.split_once('-')?;

    match (parse_offset(start.trim()), parse_offset(end.trim())) {
        (Some(start), None) if end.trim().is_empty() => Some(ByteRangeSpec::From(start)),
        (Some(start), Some(end)) if start <= end => Some(ByteRangeSpec::Bounded(start, end)),
        (None, Some(suffix)) if start.trim().is_empty() => Some(ByteRangeSpec::Suffix(suffix)),
        _ => None,
    }
}

fn parse_offset(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Plan delivery of a file of `file_size` bytes for an optional Range header.
pub fn plan(range_header: Option<&str>, file_size: u64) -> Result<DeliveryPlan, StorageError> {
    let Some(header) = range_header else {
        return Ok(DeliveryPlan::Full { total_size: file_size });
    };

    let Some(spec) = parse_range_header(header) else {
        debug!("Ignoring unparseable Range header {:?}", header);
        return Ok(DeliveryPlan::Full { total_size: file_size });
    };

    let (start, requested_end) = match spec {
        ByteRangeSpec::From(start) => (start, u64::MAX),
        ByteRangeSpec::Bounded(start, end) => (start, end),
        ByteRangeSpec::Suffix(0) => return Err(StorageError::RangeNotSatisfiable { size: file_size }),
        ByteRangeSpec::Suffix(len) => (file_size.saturating_sub(len), u64::MAX),
    };

    if start >= file_size {
        debug!("Range {:?} not satisfiable for size {}", spec, file_size);
        return Err(StorageError::RangeNotSatisfiable { size: file_size });
    }

    let end = requested_end
        .min(start.saturating_add(CHUNK_SIZE - 1))
        .min(file_size - 1);

    Ok(DeliveryPlan::Partial(RangeWindow {
        start,
        end,
        total_size: file_size,
    }))
}
