//! Wire protocol constants

/// Size of the big-endian length prefix in front of every frame
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default maximum payload size of a single frame
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Largest response payload paired with a request limit of `max_request`
///
/// A notification carries request text plus a claimed name, each of which
/// fits in one request frame, so twice the request limit always suffices.
pub const fn response_frame_limit(max_request: usize) -> usize {
    max_request.saturating_mul(2)
}

// Request tags (client -> hub)
pub const TAG_CHANGE_NAME: u8 = 0x01;
pub const TAG_GLOBAL_MESSAGE: u8 = 0x02;
pub const TAG_DIRECT_MESSAGE: u8 = 0x03;

// Response tags (hub -> client)
pub const TAG_NOTIFICATION: u8 = 0x81;

// Optional string markers
pub const MARKER_ABSENT: u8 = 0x00;
pub const MARKER_PRESENT: u8 = 0x01;
