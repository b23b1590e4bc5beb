//! Streaming body codecs for form submissions with large attachments.
//!
//! [`FormEncoder`] produces `application/x-www-form-urlencoded` bodies from text and streamed
//! values without materializing the streams; [`Base64Reader`] bridges binary sources into it.

mod base64_reader;
mod form;

pub use base64_reader::*;
pub use form::*;
