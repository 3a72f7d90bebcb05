//! Byte transport for source downloads and output uploads.

mod error;
mod http;
mod stream;

pub use error::{FetchError, PublishError};
pub use http::{Fetcher, HttpTransfer, Publisher};
pub use stream::{open_file_stream, stream_to_file, StreamCopyError, READ_CHUNK_SIZE};
