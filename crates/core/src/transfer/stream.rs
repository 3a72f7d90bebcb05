//! Stream copies between HTTP bodies and staged files.
//!
//! Shared by fetch, publish and the direct-stream response so that no path
//! buffers a whole file in memory.

use futures::{Stream, StreamExt};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Chunk size used when reading staged files.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Failure of [`stream_to_file`]: either the source stream or the file write.
#[derive(Debug)]
pub enum StreamCopyError<E> {
    Source(E),
    Io(std::io::Error),
}

/// Writes every chunk of `stream` to a new file at `path`, returning the
/// number of bytes written.
///
/// The file is truncated first and flushed before returning.
pub async fn stream_to_file<S, B, E>(mut stream: S, path: &Path) -> Result<u64, StreamCopyError<E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut file = File::create(path).await.map_err(StreamCopyError::Io)?;
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(StreamCopyError::Source)?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await.map_err(StreamCopyError::Io)?;
        written += bytes.len() as u64;
    }

    file.flush().await.map_err(StreamCopyError::Io)?;
    Ok(written)
}

/// Opens `path` for streaming, returning its size and a chunked reader.
pub async fn open_file_stream(path: &Path) -> std::io::Result<(u64, ReaderStream<File>)> {
    let file = File::open(path).await?;
    let size = file.metadata().await?.len();
    Ok((size, ReaderStream::with_capacity(file, READ_CHUNK_SIZE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stream_to_file_writes_all_chunks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.bin");
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
            vec![Ok(b"RIFF".to_vec()), Ok(vec![0u8; 1000]), Ok(b"end".to_vec())];

        let written = stream_to_file(stream::iter(chunks), &path).await.unwrap();
        assert_eq!(written, 1007);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1007);
    }

    #[tokio::test]
    async fn test_stream_to_file_surfaces_source_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.bin");
        let chunks: Vec<Result<Vec<u8>, &str>> = vec![Ok(b"abc".to_vec()), Err("connection reset")];

        let err = stream_to_file(stream::iter(chunks), &path).await.unwrap_err();
        assert!(matches!(err, StreamCopyError::Source("connection reset")));
    }

    #[tokio::test]
    async fn test_open_file_stream_reports_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("in.bin");
        std::fs::write(&path, vec![7u8; READ_CHUNK_SIZE + 10]).unwrap();

        let (size, mut reader) = open_file_stream(&path).await.unwrap();
        assert_eq!(size, (READ_CHUNK_SIZE + 10) as u64);

        let mut total = 0;
        while let Some(chunk) = reader.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, READ_CHUNK_SIZE + 10);
    }
}
