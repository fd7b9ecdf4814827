use std::io;

use futures::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Yield each `\n`-terminated line of `reader` without its terminator.
///
/// Unlike `AsyncBufReadExt::lines`, invalid UTF-8 does not end the stream:
/// offending bytes become U+FFFD. A trailing `\r` is stripped too, and a
/// final line without a newline is still yielded.
pub fn lossy_lines<R>(mut reader: R) -> impl Stream<Item = io::Result<String>>
where
    R: AsyncBufRead + Unpin,
{
    async_stream::try_stream! {
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                break;
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            yield String::from_utf8_lossy(&buf).into_owned();
        }
    }
}
