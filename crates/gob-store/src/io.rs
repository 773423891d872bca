//! Stream helpers shared by chunk, cat and the repository.

use std::io::{self, Read};

/// Fill `buf` from `reader`, stopping early only at end of stream.
///
/// Short reads are accumulated. `Interrupted` and `WouldBlock` are retried;
/// every other error is returned. Returns the number of bytes placed in
/// `buf`, which is less than `buf.len()` only when the stream ended.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if is_transient(&e) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}
