/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Read bytes into `buf` until `delimiter` is seen, EOF is reached, or
/// `max_len` bytes have been accumulated for the current line.
///
/// Returns `(found, len)` where `found` tells whether the delimiter was
/// read (it is included in `buf`) and `len` is the number of bytes
/// appended. `(false, 0)` means EOF before any byte.
pub(crate) async fn limited_read_until<R>(
    reader: &mut R,
    delimiter: u8,
    max_len: usize,
    buf: &mut Vec<u8>,
) -> io::Result<(bool, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut read = 0usize;

    loop {
        let remaining = max_len - read;
        let (found, used) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok((false, read));
            }
            match memchr::memchr(delimiter, available) {
                Some(i) if i < remaining => {
                    buf.extend_from_slice(&available[..=i]);
                    (true, i + 1)
                }
                _ => {
                    let n = available.len().min(remaining);
                    buf.extend_from_slice(&available[..n]);
                    (false, n)
                }
            }
        };
        reader.consume(used);
        read += used;
        if found || read >= max_len {
            return Ok((found, read));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn read_single_line() {
        let mut reader = BufReader::new(&b"220 Welcome\r\nrest"[..]);
        let mut buf = Vec::new();
        let (found, len) = limited_read_until(&mut reader, b'\n', 64, &mut buf)
            .await
            .unwrap();
        assert!(found);
        assert_eq!(len, 13);
        assert_eq!(buf, b"220 Welcome\r\n");
    }

    #[tokio::test]
    async fn read_until_eof() {
        let mut reader = BufReader::new(&b"no newline"[..]);
        let mut buf = Vec::new();
        let (found, len) = limited_read_until(&mut reader, b'\n', 64, &mut buf)
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(len, 10);

        buf.clear();
        let (found, len) = limited_read_until(&mut reader, b'\n', 64, &mut buf)
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn stop_at_max_len() {
        let mut reader = BufReader::new(&b"0123456789\n"[..]);
        let mut buf = Vec::new();
        let (found, len) = limited_read_until(&mut reader, b'\n', 4, &mut buf)
            .await
            .unwrap();
        assert!(!found);
        assert_eq!(len, 4);
        assert_eq!(buf, b"0123");
    }
}
