//! Byte-level tee used by raw subtree captures.
use std::io::Read;

/// Forwards reads to the wrapped source and mirrors every byte that went
/// through into an optional capture buffer.
///
/// The reader constructs one of these around its source for every byte
/// access; while a capture is active the buffer receives an exact copy of
/// the consumed stream, which is how `capture_raw` reproduces a subtree
/// verbatim without re-encoding it.
pub(crate) struct TeeReader<'a, R> {
    inner: &'a mut R,
    capture: Option<&'a mut Vec<u8>>,
}

impl<'a, R: Read> TeeReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, capture: Option<&'a mut Vec<u8>>) -> Self {
        Self { inner, capture }
    }
}

impl<R: Read> Read for TeeReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(capture) = &mut self.capture {
            capture.extend_from_slice(&buf[..n]);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::TeeReader;
    use std::io::Read;

    #[test]
    fn mirrors_consumed_bytes() {
        let mut src: &[u8] = &[1, 2, 3, 4, 5];
        let mut captured = vec![];
        let mut tee = TeeReader::new(&mut src, Some(&mut captured));
        let mut buf = [0u8; 3];
        tee.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(captured, [1, 2, 3]);
        // Bytes read without a capture buffer are not recorded anywhere.
        let mut tee = TeeReader::new(&mut src, None);
        tee.read_exact(&mut buf[..2]).unwrap();
        assert_eq!(captured, [1, 2, 3]);
    }
}
