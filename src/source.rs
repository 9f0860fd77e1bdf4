// Byte source: random-access read over a file path.
//
// Prefers a memory map so worker threads can index disjoint ranges of the
// same immutable backing store without a shared cursor (spec's
// concurrency model, "shared state" clause). Falls back to a single
// buffered read when the file cannot be mapped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;

use crate::error::LoadError;

pub enum ByteSource {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl ByteSource {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| LoadError::io(path, e))?
            .len();

        if len == 0 {
            return Ok(ByteSource::Buffered(Vec::new()));
        }

        // SAFETY: the mapping is read-only and the file is not modified by
        // this process for the lifetime of the `Loader`; concurrent
        // external mutation is a documented hazard of mmap-based readers
        // (the same tradeoff the teacher's `as_df` mmap path accepts).
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => Ok(ByteSource::Mapped(mmap)),
            Err(_) => {
                let mut file = file;
                let mut buf = Vec::with_capacity(len as usize);
                file.read_to_end(&mut buf).map_err(|e| LoadError::io(path, e))?;
                Ok(ByteSource::Buffered(buf))
            }
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match self {
            ByteSource::Mapped(m) => m,
            ByteSource::Buffered(b) => b,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether random-access chunking across worker threads is safe;
    /// buffered-but-unmapped input still allows it (it's just a `Vec<u8>`
    /// slice), this exists to document the chunker's `N=1` fallback is
    /// driven by file-size/mappability, not by this flag.
    pub fn is_mapped(&self) -> bool {
        matches!(self, ByteSource::Mapped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_is_buffered_and_empty() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let src = ByteSource::open(tmp.path()).unwrap();
        assert!(src.is_empty());
    }

    #[test]
    fn nonempty_file_is_mapped_and_readable() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"a,b,c\n1,2,3\n").unwrap();
        tmp.flush().unwrap();
        let src = ByteSource::open(tmp.path()).unwrap();
        assert_eq!(src.bytes(), b"a,b,c\n1,2,3\n");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ByteSource::open(Path::new("/nonexistent/path/does/not/exist.csv"));
        assert!(matches!(err, Err(LoadError::Io { .. })));
    }
}
