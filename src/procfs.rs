//! Open-once /proc files and the byte-level number parsing shared by the parsers.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// A /proc file opened once and re-read with pread64, so each sample costs
/// no open()/close() syscalls and no file pointer bookkeeping.
#[derive(Debug)]
pub struct ProcFile {
    file: File,
    path: PathBuf,
    capacity: usize,
}

impl ProcFile {
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(ProcFile {
            file,
            path,
            capacity: capacity.max(64),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file from offset 0.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.capacity];
        let mut len = 0;
        loop {
            if len == buf.len() {
                buf.resize(buf.len() * 2, 0);
            }
            let n = pread_file(self.file.as_raw_fd(), &mut buf[len..], len)?;
            if n == 0 {
                break;
            }
            len += n;
        }
        buf.truncate(len);
        Ok(buf)
    }
}

/// Read file contents at `offset` using the pread64 syscall.
///
/// # Arguments
/// * `fd` - Open file descriptor (must be kept open by caller)
/// * `buf` - Buffer to read into
/// * `offset` - Byte offset to read from
///
/// # Returns
/// Number of bytes read, or io::Error on failure
#[inline]
fn pread_file(fd: i32, buf: &mut [u8], offset: usize) -> io::Result<usize> {
    loop {
        // SAFETY: `buf` is a valid writable region of `buf.len()` bytes and
        // `fd` stays open for the duration of the call.
        let bytes_read = unsafe {
            libc::pread64(
                fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                offset as libc::off64_t,
            )
        };

        if bytes_read >= 0 {
            return Ok(bytes_read as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Parse a u64 from a byte slice, skipping any non-digit bytes
pub fn parse_u64(bytes: &[u8]) -> u64 {
    let mut num = 0u64;
    for &b in bytes {
        if b.is_ascii_digit() {
            num = num.wrapping_mul(10).wrapping_add((b - b'0') as u64);
        }
    }
    num
}

/// Parse the first number of a /proc line (e.g., "MemTotal:  16304284 kB" -> 16304284)
pub fn parse_number_from_line(line: &[u8]) -> u64 {
    let mut num = 0u64;
    let mut in_num = false;

    for &byte in line {
        if byte.is_ascii_digit() {
            num = num.wrapping_mul(10).wrapping_add((byte - b'0') as u64);
            in_num = true;
        } else if in_num {
            return num;
        }
    }

    num
}

/// Split on whitespace, dropping empty fields
pub fn fields(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|&b| b == b' ' || b == b'\t')
        .filter(|f| !f.is_empty())
}

/// Clock ticks per second used by /proc/<pid>/stat and /proc/stat
pub fn clock_ticks_per_second() -> u64 {
    // SAFETY: sysconf has no memory-safety preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        crate::constants::DEFAULT_CLK_TCK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_u64_valid() {
        assert_eq!(parse_u64(b"12345"), 12345);
    }

    #[test]
    fn test_parse_u64_with_non_digits() {
        assert_eq!(parse_u64(b"123abc456"), 123456);
    }

    #[test]
    fn test_parse_u64_empty() {
        assert_eq!(parse_u64(b""), 0);
    }

    #[test]
    fn test_parse_number_from_line_valid() {
        let line = b"MemTotal:       16304284 kB";
        assert_eq!(parse_number_from_line(line), 16304284);
    }

    #[test]
    fn test_parse_number_from_line_no_number() {
        assert_eq!(parse_number_from_line(b"SomeLabel:"), 0);
    }

    #[test]
    fn test_fields_collapses_whitespace() {
        let parts: Vec<&[u8]> = fields(b"  8  0 sda\t12 ").collect();
        let expected: Vec<&[u8]> = vec![&b"8"[..], &b"0"[..], &b"sda"[..], &b"12"[..]];
        assert_eq!(parts, expected);
    }

    #[test]
    fn test_proc_file_reads_past_capacity() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let content = "x".repeat(1000);
        tmp.write_all(content.as_bytes()).unwrap();

        let file = ProcFile::open(tmp.path(), 64).unwrap();
        assert_eq!(file.read().unwrap().len(), 1000);
        // re-reading starts from offset 0 again
        assert_eq!(file.read().unwrap().len(), 1000);
    }

    #[test]
    fn test_clock_ticks_positive() {
        assert!(clock_ticks_per_second() > 0);
    }
}
