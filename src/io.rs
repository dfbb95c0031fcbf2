//! Transfer engine shared by pack and unpack.
//!
//! Every directive moves its bytes with a single primitive `read` or `write`
//! call. Interruptions are retried; anything else that moves fewer bytes than
//! asked latches a sticky error for the rest of the call.

use std::io::{ErrorKind, Read, Write};

use tracing::{debug, trace};

use crate::{Error, Result};

/// Per-call transfer state.
#[derive(Debug, Default)]
pub struct Transfer {
    ret: isize,
    failed: bool,
    cause: Option<Error>,
}

impl Transfer {
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Running byte total, or the raw return code of the transfer that failed.
    pub fn ret(&self) -> isize {
        self.ret
    }

    pub fn write<W: Write + ?Sized>(&mut self, w: &mut W, buf: &[u8]) {
        self.io("write", buf.len(), || w.write(buf));
    }

    pub fn read<R: Read + ?Sized>(&mut self, r: &mut R, buf: &mut [u8]) {
        let size = buf.len();
        self.io("read", size, || r.read(&mut *buf));
    }

    fn io<F>(&mut self, op: &'static str, size: usize, mut f: F)
    where
        F: FnMut() -> std::io::Result<usize>,
    {
        if self.failed || size == 0 {
            return;
        }

        let res = loop {
            match f() {
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    trace!(op, size, "interrupted, retrying");
                    continue;
                }
                other => break other,
            }
        };

        match res {
            Ok(n) if n == size => {
                self.ret += n as isize;
                self.failed = false;
            }

            Ok(n) => {
                self.ret = n as isize;
                self.fail(Error::ShortTransfer { want: size, got: n });
            }

            Err(e) => {
                self.ret = -1;
                self.fail(e.into());
            }
        }
    }

    /// Latches `e` unless an earlier error is already latched.
    pub fn fail(&mut self, e: Error) {
        if self.failed {
            return;
        }

        debug!(ret = self.ret, "transfer failed: {}", e);
        self.failed = true;
        self.cause = Some(e);
    }

    /// Total bytes moved, or the latched error.
    pub fn finish(self) -> Result<usize> {
        match (self.failed, self.cause) {
            (false, _) => Ok(self.ret as usize),
            (true, Some(e)) => Err(e),
            (true, None) => Err(Error::InvalidData("transfer failed".into())),
        }
    }
}

#[cfg(unix)]
pub use self::fd::Fd;

#[cfg(unix)]
mod fd {
    use std::io::{Read, Result, Write};
    use std::os::unix::io::{AsRawFd, RawFd};

    /// A borrowed raw descriptor, read and written with plain `read(2)`/`write(2)`.
    ///
    /// The descriptor is not closed on drop.
    #[derive(Debug, Clone, Copy)]
    pub struct Fd(RawFd);

    impl Fd {
        pub fn of<T: AsRawFd + ?Sized>(inner: &T) -> Self {
            Fd(inner.as_raw_fd())
        }
    }

    impl AsRawFd for Fd {
        fn as_raw_fd(&self) -> RawFd {
            self.0
        }
    }

    fn cvt(ret: libc::ssize_t) -> Result<usize> {
        if ret < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(ret as usize)
        }
    }

    impl Read for Fd {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            // SAFETY: buf is valid for writes of buf.len() bytes.
            cvt(unsafe { libc::read(self.0, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) })
        }
    }

    impl Write for Fd {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            // SAFETY: buf is valid for reads of buf.len() bytes.
            cvt(unsafe { libc::write(self.0, buf.as_ptr() as *const libc::c_void, buf.len()) })
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    /// Fails with `Interrupted` a few times before each successful write.
    struct Flaky {
        interrupts: usize,
        calls: usize,
        out: Vec<u8>,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn accumulates_bytes() {
        let mut sink = Vec::new();
        let mut state = Transfer::default();
        state.write(&mut sink, &[1, 2, 3]);
        state.write(&mut sink, &[4]);
        assert_eq!(state.ret(), 4);
        assert_eq!(state.finish().expect("ok"), 4);
        assert_eq!(sink, [1, 2, 3, 4]);
    }

    #[test]
    fn retries_interruptions() {
        let mut sink = Flaky {
            interrupts: 3,
            calls: 0,
            out: Vec::new(),
        };
        let mut state = Transfer::default();
        state.write(&mut sink, b"abc");
        assert!(!state.failed());
        assert_eq!(sink.calls, 4);
        assert_eq!(sink.out, b"abc");
    }

    #[test]
    fn short_read_is_sticky() {
        let mut src = Cursor::new(vec![1u8, 2]);
        let mut state = Transfer::default();
        let mut buf = [0u8; 4];
        state.read(&mut src, &mut buf);
        assert!(state.failed());
        assert_eq!(state.ret(), 2);

        // later transfers are no-ops
        let mut sink = Vec::new();
        state.write(&mut sink, b"zz");
        assert!(sink.is_empty());

        match state.finish() {
            Err(Error::ShortTransfer { want: 4, got: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn hard_error_sets_raw_code() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut state = Transfer::default();
        state.write(&mut Broken, b"x");
        assert_eq!(state.ret(), -1);
        assert!(matches!(state.finish(), Err(Error::IO(_))));
    }

    #[test]
    fn zero_size_is_noop() {
        let mut src = Cursor::new(Vec::<u8>::new());
        let mut state = Transfer::default();
        state.read(&mut src, &mut []);
        assert!(!state.failed());
        assert_eq!(state.finish().expect("ok"), 0);
    }

    #[cfg(unix)]
    #[test]
    fn fd_round_trip() {
        use std::os::unix::net::UnixStream;

        let (a, b) = UnixStream::pair().expect("socket pair");
        let mut state = Transfer::default();
        state.write(&mut Fd::of(&a), b"hello");

        let mut buf = [0u8; 5];
        state.read(&mut Fd::of(&b), &mut buf);
        assert_eq!(&buf, b"hello");
        assert_eq!(state.finish().expect("ok"), 10);
    }
}
