//! The directive interpreter.

use std::ffi::CString;
use std::io::{Read, Write};
use std::mem::size_of;

use tracing::{debug, trace, warn};

use crate::arg::{bind_args, bind_slots, Arg, Bound, BoundMut, Slot};
use crate::format::Format;
use crate::io::Transfer;
use crate::native::MAX_WIDTH;
use crate::{Error, Result};

/// Largest buffer a single unpack directive may allocate.
pub const DEFAULT_ALLOC_LIMIT: usize = 16 * 1024 * 1024;

/// Packs and unpacks values according to a format.
///
/// The only setting is the allocation ceiling applied to strings and arrays
/// read off the wire.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    alloc_limit: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Codec {
            alloc_limit: DEFAULT_ALLOC_LIMIT,
        }
    }
}

impl Codec {
    pub fn with_alloc_limit(alloc_limit: usize) -> Self {
        Codec { alloc_limit }
    }

    pub fn alloc_limit(&self) -> usize {
        self.alloc_limit
    }

    pub fn pack<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        fmt: &str,
        args: &[Arg<'_>],
    ) -> Result<usize> {
        let format = parse(fmt)?;
        self.pack_format(sink, &format, args)
    }

    pub fn unpack<R: Read + ?Sized>(
        &self,
        source: &mut R,
        fmt: &str,
        slots: &mut [Slot<'_>],
    ) -> Result<usize> {
        let format = parse(fmt)?;
        self.unpack_format(source, &format, slots)
    }

    /// Writes `args` to `sink` as laid out by `format`.
    ///
    /// Returns the number of bytes written, length prefixes included. On
    /// error the bytes already written stay in the sink.
    pub fn pack_format<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        format: &Format,
        args: &[Arg<'_>],
    ) -> Result<usize> {
        let bound = bind_args(format.directives(), args)?;
        let mut state = Transfer::default();

        for (i, (d, b)) in format.directives().iter().zip(bound).enumerate() {
            trace!(index = i, directive = %d, "pack");
            match b {
                Bound::Scalar(v) => {
                    let mut buf = [0u8; MAX_WIDTH];
                    state.write(sink, v.encode(&mut buf));
                }

                Bound::Str(s) => {
                    let bytes = s.to_bytes_with_nul();
                    state.write(sink, &bytes.len().to_ne_bytes());
                    state.write(sink, bytes);
                }

                Bound::Array { count, elems } => {
                    state.write(sink, &count.to_ne_bytes());
                    state.write(sink, &elems.to_ne_bytes(count));
                }
            }

            if state.failed() {
                debug!(index = i, directive = %d, ret = state.ret(), "pack aborted");
                break;
            }
        }

        state.finish()
    }

    /// Reads values from `source` into `slots` as laid out by `format`.
    ///
    /// Strings and arrays are freshly allocated and installed into their slots.
    /// A slot is only written once its directive has fully succeeded, so on
    /// error every slot of an earlier directive holds its new value and every
    /// later slot is untouched.
    pub fn unpack_format<R: Read + ?Sized>(
        &self,
        source: &mut R,
        format: &Format,
        slots: &mut [Slot<'_>],
    ) -> Result<usize> {
        let bound = bind_slots(format.directives(), slots)?;
        let mut state = Transfer::default();

        for (i, (d, b)) in format.directives().iter().zip(bound).enumerate() {
            trace!(index = i, directive = %d, "unpack");
            match b {
                BoundMut::Scalar(slot) => {
                    let mut buf = [0u8; MAX_WIDTH];
                    let buf = &mut buf[..slot.width()];
                    state.read(source, buf);
                    if !state.failed() {
                        slot.set_ne_bytes(buf);
                    }
                }

                BoundMut::Str(out) => {
                    if let Some(s) = self.read_str(&mut state, source) {
                        *out = s;
                    }
                }

                BoundMut::Array { count, elems } => {
                    let n = match read_size(&mut state, source) {
                        Some(n) => n,
                        None => break,
                    };

                    if let Some(c) = count.as_ref() {
                        if !c.fits_count(n) {
                            state.fail(Error::InvalidData(
                                format!("discovered count {} does not fit its slot", n).into(),
                            ));
                            break;
                        }
                    }

                    let mut buf = match self.alloc(&mut state, n, elems.width()) {
                        Some(buf) => buf,
                        None => break,
                    };
                    state.read(source, &mut buf);
                    if state.failed() {
                        break;
                    }

                    if buf.is_empty() {
                        elems.clear();
                    } else if let Err(e) = elems.install(&buf) {
                        state.fail(e);
                        break;
                    }

                    if let Some(c) = count {
                        c.set_count(n);
                    }
                }
            }

            if state.failed() {
                debug!(index = i, directive = %d, ret = state.ret(), "unpack aborted");
                break;
            }
        }

        state.finish()
    }

    fn read_str<R: Read + ?Sized>(&self, state: &mut Transfer, source: &mut R) -> Option<CString> {
        let len = read_size(state, source)?;
        if len == 0 {
            state.fail(Error::InvalidData("zero-length string".into()));
            return None;
        }

        let mut buf = self.alloc(state, len, 1)?;
        state.read(source, &mut buf);
        if state.failed() {
            return None;
        }

        match CString::from_vec_with_nul(buf) {
            Ok(s) => Some(s),
            Err(_) => {
                state.fail(Error::InvalidData(
                    "string is not a single NUL-terminated run".into(),
                ));
                None
            }
        }
    }

    /// Allocates a zeroed buffer of `nmemb * size` bytes, within the ceiling.
    ///
    /// A zero-byte request succeeds without allocating.
    fn alloc(&self, state: &mut Transfer, nmemb: usize, size: usize) -> Option<Vec<u8>> {
        if state.failed() {
            return None;
        }

        let want = nmemb.checked_mul(size);
        match want {
            Some(0) => Some(Vec::new()),

            Some(n) if n <= self.alloc_limit => {
                let mut buf = Vec::new();
                if buf.try_reserve_exact(n).is_err() {
                    state.fail(Error::Alloc {
                        want,
                        limit: self.alloc_limit,
                    });
                    return None;
                }
                buf.resize(n, 0);
                Some(buf)
            }

            _ => {
                state.fail(Error::Alloc {
                    want,
                    limit: self.alloc_limit,
                });
                None
            }
        }
    }
}

fn parse(fmt: &str) -> Result<Format> {
    Format::parse(fmt).map_err(|e| {
        warn!(fmt, "{}", e);
        e
    })
}

fn read_size<R: Read + ?Sized>(state: &mut Transfer, source: &mut R) -> Option<usize> {
    let mut buf = [0u8; size_of::<usize>()];
    state.read(source, &mut buf);
    if state.failed() {
        return None;
    }
    Some(usize::from_ne_bytes(buf))
}

#[cfg(test)]
mod tests {
    use std::ffi::{c_int, CStr};
    use std::io::Cursor;

    use super::*;

    const Z: usize = size_of::<usize>();

    fn wire(parts: &[&[u8]]) -> Cursor<Vec<u8>> {
        Cursor::new(parts.concat())
    }

    #[test]
    fn ceiling_rejects_large_arrays() {
        let codec = Codec::with_alloc_limit(8);
        let mut src = wire(&[&3usize.to_ne_bytes(), &[0u8; 12]]);
        let mut n: c_int = -7;
        let mut out: Vec<i32> = vec![5];
        let res = codec.unpack(
            &mut src,
            "*ii",
            &mut [Slot::from(&mut n), Slot::from(&mut out)],
        );
        match res {
            Err(Error::Alloc {
                want: Some(12),
                limit: 8,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(n, -7);
        assert_eq!(out, [5]);
    }

    #[test]
    fn ceiling_admits_exact_fit() {
        let codec = Codec::with_alloc_limit(2 * size_of::<i32>());
        assert_eq!(codec.alloc_limit(), 8);

        let mut src = wire(&[&2usize.to_ne_bytes(), &[0u8; 8]]);
        let mut n: c_int = -7;
        let mut out: Vec<i32> = vec![5];
        let read = codec
            .unpack(
                &mut src,
                "*ii",
                &mut [Slot::from(&mut n), Slot::from(&mut out)],
            )
            .expect("unpack");
        assert_eq!(read, Z + 8);
        assert_eq!(n, 2);
        assert_eq!(out, [0, 0]);
    }

    #[test]
    fn default_ceiling_is_sixteen_mib() {
        assert_eq!(Codec::default().alloc_limit(), 16 << 20);
    }

    #[test]
    fn overflowing_count_is_an_alloc_error() {
        let mut src = wire(&[&usize::MAX.to_ne_bytes()]);
        let mut out: Vec<u64> = Vec::new();
        let res = Codec::default().unpack(
            &mut src,
            "=QQ",
            &mut [Slot::from(0u64), Slot::from(&mut out)],
        );
        assert!(matches!(res, Err(Error::Alloc { want: None, .. })));
    }

    #[test]
    fn zero_length_string_is_rejected() {
        let mut src = wire(&[&0usize.to_ne_bytes()]);
        let mut s = CString::new("keep").expect("cstring");
        let res = Codec::default().unpack(&mut src, "s", &mut [Slot::from(&mut s)]);
        assert!(matches!(res, Err(Error::InvalidData(_))));
        assert_eq!(s.as_c_str(), CStr::from_bytes_with_nul(b"keep\0").expect("cstr"));
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let mut src = wire(&[&3usize.to_ne_bytes(), b"abc"]);
        let mut s = CString::default();
        let res = Codec::default().unpack(&mut src, "s", &mut [Slot::from(&mut s)]);
        assert!(matches!(res, Err(Error::InvalidData(_))));
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut src = wire(&[&4usize.to_ne_bytes(), b"a\0b\0"]);
        let mut s = CString::new("keep").expect("cstring");
        let res = Codec::default().unpack(&mut src, "s", &mut [Slot::from(&mut s)]);
        assert!(matches!(res, Err(Error::InvalidData(_))));
        assert_eq!(s.as_bytes(), b"keep");
    }

    #[test]
    fn discovered_count_must_fit() {
        let mut src = wire(&[&300usize.to_ne_bytes(), &[0u8; 300]]);
        let mut n = 0u8;
        let mut out: Vec<u8> = Vec::new();
        let res = Codec::default().unpack(
            &mut src,
            "*CC",
            &mut [Slot::from(&mut n), Slot::from(&mut out)],
        );
        assert!(matches!(res, Err(Error::InvalidData(_))));
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn format_error_before_any_io() {
        let mut sink = Vec::new();
        let res = Codec::default().pack(&mut sink, "iX", &[Arg::from(1 as c_int)]);
        assert!(matches!(res, Err(Error::Format { pos: 1, .. })));
        assert!(sink.is_empty());
    }

    #[test]
    fn byte_total_counts_prefixes() {
        let mut sink = Vec::new();
        let s = CString::new("ab").expect("cstring");
        let buf = [1u16, 2];
        let n = Codec::default()
            .pack(
                &mut sink,
                "s*zH",
                &[Arg::from(&s), Arg::from(2usize), Arg::from(&buf)],
            )
            .expect("pack");
        assert_eq!(n, Z + 3 + Z + 4);
        assert_eq!(n, sink.len());
    }
}
