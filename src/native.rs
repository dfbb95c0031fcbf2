//! Native in-memory representation of scalars and element buffers.
//!
//! Every value is transferred with the host's width and byte order; nothing
//! here normalizes endianness, so a stream is only readable on a host with
//! the same layout as the writer.

use std::mem::size_of;

use byteorder::{ByteOrder, NativeEndian};
use paste::paste;

use crate::types::Kind;
use crate::{Error, Result};

/// Widest scalar any type code maps to.
pub const MAX_WIDTH: usize = size_of::<u64>();

pub trait Native: Copy + Default + 'static {
    const KIND: Kind;
    const WIDTH: usize = size_of::<Self>();

    /// Encodes `src` into `dst`, which must be exactly `src.len() * WIDTH` bytes.
    fn encode_into(src: &[Self], dst: &mut [u8]);

    /// Decodes `src`, exactly `dst.len() * WIDTH` bytes, into `dst`.
    fn decode_from(src: &[u8], dst: &mut [Self]);
}

macro_rules! impl_native_byte {
    ($($t:ty => $kind:ident,)+) => {
        $(
        impl Native for $t {
            const KIND: Kind = Kind::$kind;

            fn encode_into(src: &[Self], dst: &mut [u8]) {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = *s as u8;
                }
            }

            fn decode_from(src: &[u8], dst: &mut [Self]) {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = *s as $t;
                }
            }
        }
         )+
    };
}

macro_rules! impl_native_num {
    ($($t:ident => $kind:ident,)+) => {
        $(
        impl Native for $t {
            const KIND: Kind = Kind::$kind;

            #[inline]
            fn encode_into(src: &[Self], dst: &mut [u8]) {
                paste!(NativeEndian::[<write_ $t _into>](src, dst))
            }

            #[inline]
            fn decode_from(src: &[u8], dst: &mut [Self]) {
                paste!(NativeEndian::[<read_ $t _into>](src, dst))
            }
        }
         )+
    };
}

macro_rules! impl_native_word {
    ($($t:ty => $kind:ident,)+) => {
        $(
        impl Native for $t {
            const KIND: Kind = Kind::$kind;

            fn encode_into(src: &[Self], dst: &mut [u8]) {
                for (d, s) in dst.chunks_exact_mut(Self::WIDTH).zip(src) {
                    d.copy_from_slice(&s.to_ne_bytes());
                }
            }

            fn decode_from(src: &[u8], dst: &mut [Self]) {
                for (d, s) in dst.iter_mut().zip(src.chunks_exact(Self::WIDTH)) {
                    let mut word = [0u8; size_of::<$t>()];
                    word.copy_from_slice(s);
                    *d = <$t>::from_ne_bytes(word);
                }
            }
        }
         )+
    };
}

impl_native_byte!(i8 => Signed, u8 => Unsigned,);
impl_native_num!(
    i16 => Signed,
    u16 => Unsigned,
    i32 => Signed,
    u32 => Unsigned,
    i64 => Signed,
    u64 => Unsigned,
    f32 => Float,
    f64 => Float,
);
impl_native_word!(isize => Signed, usize => Unsigned,);

fn encode_vec<T: Native>(src: &[T]) -> Vec<u8> {
    let mut buf = vec![0u8; src.len() * T::WIDTH];
    T::encode_into(src, &mut buf);
    buf
}

fn decode_one<T: Native>(src: &[u8]) -> T {
    let mut v = [T::default()];
    T::decode_from(src, &mut v);
    v[0]
}

fn decode_vec<T: Native>(src: &[u8]) -> Result<Vec<T>> {
    let n = src.len() / T::WIDTH;
    let mut out = Vec::new();
    out.try_reserve_exact(n).map_err(|_| Error::Alloc {
        want: Some(src.len()),
        limit: src.len(),
    })?;
    out.resize(n, T::default());
    T::decode_from(src, &mut out);
    Ok(out)
}

macro_rules! impl_native_enums {
    (ints { $($iv:ident($it:ty),)+ } floats { $($fv:ident($ft:ty),)+ }) => {
        /// A scalar value, bound by value or read through a pointer slot.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Scalar {
            $($iv($it),)+
            $($fv($ft),)+
        }

        impl Scalar {
            pub fn kind(&self) -> Kind {
                match self {
                    $(Scalar::$iv(_) => <$it>::KIND,)+
                    $(Scalar::$fv(_) => <$ft>::KIND,)+
                }
            }

            pub fn width(&self) -> usize {
                match self {
                    $(Scalar::$iv(_) => <$it>::WIDTH,)+
                    $(Scalar::$fv(_) => <$ft>::WIDTH,)+
                }
            }

            /// Encodes the value into the front of `buf` and returns the used part.
            pub fn encode<'b>(&self, buf: &'b mut [u8; MAX_WIDTH]) -> &'b [u8] {
                let width = self.width();
                match self {
                    $(Scalar::$iv(v) => <$it>::encode_into(&[*v], &mut buf[..width]),)+
                    $(Scalar::$fv(v) => <$ft>::encode_into(&[*v], &mut buf[..width]),)+
                }
                &buf[..width]
            }

            /// Interprets an integer scalar as an element count.
            ///
            /// Returns `None` for floats and negative values.
            pub fn as_count(&self) -> Option<usize> {
                match self {
                    $(Scalar::$iv(v) => usize::try_from(*v).ok(),)+
                    $(Scalar::$fv(_) => None,)+
                }
            }
        }

        $(
        impl From<$it> for Scalar {
            fn from(v: $it) -> Self {
                Scalar::$iv(v)
            }
        }
         )+

        $(
        impl From<$ft> for Scalar {
            fn from(v: $ft) -> Self {
                Scalar::$fv(v)
            }
        }
         )+

        /// Caller-owned scalar storage written on unpack.
        #[derive(Debug)]
        pub enum ScalarMut<'a> {
            $($iv(&'a mut $it),)+
            $($fv(&'a mut $ft),)+
        }

        impl<'a> ScalarMut<'a> {
            pub fn kind(&self) -> Kind {
                match self {
                    $(ScalarMut::$iv(_) => <$it>::KIND,)+
                    $(ScalarMut::$fv(_) => <$ft>::KIND,)+
                }
            }

            pub fn width(&self) -> usize {
                match self {
                    $(ScalarMut::$iv(_) => <$it>::WIDTH,)+
                    $(ScalarMut::$fv(_) => <$ft>::WIDTH,)+
                }
            }

            /// Overwrites the slot with `src`, exactly `width()` native bytes.
            pub fn set_ne_bytes(&mut self, src: &[u8]) {
                match self {
                    $(ScalarMut::$iv(p) => **p = decode_one::<$it>(src),)+
                    $(ScalarMut::$fv(p) => **p = decode_one::<$ft>(src),)+
                }
            }

            /// Checks that `n` is representable in the slot.
            pub fn fits_count(&self, n: usize) -> bool {
                match self {
                    $(ScalarMut::$iv(_) => <$it>::try_from(n).is_ok(),)+
                    $(ScalarMut::$fv(_) => false,)+
                }
            }

            /// Stores a discovered count. Callers check `fits_count` first.
            pub fn set_count(&mut self, n: usize) {
                match self {
                    $(ScalarMut::$iv(p) => **p = n as $it,)+
                    $(ScalarMut::$fv(_) => {},)+
                }
            }
        }

        $(
        impl<'a> From<&'a mut $it> for ScalarMut<'a> {
            fn from(p: &'a mut $it) -> Self {
                ScalarMut::$iv(p)
            }
        }
         )+

        $(
        impl<'a> From<&'a mut $ft> for ScalarMut<'a> {
            fn from(p: &'a mut $ft) -> Self {
                ScalarMut::$fv(p)
            }
        }
         )+

        /// Borrowed element buffer written on pack.
        #[derive(Debug, Clone, Copy)]
        pub enum Elems<'a> {
            $($iv(&'a [$it]),)+
        }

        impl<'a> Elems<'a> {
            pub fn kind(&self) -> Kind {
                match self {
                    $(Elems::$iv(_) => <$it>::KIND,)+
                }
            }

            pub fn width(&self) -> usize {
                match self {
                    $(Elems::$iv(_) => <$it>::WIDTH,)+
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Elems::$iv(s) => s.len(),)+
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Native bytes of the first `count` elements.
            pub fn to_ne_bytes(&self, count: usize) -> Vec<u8> {
                match self {
                    $(Elems::$iv(s) => encode_vec(&s[..count]),)+
                }
            }
        }

        $(
        impl<'a> From<&'a [$it]> for Elems<'a> {
            fn from(s: &'a [$it]) -> Self {
                Elems::$iv(s)
            }
        }

        impl<'a> From<&'a Vec<$it>> for Elems<'a> {
            fn from(s: &'a Vec<$it>) -> Self {
                Elems::$iv(s.as_slice())
            }
        }

        impl<'a, const N: usize> From<&'a [$it; N]> for Elems<'a> {
            fn from(s: &'a [$it; N]) -> Self {
                Elems::$iv(&s[..])
            }
        }
         )+

        /// Caller-owned buffer slot a fresh allocation is installed into on unpack.
        #[derive(Debug)]
        pub enum ElemsMut<'a> {
            $($iv(&'a mut Vec<$it>),)+
        }

        impl<'a> ElemsMut<'a> {
            pub fn kind(&self) -> Kind {
                match self {
                    $(ElemsMut::$iv(_) => <$it>::KIND,)+
                }
            }

            pub fn width(&self) -> usize {
                match self {
                    $(ElemsMut::$iv(_) => <$it>::WIDTH,)+
                }
            }

            /// Replaces the caller's buffer with the elements decoded from `src`.
            pub fn install(&mut self, src: &[u8]) -> Result<()> {
                match self {
                    $(ElemsMut::$iv(v) => **v = decode_vec::<$it>(src)?,)+
                }
                Ok(())
            }

            /// Replaces the caller's buffer with an empty one, without allocating.
            pub fn clear(&mut self) {
                match self {
                    $(ElemsMut::$iv(v) => **v = Vec::new(),)+
                }
            }
        }

        $(
        impl<'a> From<&'a mut Vec<$it>> for ElemsMut<'a> {
            fn from(v: &'a mut Vec<$it>) -> Self {
                ElemsMut::$iv(v)
            }
        }
         )+
    };
}

impl_native_enums!(
    ints {
        I8(i8),
        U8(u8),
        I16(i16),
        U16(u16),
        I32(i32),
        U32(u32),
        I64(i64),
        U64(u64),
        Isize(isize),
        Usize(usize),
    }
    floats {
        F32(f32),
        F64(f64),
    }
);
