use std::ffi::{c_int, c_long, CString};
use std::io::Cursor;
use std::mem::size_of;

use fmtpack::{pack, unpack, Arg, Format, Slot};
use proptest::prelude::*;

const Z: usize = size_of::<usize>();

fn cstring() -> impl Strategy<Value = CString> {
    proptest::collection::vec(1u8..=255, 0..64)
        .prop_map(|bytes| CString::new(bytes).expect("no interior NUL"))
}

proptest! {
    #[test]
    fn scalars_round_trip(
        i in any::<c_int>(),
        l in any::<c_long>(),
        z in any::<usize>(),
        h in any::<i16>(),
        f in any::<f32>().prop_filter("finite", |f| f.is_finite()),
        d in any::<f64>(),
    ) {
        let mut wire = Vec::new();
        let written = pack!(&mut wire, "ilzhfd", i, l, z, h, f, d).expect("pack");
        prop_assert_eq!(written, wire.len());

        let (mut i2, mut l2, mut z2, mut h2, mut f2, mut d2) =
            (0 as c_int, 0 as c_long, 0usize, 0i16, 0f32, 0f64);
        let read = unpack!(
            &mut Cursor::new(wire),
            "ilzhfd",
            &mut i2, &mut l2, &mut z2, &mut h2, &mut f2, &mut d2,
        ).expect("unpack");

        prop_assert_eq!(read, written);
        prop_assert_eq!(i2, i);
        prop_assert_eq!(l2, l);
        prop_assert_eq!(z2, z);
        prop_assert_eq!(h2, h);
        prop_assert_eq!(f2.to_bits(), f.to_bits());
        prop_assert_eq!(d2.to_bits(), d.to_bits());
    }

    #[test]
    fn strings_and_arrays_round_trip(
        s in cstring(),
        xs in proptest::collection::vec(any::<u32>(), 0..128),
        ys in proptest::collection::vec(any::<i64>(), 0..32),
    ) {
        let format = Format::parse("s*iI=Zq").expect("format");
        let mut wire = Vec::new();
        let written = fmtpack::Codec::default()
            .pack_format(
                &mut wire,
                &format,
                &[
                    Arg::from(&s),
                    Arg::from(xs.len() as c_int),
                    Arg::from(&xs),
                    Arg::from(ys.len() as isize),
                    Arg::from(&ys),
                ],
            )
            .expect("pack");

        // prefixes plus payloads
        let want = Z + s.as_bytes_with_nul().len() + Z + xs.len() * 4 + Z + ys.len() * 8;
        prop_assert_eq!(written, want);

        let mut s2 = CString::default();
        let mut n: c_int = -1;
        let mut xs2: Vec<u32> = Vec::new();
        let mut ys2: Vec<i64> = Vec::new();
        let read = fmtpack::Codec::default()
            .unpack_format(
                &mut Cursor::new(wire),
                &format,
                &mut [
                    Slot::from(&mut s2),
                    Slot::from(&mut n),
                    Slot::from(&mut xs2),
                    Slot::from(0isize),
                    Slot::from(&mut ys2),
                ],
            )
            .expect("unpack");

        prop_assert_eq!(read, written);
        prop_assert_eq!(s2, s);
        prop_assert_eq!(n as usize, xs.len());
        prop_assert_eq!(xs2, xs);
        prop_assert_eq!(ys2, ys);
    }

    #[test]
    fn truncated_streams_never_succeed(cut in 1usize..(Z + 6)) {
        let s = CString::new("hello").expect("cstring");
        let mut wire = Vec::new();
        pack!(&mut wire, "s", &s).expect("pack");
        wire.truncate(wire.len() - cut);

        let mut out = CString::default();
        let res = unpack!(&mut Cursor::new(wire), "s", &mut out);
        prop_assert!(res.is_err());
        prop_assert_eq!(fmtpack::status(&res), -1);
        prop_assert!(out.as_bytes().is_empty());
    }
}
