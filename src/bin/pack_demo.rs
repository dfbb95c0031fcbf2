use std::{
    env,
    ffi::{c_int, CString},
    fs::{self, File},
    path::PathBuf,
};

use fmtpack::{pack, unpack, Codec, Slot};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const RECORD: &str = "is*iH=zQ";

pub fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("fmtpack-demo.bin"));
    info!("record file: {}", path.display());

    let id: c_int = 7;
    let name = CString::new("sensor-a").expect("construct name");
    let readings: Vec<u16> = vec![512, 498, 530, 507];
    let totals = [2047u64, 0, u64::MAX];

    // pack
    {
        let mut file = File::create(&path).expect("create record file");
        let written = pack!(
            &mut file,
            RECORD,
            id,
            &name,
            readings.len() as c_int,
            &readings,
            totals.len(),
            &totals,
        );
        match written {
            Ok(n) => info!(bytes = n, "record packed"),
            Err(e) => {
                error!("pack record: {}", e);
                return;
            }
        }
    }

    // unpack
    {
        let mut file = File::open(&path).expect("open record file");
        let mut id2: c_int = 0;
        let mut name2 = CString::default();
        let mut count: c_int = 0;
        let mut readings2: Vec<u16> = Vec::new();

        let read = Codec::default().unpack(
            &mut file,
            "is*iH",
            &mut [
                Slot::from(&mut id2),
                Slot::from(&mut name2),
                Slot::from(&mut count),
                Slot::from(&mut readings2),
            ],
        );
        match read {
            Ok(n) => info!(bytes = n, "record head unpacked"),
            Err(e) => error!("unpack record: {}", e),
        }

        info!("id: {}, name: {:?}", id2, name2);
        info!("readings ({}): {:?}", count, readings2);
    }

    // a reader that disagrees with the writer's layout
    {
        let mut file = File::open(&path).expect("open record file");
        let mut bogus: Vec<u64> = Vec::new();
        let res = unpack!(&mut file, "*QQ", &mut 0u64, &mut bogus);
        let status = fmtpack::status(&res);
        info!(status, "mismatched layout: {:?}", res.as_ref().err());
    }

    let _ = fs::remove_file(&path);
    info!("all things done");
}
