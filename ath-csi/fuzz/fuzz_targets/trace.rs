#![no_main]

use ath_csi::{params::DecodeParams, trace::Records};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let params = DecodeParams {
        keep_metadata_only: true,
        tail_guard: 0,
    };

    for record in Records::new(data, &params).flatten() {
        if record.header.has_csi() {
            assert_eq!(record.csi.dim(), record.header.dim());
        } else {
            assert!(record.csi.is_empty());
        }
    }
});
