#![no_main]

use ath_csi::header::Header;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|header: Header| {
    assert_eq!(Header::from_bytes(&header.to_bytes()), header);
    let _ = header.bandwidth();
});
