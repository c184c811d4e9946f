#![no_main]
use libfuzzer_sys::fuzz_target;
use skyglow::core::{
    ledger::{observation::ObservationRecord, region::RegionEntry},
    oracle::bridge::PendingRevealRequest,
    types::{decode_canonical_limited, MAX_RECORD_BYTES},
};

fuzz_target!(|data: &[u8]| {
    let _ = decode_canonical_limited::<ObservationRecord>(data, MAX_RECORD_BYTES);
    let _ = decode_canonical_limited::<RegionEntry>(data, MAX_RECORD_BYTES);
    let _ = decode_canonical_limited::<PendingRevealRequest>(data, MAX_RECORD_BYTES);
});
