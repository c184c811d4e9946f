#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use skyglow::core::{
    access::ContributorPolicy,
    algebra::passthrough::{PassthroughAlgebra, RevealDispatch},
    events::NoopEvents,
    oracle::{keys::OracleKey, service::answer},
    runtime::executor::{CallContext, LedgerExecutor},
    state::ledger_store::LedgerStore,
    types::{CipherFields, Ciphertext, ContributorId, ObservationId, RegionCode, RequestId},
};

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Submit {
        who: u8,
        region: String,
        brightness: u64,
        raw_latitude: Option<Vec<u8>>,
    },
    Request {
        who: u8,
        id: u8,
    },
    Fulfill {
        pick: u8,
        tamper: bool,
    },
    Replay {
        request: [u8; 16],
    },
    Expire {
        advance_ms: u16,
    },
}

fuzz_target!(|ops: Vec<Op>| {
    let Ok(oracle) = OracleKey::generate() else {
        return;
    };
    let mut exec = LedgerExecutor::new(
        PassthroughAlgebra::new(oracle.public_key()),
        ContributorPolicy::new(),
        NoopEvents,
    )
    .with_reveal_ttl(1_000);
    let mut now = 0u64;
    let mut accepted = 0u64;

    for op in ops.into_iter().take(64) {
        match op {
            Op::Submit {
                who,
                region,
                brightness,
                raw_latitude,
            } => {
                let fields = CipherFields {
                    brightness: PassthroughAlgebra::encrypt(brightness),
                    latitude: raw_latitude
                        .map(Ciphertext)
                        .unwrap_or_else(|| PassthroughAlgebra::encrypt(1)),
                    longitude: PassthroughAlgebra::encrypt(2),
                    timestamp: PassthroughAlgebra::encrypt(now),
                };
                let ctx = CallContext::new(ContributorId([who; 32]), now);
                if exec.submit(&ctx, fields, RegionCode::new(region)).is_ok() {
                    accepted += 1;
                }
            }
            Op::Request { who, id } => {
                let ctx = CallContext::new(ContributorId([who; 32]), now);
                let _ = exec.request_reveal(&ctx, ObservationId(u64::from(id)));
            }
            Op::Fulfill { pick, tamper } => {
                let pending: Vec<_> = exec.bridge().pending().cloned().collect();
                if pending.is_empty() {
                    continue;
                }
                let p = &pending[usize::from(pick) % pending.len()];
                let Ok(mut f) = answer(
                    &oracle,
                    &RevealDispatch {
                        request_id: p.request_id,
                        ciphertexts: p.ciphertexts.clone(),
                    },
                ) else {
                    continue;
                };
                if tamper {
                    f.values.brightness = f.values.brightness.wrapping_add(1);
                }
                let res = exec.fulfill(&f.request_id, f.values, &f.proof);
                assert_eq!(res.is_ok(), !tamper);
            }
            Op::Replay { request } => {
                let known = exec
                    .bridge()
                    .pending()
                    .any(|p| p.request_id == RequestId(request));
                if !known {
                    let before = exec.ledger().clone();
                    let values = Default::default();
                    let proof = oracle.sign(&request);
                    assert!(exec.fulfill(&RequestId(request), values, &proof).is_err());
                    assert_eq!(exec.ledger(), &before);
                }
            }
            Op::Expire { advance_ms } => {
                now += u64::from(advance_ms);
                let _ = exec.expire_pending(now);
            }
        }

        assert_eq!(exec.observation_count(), accepted);
        assert!(exec.bridge().pending_count() as u64 <= accepted);
    }

    // Everything accepted must fit the store's record cap, or a restart
    // would fail to load it.
    for rec in exec.ledger().records() {
        assert!(LedgerStore::put_observation(rec).is_ok());
    }
    for code in exec.registered_regions() {
        if let Some(entry) = exec.regions().get(code) {
            assert!(LedgerStore::put_region(entry).is_ok());
        }
    }
});
