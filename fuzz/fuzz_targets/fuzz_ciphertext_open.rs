#![no_main]
use libfuzzer_sys::fuzz_target;
use skyglow::core::{
    algebra::{passthrough::PassthroughAlgebra, CiphertextAlgebra},
    types::{Ciphertext, EncryptedBool},
};

fuzz_target!(|data: &[u8]| {
    let ct = Ciphertext(data.to_vec());
    let alg = PassthroughAlgebra::new([0u8; 32]);
    let valid = alg.validate(&ct).is_ok();
    // Anything that validates must open, and nothing else may.
    assert_eq!(valid, PassthroughAlgebra::open(&ct).is_ok());
    let _ = PassthroughAlgebra::open_bool(&EncryptedBool(ct.clone()));
    if valid {
        let _ = alg.add(&ct, &ct);
        let _ = alg.gt(&ct, &ct);
        let _ = alg.div_scalar(&ct, 3);
    }
});
