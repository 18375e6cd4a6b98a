#![no_main]

use encryption::{split_blob, Algorithm, EncryptionError};
use libfuzzer_sys::fuzz_target;

// Stored blobs are untrusted: any byte string must decrypt or fail cleanly.
fuzz_target!(|data: &[u8]| {
    let Some((&selector, blob)) = data.split_first() else {
        return;
    };
    let algorithm = Algorithm::ALL[selector as usize % Algorithm::ALL.len()];
    let key = vec![selector; algorithm.key_size()];

    let (iv, ciphertext) = match split_blob(algorithm, blob) {
        Ok(parts) => parts,
        Err(err) => {
            assert!(matches!(err, EncryptionError::DecryptionFailed));
            return;
        }
    };
    if let Err(err) = algorithm.encryptor().decrypt(ciphertext, &key, iv) {
        assert!(matches!(err, EncryptionError::DecryptionFailed));
    }
});
