#![no_main]

use encryption::{Algorithm, KeyManager, SessionSecret, SESSION_SECRET_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < SESSION_SECRET_SIZE + 1 {
        return;
    }

    let secret = match SessionSecret::from_bytes(&data[..SESSION_SECRET_SIZE]) {
        Ok(secret) => secret,
        Err(_) => return,
    };
    let algorithm = Algorithm::ALL[data[SESSION_SECRET_SIZE] as usize % Algorithm::ALL.len()];
    let payload = &data[SESSION_SECRET_SIZE + 1..];

    let key = KeyManager::new()
        .derive_file_key(&secret, "fuzz", algorithm)
        .expect("non-empty identifier always derives");
    let encrypted = algorithm
        .encryptor()
        .encrypt(payload, key.as_bytes())
        .expect("derived key has the right length");
    let decrypted = algorithm
        .encryptor()
        .decrypt(encrypted.ciphertext(), key.as_bytes(), encrypted.iv())
        .expect("fresh ciphertext decrypts");
    assert_eq!(payload, decrypted.plaintext());
});
