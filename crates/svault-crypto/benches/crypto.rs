use secrecy::SecretString;
use svault_crypto::{decrypt, encrypt_with, KdfParams};

fn make_secret(size: usize) -> String {
    (0..size)
        .map(|i| char::from(b'a' + (i.wrapping_mul(7) % 26) as u8))
        .collect()
}

// Costs well below production so the AEAD and encoding show up at all
fn bench_params() -> KdfParams {
    KdfParams::argon2id(1024, 1, 1)
}

#[divan::bench(args = [32, 256, 4096])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let password = SecretString::from("bench-password");
    let secret = make_secret(size);
    let params = bench_params();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            encrypt_with(
                divan::black_box(&secret),
                divan::black_box(&password),
                &params,
            )
            .unwrap()
        });
}

#[divan::bench(args = [32, 256, 4096])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let password = SecretString::from("bench-password");
    let blob = encrypt_with(&make_secret(size), &password, &bench_params()).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decrypt(divan::black_box(&blob), divan::black_box(&password)).unwrap());
}

#[divan::bench(sample_count = 5)]
fn bench_default_kdf_cost(bencher: divan::Bencher) {
    let password = SecretString::from("bench-password");
    bencher.bench(|| {
        svault_crypto::derive_key(
            divan::black_box(&password),
            &[9u8; 16],
            &KdfParams::default(),
        )
        .unwrap()
    });
}

fn main() {
    divan::main();
}
