use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use type1_fonts::{
    assemble,
    charstring::{encode_int, Decoder},
    cipher::{self, CHARSTRING_SEED, EEXEC_SEED},
    disassemble, Format, Options,
};
use type1_test_data::type1::{SAMPLE_PFB, SAMPLE_TXT};

fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen()).collect()
}

pub fn cipher_benchmark(c: &mut Criterion) {
    for len in [1024, 65_536] {
        let data = random_bytes(len);
        c.bench_with_input(BenchmarkId::new("eexec_decrypt", len), &data, |b, data| {
            b.iter(|| {
                cipher::decrypt(black_box(data).iter().copied(), EEXEC_SEED).fold(0u8, |a, b| a ^ b)
            })
        });
    }
}

pub fn charstring_benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let values = (0..10_000)
        .map(|_| match rng.gen_range(0..3) {
            0 => rng.gen_range(-107..=107),
            1 => rng.gen_range(108..=1131),
            _ => rng.gen(),
        })
        .collect::<Vec<i32>>();
    c.bench_function("encode_ints", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(values.len() * 5);
            for value in black_box(&values) {
                encode_int(*value, &mut out);
            }
            out
        })
    });
    let mut plain = vec![0u8; 4];
    for value in &values {
        encode_int(*value, &mut plain);
    }
    let encrypted = cipher::encrypt(plain.into_iter(), CHARSTRING_SEED).collect::<Vec<_>>();
    c.bench_function("decode_charstring", |b| {
        b.iter(|| {
            Decoder::new(
                black_box(&encrypted).iter().copied(),
                encrypted.len() as i64,
                4,
            )
            .count()
        })
    });
}

pub fn font_benchmark(c: &mut Criterion) {
    let options = Options {
        format: Format::Pfb,
        ..Default::default()
    };
    c.bench_function("assemble_sample", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            assemble(black_box(SAMPLE_TXT.as_bytes()), &mut out, &options).unwrap();
            out
        })
    });
    c.bench_function("disassemble_sample", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            disassemble(black_box(SAMPLE_PFB), &mut out, &options).unwrap();
            out
        })
    });
}

criterion_group!(
    benches,
    cipher_benchmark,
    charstring_benchmark,
    font_benchmark
);
criterion_main!(benches);
