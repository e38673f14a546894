use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use scalelink_core::parser::extract_reading;

// Frames as a scale emits them, with a noise frame every few lines.
fn synth_frames(n: usize, seed: u32) -> Vec<Vec<u8>> {
    let mut state = seed.max(1);
    let mut next_u32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    (0..n)
        .map(|i| {
            if i % 7 == 6 {
                b"\x02\x03\xffST,GS,".to_vec()
            } else {
                let cg = next_u32() % 1_000_000;
                format!("ST,GS,+{:04}.{:03}kg\r\n", cg / 1000, cg % 1000).into_bytes()
            }
        })
        .collect()
}

pub fn bench_extract(c: &mut Criterion) {
    let mut g = c.benchmark_group("frame_parser");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p scalelink_core --bench parser
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let frames = synth_frames(10_000, 0xC0FFEE);
    g.bench_function("extract_reading_10k", |b| {
        b.iter_batched(
            || frames.clone(),
            |fs| {
                let hits = fs
                    .iter()
                    .filter(|f| extract_reading(black_box(f)).is_some())
                    .count();
                black_box(hits);
            },
            BatchSize::SmallInput,
        )
    });

    // Worst case: a full 64-byte buffer of line noise with no token.
    let noise = vec![b'x'; 64];
    g.bench_function("no_token_64b", |b| {
        b.iter(|| black_box(extract_reading(black_box(&noise))))
    });
    g.finish();
}

criterion_group!(parser, bench_extract);
criterion_main!(parser);
