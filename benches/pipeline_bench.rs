//! Benchmarks for the hair removal stages
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dehair::enhance::{process_channel, ChannelParams};
use dehair::{inpaint, HairRemovalConfig, HairRemover, InpaintMode};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Skin-toned image crossed by a few dark strands
fn generate_hairy_image(size: u32) -> RgbImage {
    let mut image = RgbImage::from_fn(size, size, |x, y| {
        let shade = ((x + y) * 24 / (2 * size)) as u8;
        Rgb([212 - shade, 166 - shade, 148 - shade])
    });
    for i in 0..size {
        for w in 0..3 {
            image.put_pixel(i, (size / 3 + w).min(size - 1), Rgb([35, 25, 20]));
            image.put_pixel((i / 2 + size / 4 + w).min(size - 1), i, Rgb([35, 25, 20]));
        }
    }
    image
}

fn strand_mask(size: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        let on = (size / 3..size / 3 + 3).contains(&y) || (x >= y / 2 + size / 4 && x < y / 2 + size / 4 + 3);
        Luma([if on { 255 } else { 0 }])
    })
}

/// Benchmark single-channel enhancement
fn bench_process_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("enhance");
    let params = ChannelParams::default();

    for size in [256u32, 720].iter() {
        let channel = GrayImage::from_fn(*size, *size, |x, y| {
            Luma([if y == size / 2 { 40 } else { 200 + ((x + y) % 16) as u8 }])
        });
        group.throughput(Throughput::Elements((*size as u64) * (*size as u64)));
        group.bench_with_input(
            BenchmarkId::new("process_channel", format!("{}x{}", size, size)),
            &channel,
            |b, channel| b.iter(|| process_channel(black_box(channel), black_box(&params))),
        );
    }

    group.finish();
}

/// Benchmark both inpainting modes
fn bench_inpaint(c: &mut Criterion) {
    let mut group = c.benchmark_group("inpaint");
    let image = generate_hairy_image(256);
    let mask = strand_mask(256);

    for mode in [InpaintMode::Fast, InpaintMode::Careful] {
        group.bench_with_input(
            BenchmarkId::new("inpaint", format!("{:?}", mode)),
            &mode,
            |b, &mode| b.iter(|| inpaint(black_box(&image), black_box(&mask), mode, 3.0)),
        );
    }

    group.finish();
}

/// Benchmark the full pipeline at the default working size
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    let image = generate_hairy_image(720);

    for (name, config) in [
        ("careful", HairRemovalConfig::default()),
        ("fast", HairRemovalConfig::fast()),
    ] {
        let remover = HairRemover::new(config);
        group.bench_function(name, |b| {
            b.iter(|| remover.remove_hairs(black_box(&image), None))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process_channel, bench_inpaint, bench_pipeline);
criterion_main!(benches);
