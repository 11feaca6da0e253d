use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use imgbase::{
    floatconv::{parse_number_f64, render_number_f64},
    pixel::{PixelBlend, PixelBuffer, PixelConfig, PixelFormat, PixelSubsampling, PixelSwizzler},
    uncompng::{UncompressedPngDecoder, UncompressedPngEncoder, SCRATCH_LEN_MIN},
    IoBuffer, ParseNumberOptions, RenderNumberOptions,
};
use std::hint::black_box;

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;

fn gradient(pixfmt: PixelFormat) -> Vec<u8> {
    let bpp = pixfmt.bytes_per_pixel() as usize;
    let mut pixels = vec![0; (WIDTH * HEIGHT) as usize * bpp];
    for (i, b) in pixels.iter_mut().enumerate() {
        *b = (i / bpp + i % bpp * 64) as u8;
    }
    pixels
}

fn swizzle(c: &mut Criterion) {
    let mut group = c.benchmark_group("swizzle");
    let pixel_count = (WIDTH * HEIGHT) as usize;
    group.throughput(Throughput::Elements(pixel_count as u64));

    let pairs = [
        ("copy", PixelFormat::BGRA_NONPREMUL, PixelFormat::BGRA_NONPREMUL),
        ("swap red blue", PixelFormat::RGBA_NONPREMUL, PixelFormat::BGRA_NONPREMUL),
        ("premultiply", PixelFormat::BGRA_PREMUL, PixelFormat::BGRA_NONPREMUL),
        ("16 bit BE to 8 bit", PixelFormat::BGRA_NONPREMUL, PixelFormat::RGBA_NONPREMUL_4X16BE),
        ("rgb to gray", PixelFormat::Y, PixelFormat::RGB),
    ];
    for (name, dst_fmt, src_fmt) in pairs {
        let src = gradient(src_fmt);
        for blend in [PixelBlend::Src, PixelBlend::SrcOver] {
            let swizzler = PixelSwizzler::prepare(dst_fmt, &mut [], src_fmt, &[], blend).unwrap();
            let mut dst = vec![0x80; pixel_count * dst_fmt.bytes_per_pixel() as usize];
            group.bench_with_input(BenchmarkId::new(name, format!("{blend:?}")), &src, |b, src| {
                b.iter(|| swizzler.swizzle(&mut dst, &[], src))
            });
        }
    }
}

fn floats(c: &mut Criterion) {
    let inputs: Vec<f64> = (1..=1000u32)
        .map(|i| f64::from(i).powi(7) / f64::from(i * 3 + 1).sqrt())
        .chain((1..=1000u64).map(|i| {
            f64::from_bits(0x3FF0_0000_0000_0000 ^ (i.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 12))
        }))
        .collect();
    let rendered: Vec<String> = inputs.iter().map(f64::to_string).collect();
    let long: Vec<String> = inputs.iter().map(|x| format!("{x:.40e}")).collect();

    let mut group = c.benchmark_group("floats");
    group.throughput(Throughput::Elements(inputs.len() as u64));

    group.bench_with_input(BenchmarkId::new("parse", "shortest"), &rendered, |b, texts| {
        b.iter(|| {
            for t in texts {
                black_box(parse_number_f64(t.as_bytes(), ParseNumberOptions::DEFAULT).ok());
            }
        })
    });
    group.bench_with_input(BenchmarkId::new("parse", "40 digits"), &long, |b, texts| {
        b.iter(|| {
            for t in texts {
                black_box(parse_number_f64(t.as_bytes(), ParseNumberOptions::DEFAULT).ok());
            }
        })
    });
    group.bench_with_input(BenchmarkId::new("std parse", "40 digits"), &long, |b, texts| {
        b.iter(|| {
            for t in texts {
                black_box(t.parse::<f64>().ok());
            }
        })
    });

    for (name, options, precision) in [
        ("just enough", RenderNumberOptions::JUST_ENOUGH_PRECISION, 0),
        ("%.6e", RenderNumberOptions::EXPONENT_PRESENT, 6),
        ("%.17g", RenderNumberOptions::DEFAULT, 17),
    ] {
        group.bench_with_input(BenchmarkId::new("render", name), &inputs, |b, xs| {
            let mut buf = [0; 512];
            b.iter(|| {
                for &x in xs {
                    black_box(render_number_f64(&mut buf, x, precision, options));
                }
            })
        });
    }
}

fn uncompng(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncompressed png");
    group.throughput(Throughput::Elements(u64::from(WIDTH * HEIGHT)));

    let pixels = gradient(PixelFormat::BGRA_NONPREMUL);
    let stride = WIDTH as usize * 4;
    let mut scratch = vec![0; SCRATCH_LEN_MIN];
    let mut encoded = Vec::new();
    UncompressedPngEncoder::new(&mut scratch)
        .unwrap()
        .encode(&mut encoded, &pixels, WIDTH, HEIGHT, stride, PixelFormat::BGRA_NONPREMUL)
        .unwrap();

    group.bench_with_input(BenchmarkId::new("encode", "bgra"), &pixels, |b, pixels| {
        let mut out = Vec::with_capacity(encoded.len());
        let mut enc = UncompressedPngEncoder::new(&mut scratch).unwrap();
        b.iter(|| {
            out.clear();
            enc.encode(&mut out, pixels, WIDTH, HEIGHT, stride, PixelFormat::BGRA_NONPREMUL)
                .unwrap()
        })
    });

    for (name, dst_fmt) in [
        ("bgra", PixelFormat::BGRA_NONPREMUL),
        ("rgba", PixelFormat::RGBA_NONPREMUL),
    ] {
        let pixcfg = PixelConfig::from_parts(dst_fmt, PixelSubsampling::NONE, WIDTH, HEIGHT);
        let mut out = vec![0; pixcfg.pixbuf_len() as usize];
        group.bench_with_input(BenchmarkId::new("decode", name), &encoded, |b, png| {
            b.iter(|| {
                let mut dst = PixelBuffer::from_slice(&pixcfg, &mut out).unwrap();
                let mut dec = UncompressedPngDecoder::new();
                let mut src = IoBuffer::reader(&png[..], true);
                dec.decode_frame(&mut dst, &mut src, PixelBlend::Src)
            })
        });
    }
}

criterion_group!(benches, swizzle, floats, uncompng);
criterion_main!(benches);
