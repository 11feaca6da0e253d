use imgbase::{
    pixel::{PixelBlend, PixelFormat, PixelSwizzler, PALETTE_LEN},
    IoBuffer,
};
use proptest::prelude::*;

const DIRECT: [PixelFormat; 15] = [
    PixelFormat::A,
    PixelFormat::Y,
    PixelFormat::Y_16LE,
    PixelFormat::Y_16BE,
    PixelFormat::YA_NONPREMUL,
    PixelFormat::BGR_565,
    PixelFormat::BGR,
    PixelFormat::BGRX,
    PixelFormat::BGRA_NONPREMUL,
    PixelFormat::BGRA_NONPREMUL_4X16LE,
    PixelFormat::BGRA_PREMUL,
    PixelFormat::BGRA_PREMUL_4X16LE,
    PixelFormat::RGB,
    PixelFormat::RGBA_NONPREMUL,
    PixelFormat::RGBA_NONPREMUL_4X16BE,
];

fn direct_format() -> impl Strategy<Value = PixelFormat> {
    proptest::sample::select(&DIRECT[..])
}

fn blend() -> impl Strategy<Value = PixelBlend> {
    prop_oneof![Just(PixelBlend::Src), Just(PixelBlend::SrcOver)]
}

proptest! {
    #[test]
    fn converts_as_many_whole_pixels_as_both_sides_hold(
        dst_fmt in direct_format(),
        src_fmt in direct_format(),
        blend in blend(),
        dst_len in 0usize..200,
        src in proptest::collection::vec(any::<u8>(), 0..200),
    ) {
        let swizzler = PixelSwizzler::prepare(dst_fmt, &mut [], src_fmt, &[], blend).unwrap();
        let dst_bpp = dst_fmt.bytes_per_pixel() as usize;
        let src_bpp = src_fmt.bytes_per_pixel() as usize;
        prop_assert_eq!(swizzler.dst_bytes_per_pixel(), dst_bpp);
        prop_assert_eq!(swizzler.src_bytes_per_pixel(), src_bpp);

        let mut dst = vec![0xA5; dst_len];
        let n = swizzler.swizzle(&mut dst, &[], &src) as usize;
        prop_assert_eq!(n, (dst_len / dst_bpp).min(src.len() / src_bpp));
        prop_assert!(dst[n * dst_bpp..].iter().all(|&b| b == 0xA5));
    }

    #[test]
    fn reader_consumes_only_converted_pixels(
        dst_fmt in direct_format(),
        src_fmt in direct_format(),
        dst_len in 0usize..64,
        src in proptest::collection::vec(any::<u8>(), 0..64),
        up_to in 0u64..32,
    ) {
        let swizzler =
            PixelSwizzler::prepare(dst_fmt, &mut [], src_fmt, &[], PixelBlend::Src).unwrap();
        let mut reader = IoBuffer::reader(&src[..], false);
        let mut dst = vec![0; dst_len];

        let n = swizzler.limited_swizzle_from_reader(up_to, &mut dst, &[], &mut reader);
        prop_assert!(n <= up_to);
        prop_assert_eq!(reader.reader_position(), n * src_fmt.bytes_per_pixel() as u64);
    }

    #[test]
    fn sixteen_bit_detour_is_lossless(
        src in proptest::collection::vec(any::<u8>(), 0..128),
        wide in prop_oneof![
            Just(PixelFormat::BGRA_NONPREMUL_4X16LE),
            Just(PixelFormat::RGBA_NONPREMUL_4X16BE),
        ],
    ) {
        let there = PixelSwizzler::prepare(
            wide, &mut [], PixelFormat::BGRA_NONPREMUL, &[], PixelBlend::Src,
        ).unwrap();
        let back = PixelSwizzler::prepare(
            PixelFormat::BGRA_NONPREMUL, &mut [], wide, &[], PixelBlend::Src,
        ).unwrap();

        let pixels = src.len() / 4;
        let mut mid = vec![0; pixels * 8];
        let mut out = vec![0; pixels * 4];
        prop_assert_eq!(there.swizzle(&mut mid, &[], &src), pixels as u64);
        prop_assert_eq!(back.swizzle(&mut out, &[], &mid), pixels as u64);
        prop_assert_eq!(&out[..], &src[..pixels * 4]);
    }

    #[test]
    fn src_over_an_opaque_source_overwrites(
        dst_fmt in direct_format(),
        src in proptest::collection::vec(any::<u8>(), 0..96),
    ) {
        let over = PixelSwizzler::prepare(
            dst_fmt, &mut [], PixelFormat::BGRX, &[], PixelBlend::SrcOver,
        ).unwrap();
        let plain = PixelSwizzler::prepare(
            dst_fmt, &mut [], PixelFormat::BGRX, &[], PixelBlend::Src,
        ).unwrap();
        prop_assert_eq!(over.blend(), PixelBlend::Src);

        let len = src.len() / 4 * dst_fmt.bytes_per_pixel() as usize;
        let mut a = vec![0x33; len];
        let mut b = vec![0xCC; len];
        over.swizzle(&mut a, &[], &src);
        plain.swizzle(&mut b, &[], &src);
        prop_assert_eq!(a, b);
    }
}

#[test]
fn premultiplied_16_bit_detour_is_lossless() {
    let there = PixelSwizzler::prepare(
        PixelFormat::BGRA_PREMUL_4X16LE,
        &mut [],
        PixelFormat::BGRA_NONPREMUL,
        &[],
        PixelBlend::Src,
    )
    .unwrap();
    let back = PixelSwizzler::prepare(
        PixelFormat::BGRA_NONPREMUL,
        &mut [],
        PixelFormat::BGRA_PREMUL_4X16LE,
        &[],
        PixelBlend::Src,
    )
    .unwrap();

    // Every color and alpha, one row per alpha. Fully transparent colors are not recoverable.
    for a in 1..=255u8 {
        let src: Vec<u8> = (0..=255u8)
            .flat_map(|c| [c, 255 - c, c ^ 0x5A, a])
            .collect();
        let mut mid = vec![0; 256 * 8];
        let mut out = vec![0; 256 * 4];
        assert_eq!(there.swizzle(&mut mid, &[], &src), 256);
        assert_eq!(back.swizzle(&mut out, &[], &mid), 256);
        assert_eq!(out, src, "alpha {a}");
    }
}

#[test]
fn indexed_source_expands_through_the_palette() {
    let mut src_palette = vec![0; PALETTE_LEN];
    for (i, entry) in src_palette.chunks_exact_mut(4).enumerate() {
        entry.copy_from_slice(&[i as u8, 0x80, 255 - i as u8, 0xFF]);
    }
    let mut dst_palette = vec![0; PALETTE_LEN];
    let swizzler = PixelSwizzler::prepare(
        PixelFormat::RGBA_NONPREMUL,
        &mut dst_palette,
        PixelFormat::INDEXED__BGRA_NONPREMUL,
        &src_palette,
        PixelBlend::Src,
    )
    .unwrap();

    let mut dst = [0; 12];
    assert_eq!(swizzler.swizzle(&mut dst, &dst_palette, &[0, 7, 255]), 3);
    assert_eq!(
        dst,
        [
            0xFF, 0x80, 0x00, 0xFF, //
            0xF8, 0x80, 0x07, 0xFF, //
            0x00, 0x80, 0xFF, 0xFF,
        ]
    );
}

#[test]
fn direct_source_cannot_feed_an_indexed_destination() {
    let mut palette = vec![0; PALETTE_LEN];
    let res = PixelSwizzler::prepare(
        PixelFormat::INDEXED__BGRA_NONPREMUL,
        &mut palette,
        PixelFormat::BGRA_NONPREMUL,
        &[],
        PixelBlend::Src,
    );
    assert_eq!(
        res.map(|_| ()),
        Err(imgbase::Error::UnsupportedPixelSwizzlerOption)
    );
}
