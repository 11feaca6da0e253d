use argh::FromArgs;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use imgbase::{
    floatconv::{parse_number_f64, render_number_f64, PRECISION_MAX_INCL},
    io::ProgressMonitor,
    pixel::{
        ImageConfig, PixelBlend, PixelBuffer, PixelConfig, PixelFormat, PixelSubsampling,
        PixelSwizzler,
    },
    uncompng::{Quirk, UncompressedPngDecoder, UncompressedPngEncoder, SCRATCH_LEN_MIN},
    IoBuffer, ParseNumberOptions, RenderNumberOptions, Status, Suspension,
};
use std::{
    error::Error,
    fs::File,
    io::{BufWriter, Read, Write},
    process::ExitCode,
    str::FromStr,
};
use tracing_subscriber::EnvFilter;

/// How many bytes the decoder is fed at a time.
const READ_CHUNK_LEN: usize = 4096;

/// Number conversion and uncompressed PNG tools.
///
/// Set `RUST_LOG` (e.g. `RUST_LOG=imgbase=trace`) for diagnostics on stderr.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    ParseNumber(ParseNumber),
    RenderNumber(RenderNumber),
    Convert(Convert),
    Decode(Decode),
}

/// Parses a decimal number and prints it with its IEEE 754 bits. Put negative numbers after `--`.
#[derive(FromArgs)]
#[argh(subcommand, name = "parse-number")]
struct ParseNumber {
    /// accept `_` between digits
    #[argh(switch)]
    underscores: bool,
    /// use `,` as the decimal separator
    #[argh(switch)]
    comma: bool,
    /// accept leading zeroes such as `007`
    #[argh(switch)]
    leading_zeroes: bool,
    /// reject `inf`, `nan` and overflowing values
    #[argh(switch)]
    reject_inf_nan: bool,

    /// the text to parse
    #[argh(positional)]
    text: String,
}

/// Parses a number and renders it again, like printf.
#[derive(FromArgs)]
#[argh(subcommand, name = "render-number")]
struct RenderNumber {
    /// digits after the decimal point (%e, %f) or significant digits (%g)
    #[argh(option, default = "6")]
    precision: u32,
    /// output style: e, f or g (default)
    #[argh(option, default = "Style::G")]
    style: Style,
    /// print just enough digits to round-trip, ignoring --precision
    #[argh(switch)]
    just_enough: bool,
    /// print `+` for positive values
    #[argh(switch)]
    plus: bool,

    /// the number to render
    #[argh(positional)]
    value: String,
}

#[derive(Debug, Clone, Copy)]
enum Style {
    E,
    F,
    G,
}

impl FromStr for Style {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(style) = s.eq_ignore_ascii_case("e").then_some(Style::E)
               .or_else(|| s.eq_ignore_ascii_case("f").then_some(Style::F))
               .or_else(|| s.eq_ignore_ascii_case("g").then_some(Style::G))
        else { return Err("expected e, f or g"); };

        Ok(style)
    }
}

/// Re-encodes any image as an uncompressed PNG.
#[derive(FromArgs)]
#[argh(subcommand, name = "convert")]
struct Convert {
    /// pixel format to encode from: y, y16, bgrx, bgra (default), bgrx16 or bgra16
    #[argh(option, default = "Layout::Bgra")]
    format: Layout,

    /// the input file, any format the image crate reads
    #[argh(positional)]
    input: String,
    /// the output PNG
    #[argh(positional)]
    output: String,
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Y,
    Y16,
    Bgrx,
    Bgra,
    Bgrx16,
    Bgra16,
}

impl Layout {
    fn pixel_format(self) -> PixelFormat {
        match self {
            Layout::Y => PixelFormat::Y,
            Layout::Y16 => PixelFormat::Y_16LE,
            Layout::Bgrx => PixelFormat::BGRX,
            Layout::Bgra => PixelFormat::BGRA_NONPREMUL,
            Layout::Bgrx16 => PixelFormat::BGRX_4X16LE,
            Layout::Bgra16 => PixelFormat::BGRA_NONPREMUL_4X16LE,
        }
    }

    fn is_16_bit(self) -> bool {
        matches!(self, Layout::Y16 | Layout::Bgrx16 | Layout::Bgra16)
    }
}

impl FromStr for Layout {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(layout) = s.eq_ignore_ascii_case("y").then_some(Layout::Y)
               .or_else(|| s.eq_ignore_ascii_case("y16").then_some(Layout::Y16))
               .or_else(|| s.eq_ignore_ascii_case("bgrx").then_some(Layout::Bgrx))
               .or_else(|| s.eq_ignore_ascii_case("bgra").then_some(Layout::Bgra))
               .or_else(|| s.eq_ignore_ascii_case("bgrx16").then_some(Layout::Bgrx16))
               .or_else(|| s.eq_ignore_ascii_case("bgra16").then_some(Layout::Bgra16))
        else { return Err("expected y, y16, bgrx, bgra, bgrx16 or bgra16"); };

        Ok(layout)
    }
}

/// Decodes an uncompressed PNG.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// output format (png, bmp)
    #[argh(option, default = "Format::Png")]
    format: Format,
    /// warn about checksum mismatches instead of failing
    #[argh(switch)]
    ignore_checksum: bool,

    /// the uncompressed PNG
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Png,
    Bmp,
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("png").then_some(Format::Png)
               .or_else(|| s.eq_ignore_ascii_case("bmp").then_some(Format::Bmp))
        else { return Err("expected png or bmp"); };

        Ok(format)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli { command } = argh::from_env();

    let res = match command {
        Command::ParseNumber(options) => parse_number(options),
        Command::RenderNumber(options) => render_number(options),
        Command::Convert(options) => convert(options),
        Command::Decode(options) => decode(options),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_code(e.as_ref()))
        }
    }
}

/// 2 if an [`imgbase::Error`] anywhere in the chain is internal, 1 otherwise.
fn exit_code(mut e: &(dyn Error + 'static)) -> u8 {
    loop {
        if let Some(base) = e.downcast_ref::<imgbase::Error>() {
            return if base.is_internal() { 2 } else { 1 };
        }
        match e.source() {
            Some(source) => e = source,
            None => return 1,
        }
    }
}

/// Renders `x` with just enough digits to parse back to the same bits.
fn shortest(x: f64) -> String {
    let mut buf = [0u8; 2048];
    let n = render_number_f64(&mut buf, x, 0, RenderNumberOptions::JUST_ENOUGH_PRECISION);
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

fn parse_number(options: ParseNumber) -> Result<(), Box<dyn Error>> {
    let ParseNumber {
        underscores,
        comma,
        leading_zeroes,
        reject_inf_nan,
        text,
    } = options;

    let mut opts = ParseNumberOptions::DEFAULT;
    for (enabled, flag) in [
        (underscores, ParseNumberOptions::ALLOW_UNDERSCORES),
        (comma, ParseNumberOptions::DECIMAL_SEPARATOR_IS_A_COMMA),
        (leading_zeroes, ParseNumberOptions::ALLOW_MULTIPLE_LEADING_ZEROES),
        (reject_inf_nan, ParseNumberOptions::REJECT_INF_AND_NAN),
    ] {
        if enabled {
            opts = opts | flag;
        }
    }

    let x = parse_number_f64(text.as_bytes(), opts)?;
    println!("{}\t0x{:016X}", shortest(x), x.to_bits());
    Ok(())
}

fn render_number(options: RenderNumber) -> Result<(), Box<dyn Error>> {
    let RenderNumber {
        precision,
        style,
        just_enough,
        plus,
        value,
    } = options;

    if precision > PRECISION_MAX_INCL {
        return Err(format!("precision must be at most {PRECISION_MAX_INCL}").into());
    }
    let x = parse_number_f64(value.as_bytes(), ParseNumberOptions::DEFAULT)?;

    let mut opts = match style {
        Style::E => RenderNumberOptions::EXPONENT_PRESENT,
        Style::F => RenderNumberOptions::EXPONENT_ABSENT,
        Style::G => RenderNumberOptions::DEFAULT,
    };
    if just_enough {
        opts = opts | RenderNumberOptions::JUST_ENOUGH_PRECISION;
    }
    if plus {
        opts = opts | RenderNumberOptions::LEADING_PLUS_SIGN;
    }

    // Room for 309 integral digits, the separator, a full precision's worth of fraction digits
    // and a sign.
    let mut buf = vec![0u8; PRECISION_MAX_INCL as usize + 512];
    let n = render_number_f64(&mut buf, x, precision, opts);
    if n == 0 {
        return Err("rendered number does not fit".into());
    }
    println!("{}", String::from_utf8_lossy(&buf[..n]));
    Ok(())
}

fn convert(options: Convert) -> Result<(), Box<dyn Error>> {
    let Convert {
        format,
        input,
        output,
    } = options;

    let image = image::io::Reader::open(&input)?
        .with_guessed_format()?
        .decode()?;
    let (width, height) = (image.width(), image.height());
    println!("Converting {width}x{height} image");

    // Both sides of the swizzle are tightly packed.
    let (src_fmt, src) = if format.is_16_bit() {
        let rgba = image.into_rgba16();
        let bytes: Vec<u8> = rgba.as_raw().iter().flat_map(|c| c.to_be_bytes()).collect();
        (PixelFormat::RGBA_NONPREMUL_4X16BE, bytes)
    } else {
        (PixelFormat::RGBA_NONPREMUL, image.into_rgba8().into_raw())
    };

    let dst_fmt = format.pixel_format();
    let swizzler = PixelSwizzler::prepare(dst_fmt, &mut [], src_fmt, &[], PixelBlend::Src)?;
    let pixel_count = src.len() / swizzler.src_bytes_per_pixel();
    let mut pixels = vec![0u8; pixel_count * swizzler.dst_bytes_per_pixel()];
    let n = swizzler.swizzle(&mut pixels, &[], &src);
    tracing::debug!(pixels = n, ?format, "swizzled");

    let stride = width as usize * swizzler.dst_bytes_per_pixel();
    let mut scratch = vec![0; SCRATCH_LEN_MIN];
    let mut w = BufWriter::new(File::create(&output)?);
    UncompressedPngEncoder::new(&mut scratch)?.encode(
        &mut w,
        &pixels,
        width,
        height,
        stride,
        dst_fmt,
    )?;
    w.flush()?;

    println!("Written `{output}`");
    Ok(())
}

/// Calls `step` until it stops asking for more input, refilling `src` from `r` in between.
fn pump<R: Read>(
    src: &mut IoBuffer<Vec<u8>>,
    r: &mut R,
    mut step: impl FnMut(&mut IoBuffer<Vec<u8>>) -> Status,
) -> Result<Status, Box<dyn Error>> {
    let mut monitor = ProgressMonitor::new();
    loop {
        let status = step(src);
        monitor.observe(status, src.reader_position(), 0)?;
        if status != Status::Suspension(Suspension::ShortRead) {
            return Ok(status.into_result()?);
        }

        src.compact();
        if src.writer_length() == 0 {
            return Err("decoder input buffer is full".into());
        }
        let n = r.read(src.writer_slice_mut())?;
        if n == 0 {
            src.close();
        } else {
            src.commit(n);
        }
    }
}

fn decode(options: Decode) -> Result<(), Box<dyn Error>> {
    let Decode {
        format,
        ignore_checksum,
        input,
        output,
    } = options;

    println!("Decoding `{input}`");
    let mut file = File::open(&input)?;
    let mut src = IoBuffer::writer(vec![0u8; READ_CHUNK_LEN]);

    let mut dec = UncompressedPngDecoder::new();
    dec.set_quirk(Quirk::IgnoreChecksum, ignore_checksum);

    let mut ic = ImageConfig::new();
    pump(&mut src, &mut file, |src| dec.decode_image_config(&mut ic, src))?;
    let (width, height) = (ic.pixcfg.width(), ic.pixcfg.height());
    let wide = ic.pixcfg.pixel_format().channel_depth(0) == 16;
    tracing::debug!(
        width,
        height,
        pixfmt = ic.pixcfg.pixel_format().repr(),
        "read image config"
    );

    let dst_fmt = if wide {
        PixelFormat::RGBA_NONPREMUL_4X16BE
    } else {
        PixelFormat::RGBA_NONPREMUL
    };
    let pixcfg = PixelConfig::from_parts(dst_fmt, PixelSubsampling::NONE, width, height);
    let len = usize::try_from(pixcfg.pixbuf_len())?;
    let mut pixels = vec![0u8; len];
    let mut dst = PixelBuffer::from_slice(&pixcfg, &mut pixels)?;
    pump(&mut src, &mut file, |src| {
        dec.decode_frame(&mut dst, src, PixelBlend::Src)
    })?;

    let image = if wide {
        let channels = pixels
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        let buf = ImageBuffer::<Rgba<u16>, Vec<u16>>::from_raw(width, height, channels)
            .ok_or("failed to create image")?;
        DynamicImage::ImageRgba16(buf)
    } else {
        let buf = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, pixels)
            .ok_or("failed to create image")?;
        DynamicImage::ImageRgba8(buf)
    };

    match format {
        Format::Png => image.save_with_format(&output, ImageFormat::Png)?,
        Format::Bmp => DynamicImage::ImageRgba8(image.into_rgba8())
            .save_with_format(&output, ImageFormat::Bmp)?,
    }

    println!("Written {width}x{height} image to `{output}`");
    Ok(())
}
