use super::{
    is_ancillary, ColorType, CHUNK_LEN_MAX_INCL, IDAT, IEND, IHDR, IHDR_LEN, PLTE, SIGNATURE,
};
use crate::{
    checksum::{Adler32, Crc32Ieee},
    io::IoBuffer,
    pixel::{
        AnimationBlend, AnimationDisposal, FrameConfig, ImageConfig, PixelBlend, PixelBuffer,
        PixelFormat, PixelSubsampling, PixelSwizzler,
    },
    range::RectIeU32,
    status::{error, Error, Status},
};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use snafu::ensure;

/// Optional deviations from strict decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quirk {
    /// Accept CRC-32 and Adler-32 mismatches, logging a warning instead of failing.
    IgnoreChecksum,
}

/// Position in the chunk stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Signature,
    ChunkHeader,
    IhdrData,
    SkipChunkData,
    /// IDAT data, fed to the zlib layer.
    IdatData,
    ChunkCrc,
    End,
}

/// Position in the zlib stream spread over the IDAT chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zlib {
    Header,
    BlockHeader,
    BlockData,
    Adler,
    /// Anything left in IDAT chunks is ignored.
    Done,
}

/// The call the decoder expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ImageConfig,
    FrameConfig,
    Frame,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    /// Stop right after the first IDAT chunk header.
    ImageConfig,
    /// Run through IEND.
    Frame,
}

/// A fixed-size field gathered over as many reads as it takes.
#[derive(Debug, Clone, Copy)]
struct Field<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> Field<N> {
    const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    fn take(&mut self) -> [u8; N] {
        self.len = 0;
        self.buf
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    width: u32,
    height: u32,
    color_type: ColorType,
    depth: u8,
}

impl Header {
    fn parse(f: &[u8; IHDR_LEN]) -> Result<Header, Error> {
        let width = BigEndian::read_u32(&f[0..]);
        let height = BigEndian::read_u32(&f[4..]);
        let [depth, color_type, compression, filter, interlace] =
            [f[8], f[9], f[10], f[11], f[12]];

        let dimension_ok = |d: u32| (1..=CHUNK_LEN_MAX_INCL).contains(&d);
        ensure!(
            dimension_ok(width) && dimension_ok(height),
            error::BadHeaderSnafu
        );
        ensure!(
            compression == 0 && filter == 0 && interlace <= 1,
            error::BadHeaderSnafu
        );

        let color_type = match color_type {
            0 => ColorType::Gray,
            2 => ColorType::Rgb,
            4 => ColorType::GrayAlpha,
            6 => ColorType::Rgba,
            3 => {
                ensure!(matches!(depth, 1 | 2 | 4 | 8), error::BadHeaderSnafu);
                return error::UnsupportedPngFeatureSnafu.fail();
            }
            _ => return error::BadHeaderSnafu.fail(),
        };
        match depth {
            8 | 16 => {}
            1 | 2 | 4 if color_type == ColorType::Gray => {
                return error::UnsupportedPngFeatureSnafu.fail()
            }
            _ => return error::BadHeaderSnafu.fail(),
        }
        ensure!(interlace == 0, error::UnsupportedPngFeatureSnafu);

        Ok(Header {
            width,
            height,
            color_type,
            depth,
        })
    }

    fn pixel_format(&self) -> PixelFormat {
        self.color_type.pixel_format(self.depth)
    }

    fn bytes_per_pixel(&self) -> usize {
        self.color_type.channels() * usize::from(self.depth / 8)
    }
}

/// A resumable decoder for PNG files with stored deflate blocks, as written by
/// [`UncompressedPngEncoder`](super::UncompressedPngEncoder).
///
/// Calls go [`decode_image_config`](Self::decode_image_config), then
/// [`decode_frame_config`](Self::decode_frame_config), then [`decode_frame`](Self::decode_frame).
/// Either of the first two may be skipped. Every call may suspend with a short read, in which
/// case it should be repeated once the source has more bytes (or is closed). Errors are final:
/// every later call returns the same one.
#[derive(Debug, Clone)]
pub struct UncompressedPngDecoder {
    phase: Phase,
    state: State,
    zlib: Zlib,
    error: Option<Error>,
    ignore_checksum: bool,

    header: Option<Header>,
    first_idat_position: Option<u64>,

    chunk_position: u64,
    chunk_kind: [u8; 4],
    chunk_remaining: u32,
    chunk_crc: Crc32Ieee,
    /// Signature, chunk header, IHDR data or chunk CRC.
    field: Field<IHDR_LEN>,

    /// zlib header, stored block header or Adler-32.
    zfield: Field<5>,
    final_block: bool,
    block_remaining: u16,
    adler: Adler32,

    swizzler: Option<PixelSwizzler>,
    x: u32,
    y: u32,
    row_started: bool,
    /// A pixel split across chunks or blocks.
    partial: Field<8>,
}

impl Default for UncompressedPngDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl UncompressedPngDecoder {
    pub const fn new() -> Self {
        Self {
            phase: Phase::ImageConfig,
            state: State::Signature,
            zlib: Zlib::Header,
            error: None,
            ignore_checksum: false,
            header: None,
            first_idat_position: None,
            chunk_position: 0,
            chunk_kind: [0; 4],
            chunk_remaining: 0,
            chunk_crc: Crc32Ieee::new(),
            field: Field::new(),
            zfield: Field::new(),
            final_block: false,
            block_remaining: 0,
            adler: Adler32::new(),
            swizzler: None,
            x: 0,
            y: 0,
            row_started: false,
            partial: Field::new(),
        }
    }

    pub fn set_quirk(&mut self, quirk: Quirk, enabled: bool) {
        match quirk {
            Quirk::IgnoreChecksum => self.ignore_checksum = enabled,
        }
    }

    /// Reads up to and including the first IDAT chunk header, then describes the image.
    ///
    /// The reported pixel format is PNG's own layout: `Y`, `YA_NONPREMUL`, `RGB` or
    /// `RGBA_NONPREMUL`, or their 16-bit big-endian variants.
    pub fn decode_image_config<T: AsRef<[u8]>>(
        &mut self,
        dst: &mut ImageConfig,
        src: &mut IoBuffer<T>,
    ) -> Status {
        if let Some(e) = self.error {
            return e.into();
        }
        if self.phase != Phase::ImageConfig {
            return Error::BadCallSequence.into();
        }

        let res = self
            .run(src, Goal::ImageConfig, None)
            .and_then(|status| match status {
                Status::Ok => self.fill_image_config(dst).map(|()| Status::Ok),
                other => Ok(other),
            });
        let status = self.finish(res);
        if status.is_ok() {
            self.phase = Phase::FrameConfig;
        }
        status
    }

    /// Describes the only frame. Once that frame is decoded, returns
    /// [`Note::EndOfData`](crate::Note::EndOfData).
    pub fn decode_frame_config<T: AsRef<[u8]>>(
        &mut self,
        dst: &mut FrameConfig,
        src: &mut IoBuffer<T>,
    ) -> Status {
        if let Some(e) = self.error {
            return e.into();
        }
        match self.phase {
            Phase::ImageConfig => {
                let status = self.decode_image_config(&mut ImageConfig::new(), src);
                if !status.is_ok() {
                    return status;
                }
            }
            Phase::FrameConfig => {}
            Phase::Frame if self.swizzler.is_none() => {}
            Phase::Frame => return Error::BadCallSequence.into(),
            Phase::Done => return Status::END_OF_DATA,
        }

        let (Some(header), Some(io_position)) = (self.header, self.first_idat_position) else {
            return self.finish(error::InconsistentStateSnafu.fail());
        };
        let blend = if header.color_type.is_opaque() {
            AnimationBlend::Opaque
        } else {
            AnimationBlend::Src
        };
        dst.update(
            RectIeU32::from_size(header.width, header.height),
            0,
            0,
            io_position,
            blend,
            AnimationDisposal::None,
            0,
        );
        self.phase = Phase::Frame;
        Status::Ok
    }

    /// Decodes the pixels into `dst`, converting to its pixel format.
    ///
    /// Pixels outside `dst`'s bounds are dropped. Repeated calls after a suspension must pass
    /// the same destination.
    pub fn decode_frame<T: AsRef<[u8]>>(
        &mut self,
        dst: &mut PixelBuffer<'_>,
        src: &mut IoBuffer<T>,
        blend: PixelBlend,
    ) -> Status {
        if let Some(e) = self.error {
            return e.into();
        }
        match self.phase {
            Phase::ImageConfig | Phase::FrameConfig => {
                let status = self.decode_frame_config(&mut FrameConfig::new(), src);
                if !status.is_ok() {
                    return status;
                }
            }
            Phase::Frame => {}
            Phase::Done => return Status::END_OF_DATA,
        }

        let res = self.prepare(dst, blend).and_then(|()| self.run(src, Goal::Frame, Some(dst)));
        let status = self.finish(res);
        if status.is_ok() {
            tracing::debug!("decoded uncompressed PNG frame");
            self.phase = Phase::Done;
        }
        status
    }

    fn finish(&mut self, res: Result<Status, Error>) -> Status {
        match res {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(
                    error = e.message(),
                    position = self.chunk_position,
                    "PNG decoding failed"
                );
                self.error = Some(e);
                e.into()
            }
        }
    }

    fn fill_image_config(&self, dst: &mut ImageConfig) -> Result<(), Error> {
        let (Some(header), Some(io_position)) = (self.header, self.first_idat_position) else {
            return error::InconsistentStateSnafu.fail();
        };
        dst.set(
            header.pixel_format(),
            PixelSubsampling::NONE,
            header.width,
            header.height,
            io_position,
            header.color_type.is_opaque(),
        );
        ensure!(dst.is_valid(), error::UnsupportedImageSizeSnafu);
        Ok(())
    }

    fn prepare(&mut self, dst: &mut PixelBuffer<'_>, blend: PixelBlend) -> Result<(), Error> {
        if self.swizzler.is_some() {
            return Ok(());
        }
        let header = self.header.ok_or(Error::InconsistentState)?;
        let swizzler = PixelSwizzler::prepare(
            dst.pixel_format(),
            dst.palette_mut(),
            header.pixel_format(),
            &[],
            blend,
        )?;
        self.swizzler = Some(swizzler);
        Ok(())
    }

    fn run<T: AsRef<[u8]>>(
        &mut self,
        io: &mut IoBuffer<T>,
        goal: Goal,
        mut dst: Option<&mut PixelBuffer<'_>>,
    ) -> Result<Status, Error> {
        loop {
            match self.state {
                State::Signature => {
                    if !self.fill_field(io, SIGNATURE.len()) {
                        return short_read(io);
                    }
                    let f = self.field.take();
                    ensure!(f[..SIGNATURE.len()] == SIGNATURE, error::BadHeaderSnafu);
                    self.state = State::ChunkHeader;
                }
                State::ChunkHeader => {
                    if self.field.len == 0 {
                        self.chunk_position = io.reader_position();
                    }
                    if !self.fill_field(io, 8) {
                        return short_read(io);
                    }
                    let f = self.field.take();
                    let len = BigEndian::read_u32(&f);
                    let kind = [f[4], f[5], f[6], f[7]];
                    ensure!(len <= CHUNK_LEN_MAX_INCL, error::BadChunkSnafu);
                    tracing::trace!(
                        kind = %kind.escape_ascii(),
                        len,
                        position = self.chunk_position,
                        "chunk"
                    );

                    self.chunk_kind = kind;
                    self.chunk_remaining = len;
                    self.chunk_crc = Crc32Ieee::new();
                    self.chunk_crc.update(&kind);
                    self.state = self.on_chunk(kind, len)?;
                    if self.state == State::IdatData && goal == Goal::ImageConfig {
                        return Ok(Status::Ok);
                    }
                }
                State::IhdrData => {
                    if !self.fill_field(io, IHDR_LEN) {
                        return short_read(io);
                    }
                    let f = self.field.take();
                    self.chunk_crc.update(&f);
                    self.chunk_remaining = 0;
                    let header = Header::parse(&f)?;
                    tracing::debug!(
                        width = header.width,
                        height = header.height,
                        color_type = header.color_type as u8,
                        depth = header.depth,
                        "PNG header"
                    );
                    self.header = Some(header);
                    self.state = State::ChunkCrc;
                }
                State::SkipChunkData => {
                    let n = self.payload_available(io);
                    self.consume_payload(io, n, false);
                    if self.chunk_remaining > 0 {
                        return short_read(io);
                    }
                    self.state = State::ChunkCrc;
                }
                State::IdatData => {
                    let dst = dst.as_deref_mut().ok_or(Error::InconsistentState)?;
                    self.decode_zlib(io, dst)?;
                    if self.chunk_remaining > 0 {
                        return short_read(io);
                    }
                    self.state = State::ChunkCrc;
                }
                State::ChunkCrc => {
                    if !self.fill_field(io, 4) {
                        return short_read(io);
                    }
                    let f = self.field.take();
                    let expected = BigEndian::read_u32(&f);
                    self.check_checksum(expected == self.chunk_crc.finish(), "CRC-32")?;
                    self.state = if self.chunk_kind == IEND {
                        State::End
                    } else {
                        State::ChunkHeader
                    };
                }
                State::End => return Ok(Status::Ok),
            }
        }
    }

    /// Picks the state for a chunk's data.
    fn on_chunk(&mut self, kind: [u8; 4], len: u32) -> Result<State, Error> {
        let Some(header) = self.header else {
            ensure!(
                kind == IHDR && len as usize == IHDR_LEN,
                error::BadHeaderSnafu
            );
            return Ok(State::IhdrData);
        };

        match kind {
            IDAT => {
                self.first_idat_position.get_or_insert(self.chunk_position);
                Ok(State::IdatData)
            }
            IEND => {
                ensure!(
                    self.first_idat_position.is_some() && len == 0,
                    error::BadChunkSnafu
                );
                ensure!(self.zlib == Zlib::Done, error::BadZlibStreamSnafu);
                Ok(State::SkipChunkData)
            }
            IHDR => error::BadChunkSnafu.fail(),
            // Only a suggested palette for truecolor images.
            PLTE if header.color_type != ColorType::Gray && self.first_idat_position.is_none() => {
                Ok(State::SkipChunkData)
            }
            _ if is_ancillary(kind) => Ok(State::SkipChunkData),
            _ => error::UnsupportedPngFeatureSnafu.fail(),
        }
    }

    /// Feeds the current IDAT chunk's available data through the zlib layer, until there is
    /// none left.
    fn decode_zlib<T: AsRef<[u8]>>(
        &mut self,
        io: &mut IoBuffer<T>,
        dst: &mut PixelBuffer<'_>,
    ) -> Result<(), Error> {
        loop {
            match self.zlib {
                Zlib::Header => {
                    if !self.fill_zfield(io, 2) {
                        return Ok(());
                    }
                    let [cmf, flg, ..] = self.zfield.take();
                    ensure!(
                        cmf & 0x0F == 8
                            && cmf >> 4 <= 7
                            && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
                            && flg & 0x20 == 0,
                        error::BadZlibStreamSnafu
                    );
                    self.zlib = Zlib::BlockHeader;
                }
                Zlib::BlockHeader => {
                    if !self.fill_zfield(io, 1) {
                        return Ok(());
                    }
                    match (self.zfield.buf[0] >> 1) & 3 {
                        0 => {}
                        3 => return error::BadZlibStreamSnafu.fail(),
                        _ => return error::UnsupportedPngFeatureSnafu.fail(),
                    }
                    if !self.fill_zfield(io, 5) {
                        return Ok(());
                    }
                    let f = self.zfield.take();
                    let len = LittleEndian::read_u16(&f[1..]);
                    let nlen = LittleEndian::read_u16(&f[3..]);
                    ensure!(len == !nlen, error::BadZlibStreamSnafu);
                    self.final_block = f[0] & 1 != 0;
                    self.block_remaining = len;
                    self.zlib = Zlib::BlockData;
                }
                Zlib::BlockData => {
                    if self.block_remaining == 0 {
                        self.zlib = if self.final_block {
                            let height = self.header.map_or(0, |h| h.height);
                            ensure!(
                                self.y == height && self.partial.len == 0,
                                error::BadZlibStreamSnafu
                            );
                            Zlib::Adler
                        } else {
                            Zlib::BlockHeader
                        };
                        continue;
                    }
                    if !self.decode_pixels(io, dst)? {
                        return Ok(());
                    }
                }
                Zlib::Adler => {
                    if !self.fill_zfield(io, 4) {
                        return Ok(());
                    }
                    let f = self.zfield.take();
                    let expected = BigEndian::read_u32(&f);
                    self.check_checksum(expected == self.adler.finish(), "Adler-32")?;
                    self.zlib = Zlib::Done;
                }
                Zlib::Done => {
                    let n = self.payload_available(io);
                    if n == 0 {
                        return Ok(());
                    }
                    self.consume_payload(io, n, false);
                }
            }
        }
    }

    /// Handles some stored block data: a filter byte, part of a pixel, or a run of whole pixels.
    /// Returns false if no data was available.
    fn decode_pixels<T: AsRef<[u8]>>(
        &mut self,
        io: &mut IoBuffer<T>,
        dst: &mut PixelBuffer<'_>,
    ) -> Result<bool, Error> {
        let avail = self
            .payload_available(io)
            .min(usize::from(self.block_remaining));
        if avail == 0 {
            return Ok(false);
        }
        let (Some(header), Some(swizzler)) = (self.header, self.swizzler) else {
            return error::InconsistentStateSnafu.fail();
        };
        ensure!(self.y < header.height, error::BadZlibStreamSnafu);

        if !self.row_started {
            let filter = io.reader_slice()[0];
            self.consume_payload(io, 1, true);
            ensure!(filter == 0, error::UnsupportedPngFeatureSnafu);
            self.row_started = true;
            return Ok(true);
        }

        let bpp = header.bytes_per_pixel();
        if self.partial.len > 0 || avail < bpp {
            let at = self.partial.len;
            let n = (bpp - at).min(avail);
            self.partial.buf[at..at + n].copy_from_slice(&io.reader_slice()[..n]);
            self.partial.len += n;
            self.consume_payload(io, n, true);
            if self.partial.len == bpp {
                let px = self.partial.take();
                self.write_pixels(dst, &swizzler, &px[..bpp]);
                self.advance(1, header.width);
            }
            return Ok(true);
        }

        let n = (avail / bpp).min((header.width - self.x) as usize);
        let pixels = &io.reader_slice()[..n * bpp];
        self.write_pixels(dst, &swizzler, pixels);
        self.consume_payload(io, n * bpp, true);
        self.advance(n as u32, header.width);
        Ok(true)
    }

    /// Converts `src` into row `y` of `dst` starting at column `x`, clipped to `dst`'s bounds.
    fn write_pixels(&self, dst: &mut PixelBuffer<'_>, swizzler: &PixelSwizzler, src: &[u8]) {
        let (width, height) = (dst.pixel_config().width(), dst.pixel_config().height());
        if self.x >= width || self.y >= height {
            return;
        }
        let bpp = swizzler.dst_bytes_per_pixel();
        let (row, palette) = dst.row_and_palette_mut(self.y);
        let end = (width as usize * bpp).min(row.len());
        if let Some(row) = row.get_mut(self.x as usize * bpp..end) {
            swizzler.swizzle(row, palette, src);
        }
    }

    fn advance(&mut self, n: u32, width: u32) {
        self.x += n;
        if self.x == width {
            self.x = 0;
            self.y += 1;
            self.row_started = false;
        }
    }

    fn check_checksum(&self, matches: bool, kind: &'static str) -> Result<(), Error> {
        if matches {
            return Ok(());
        }
        if self.ignore_checksum {
            tracing::warn!(
                checksum = kind,
                position = self.chunk_position,
                "ignoring checksum mismatch"
            );
            return Ok(());
        }
        error::BadChecksumSnafu.fail()
    }

    /// Gathers `n` bytes of a chunk-level field straight from `io`.
    fn fill_field<T: AsRef<[u8]>>(&mut self, io: &mut IoBuffer<T>, n: usize) -> bool {
        let at = self.field.len;
        if at < n {
            self.field.len += io.read_into(&mut self.field.buf[at..n]);
        }
        self.field.len >= n
    }

    /// Gathers `n` bytes of a zlib-level field from IDAT data.
    fn fill_zfield<T: AsRef<[u8]>>(&mut self, io: &mut IoBuffer<T>, n: usize) -> bool {
        while self.zfield.len < n {
            let avail = self.payload_available(io);
            if avail == 0 {
                return false;
            }
            let at = self.zfield.len;
            let k = (n - at).min(avail);
            self.zfield.buf[at..at + k].copy_from_slice(&io.reader_slice()[..k]);
            self.zfield.len += k;
            self.consume_payload(io, k, false);
        }
        true
    }

    /// Readable bytes that belong to the current chunk.
    fn payload_available<T: AsRef<[u8]>>(&self, io: &IoBuffer<T>) -> usize {
        io.reader_length().min(self.chunk_remaining as usize)
    }

    /// Consumes `n` bytes of chunk data. `block_data` bytes are also stored block contents.
    fn consume_payload<T: AsRef<[u8]>>(
        &mut self,
        io: &mut IoBuffer<T>,
        n: usize,
        block_data: bool,
    ) {
        let bytes = &io.reader_slice()[..n];
        self.chunk_crc.update(bytes);
        if block_data {
            self.adler.update(bytes);
            self.block_remaining -= n as u16;
        }
        self.chunk_remaining -= n as u32;
        io.consume(n);
    }
}

fn short_read<T: AsRef<[u8]>>(io: &IoBuffer<T>) -> Result<Status, Error> {
    io.short_read_status().into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        checksum::{adler32, crc32_ieee},
        pixel::PixelConfig,
        Suspension,
    };

    fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        let crc = crc32_ieee(&[&kind[..], data].concat());
        out.extend_from_slice(&crc.to_be_bytes());
    }

    /// A zlib stream of stored blocks of at most `block_len` bytes.
    fn zlib(raw: &[u8], block_len: usize) -> Vec<u8> {
        let mut out = vec![0x78, 0x01];
        let mut blocks = raw.chunks(block_len).peekable();
        while let Some(block) = blocks.next() {
            let len = block.len() as u16;
            out.push(u8::from(blocks.peek().is_none()));
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&(!len).to_le_bytes());
            out.extend_from_slice(block);
        }
        out.extend_from_slice(&adler32(raw).to_be_bytes());
        out
    }

    fn ihdr(width: u32, height: u32, depth: u8, color_type: u8) -> [u8; 13] {
        let mut f = [0; 13];
        f[..4].copy_from_slice(&width.to_be_bytes());
        f[4..8].copy_from_slice(&height.to_be_bytes());
        f[8] = depth;
        f[9] = color_type;
        f
    }

    fn png(ihdr: &[u8; 13], zlib: &[u8], idat_len: usize) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        chunk(&mut out, b"IHDR", ihdr);
        for data in zlib.chunks(idat_len) {
            chunk(&mut out, b"IDAT", data);
        }
        chunk(&mut out, b"IEND", &[]);
        out
    }

    /// Prefixes every row with filter byte 0.
    fn rows(pixels: &[u8], row_len: usize) -> Vec<u8> {
        pixels
            .chunks(row_len)
            .flat_map(|row| core::iter::once(0).chain(row.iter().copied()))
            .collect()
    }

    fn decode_all(
        dec: &mut UncompressedPngDecoder,
        png: &[u8],
        pixfmt: PixelFormat,
        out: &mut [u8],
    ) -> Status {
        let mut src = IoBuffer::reader(png, true);
        let mut cfg = ImageConfig::new();
        let status = dec.decode_image_config(&mut cfg, &mut src);
        if !status.is_ok() {
            return status;
        }
        let pixcfg = PixelConfig::from_parts(
            pixfmt,
            PixelSubsampling::NONE,
            cfg.pixcfg.width(),
            cfg.pixcfg.height(),
        );
        let mut dst = PixelBuffer::from_slice(&pixcfg, out).unwrap();
        dec.decode_frame(&mut dst, &mut src, PixelBlend::Src)
    }

    #[test]
    fn configs() {
        let raw = rows(&[1, 2, 3, 4, 5, 6], 6);
        let mut file = SIGNATURE.to_vec();
        chunk(&mut file, b"IHDR", &ihdr(2, 1, 8, 2));
        chunk(&mut file, b"tEXt", b"Comment\0hi");
        let first_idat = file.len() as u64;
        chunk(&mut file, b"IDAT", &zlib(&raw, 100));
        chunk(&mut file, b"IEND", &[]);

        let mut dec = UncompressedPngDecoder::new();
        let mut src = IoBuffer::reader(&file[..], true);
        let mut cfg = ImageConfig::new();
        assert_eq!(dec.decode_image_config(&mut cfg, &mut src), Status::Ok);
        assert_eq!(cfg.pixcfg.pixel_format(), PixelFormat::RGB);
        assert_eq!((cfg.pixcfg.width(), cfg.pixcfg.height()), (2, 1));
        assert_eq!(cfg.first_frame_io_position(), first_idat);
        assert!(cfg.first_frame_is_opaque());
        assert_eq!(src.reader_position(), first_idat + 8);

        assert_eq!(
            dec.decode_image_config(&mut cfg, &mut src),
            Status::Error(Error::BadCallSequence)
        );
        // An error in the call sequence doesn't poison the decoder.
        let mut fc = FrameConfig::new();
        assert_eq!(dec.decode_frame_config(&mut fc, &mut src), Status::Ok);
        assert_eq!(fc.bounds(), RectIeU32::from_size(2, 1));
        assert_eq!(fc.io_position(), first_idat);
        assert_eq!(fc.blend(), AnimationBlend::Opaque);

        let mut out = [0; 8];
        let pixcfg =
            PixelConfig::from_parts(PixelFormat::BGRA_NONPREMUL, PixelSubsampling::NONE, 2, 1);
        let mut dst = PixelBuffer::from_slice(&pixcfg, &mut out).unwrap();
        assert_eq!(dec.decode_frame(&mut dst, &mut src, PixelBlend::Src), Status::Ok);
        assert_eq!(dec.decode_frame_config(&mut fc, &mut src), Status::END_OF_DATA);
        assert_eq!(
            dec.decode_frame(&mut dst, &mut src, PixelBlend::Src),
            Status::END_OF_DATA
        );
        assert_eq!(out, [3, 2, 1, 0xFF, 6, 5, 4, 0xFF]);
    }

    #[test]
    fn skips_straight_to_the_frame() {
        let raw = rows(&[0x10, 0x20, 0x30, 0x40], 4);
        let file = png(&ihdr(2, 1, 8, 4), &zlib(&raw, 100), 100);

        let mut dec = UncompressedPngDecoder::new();
        let mut out = [0; 4];
        assert_eq!(decode_all(&mut dec, &file, PixelFormat::YA_NONPREMUL, &mut out), Status::Ok);
        assert_eq!(out, [0x10, 0x20, 0x30, 0x40]);

        let mut dec = UncompressedPngDecoder::new();
        let mut src = IoBuffer::reader(&file[..], true);
        let pixcfg =
            PixelConfig::from_parts(PixelFormat::YA_NONPREMUL, PixelSubsampling::NONE, 2, 1);
        let mut out = [0; 4];
        let mut dst = PixelBuffer::from_slice(&pixcfg, &mut out).unwrap();
        assert_eq!(dec.decode_frame(&mut dst, &mut src, PixelBlend::Src), Status::Ok);
        assert_eq!(out, [0x10, 0x20, 0x30, 0x40]);
    }

    #[test]
    fn pixels_straddle_blocks_and_chunks() {
        // 3x2 RGBA at 16 bits: 8 bytes per pixel, 25 bytes per row with the filter byte.
        let pixels: Vec<u8> = (0..48).collect();
        let raw = rows(&pixels, 24);
        let file = png(&ihdr(3, 2, 16, 6), &zlib(&raw, 7), 5);

        let mut dec = UncompressedPngDecoder::new();
        let mut out = [0; 48];
        assert_eq!(
            decode_all(&mut dec, &file, PixelFormat::RGBA_NONPREMUL_4X16BE, &mut out),
            Status::Ok
        );
        assert_eq!(out[..], pixels[..]);
    }

    #[test]
    fn byte_at_a_time() {
        let pixels: Vec<u8> = (0..36).map(|i| i * 7).collect();
        let raw = rows(&pixels, 18);
        let file = png(&ihdr(3, 2, 16, 2), &zlib(&raw, 11), 13);

        let mut dec = UncompressedPngDecoder::new();
        let mut src = IoBuffer::writer(vec![0; file.len()]);
        let mut fed = 0;
        let mut feed = |src: &mut IoBuffer<Vec<u8>>, status: Status| {
            assert_eq!(status, Status::SHORT_READ);
            // Everything readable was consumed before suspending.
            assert_eq!(src.reader_length(), 0);
            assert!(fed < file.len());
            src.append(&file[fed..fed + 1]);
            fed += 1;
        };

        let mut cfg = ImageConfig::new();
        loop {
            match dec.decode_image_config(&mut cfg, &mut src) {
                Status::Ok => break,
                status => feed(&mut src, status),
            }
        }
        assert_eq!(cfg.pixcfg.pixel_format(), PixelFormat::RGB_3X16BE);

        let mut out = [0; 36];
        let mut dst = PixelBuffer::from_slice(&cfg.pixcfg, &mut out).unwrap();
        loop {
            match dec.decode_frame(&mut dst, &mut src, PixelBlend::Src) {
                Status::Ok => break,
                status => feed(&mut src, status),
            }
        }
        assert_eq!(out[..], pixels[..]);
    }

    #[test]
    fn truncated_input() {
        let raw = rows(&[1, 2, 3, 4], 2);
        let file = png(&ihdr(2, 2, 8, 0), &zlib(&raw, 100), 100);

        for cut in [4, 20, 45, file.len() - 1] {
            let mut dec = UncompressedPngDecoder::new();
            let mut out = [0; 4];
            assert_eq!(
                decode_all(&mut dec, &file[..cut], PixelFormat::Y, &mut out),
                Status::Error(Error::TruncatedInput),
                "cut at {cut}"
            );

            // The same bytes, not yet closed, only suspend.
            let mut dec = UncompressedPngDecoder::new();
            let mut src = IoBuffer::reader(&file[..cut], false);
            let mut fc = FrameConfig::new();
            let status = dec.decode_frame_config(&mut fc, &mut src);
            let status = if status.is_ok() {
                let pixcfg = PixelConfig::from_parts(PixelFormat::Y, PixelSubsampling::NONE, 2, 2);
                let mut dst = PixelBuffer::from_slice(&pixcfg, &mut out).unwrap();
                dec.decode_frame(&mut dst, &mut src, PixelBlend::Src)
            } else {
                status
            };
            assert_eq!(status, Status::Suspension(Suspension::ShortRead));
        }
    }

    #[test]
    fn errors_are_final() {
        let raw = rows(&[1], 1);
        let file = png(&ihdr(1, 1, 8, 0), &zlib(&raw, 100), 100);

        let mut dec = UncompressedPngDecoder::new();
        let mut src = IoBuffer::reader(&file[..10], true);
        let mut cfg = ImageConfig::new();
        assert_eq!(
            dec.decode_image_config(&mut cfg, &mut src),
            Status::Error(Error::TruncatedInput)
        );
        let mut src = IoBuffer::reader(&file[..], true);
        let mut fc = FrameConfig::new();
        assert_eq!(
            dec.decode_frame_config(&mut fc, &mut src),
            Status::Error(Error::TruncatedInput)
        );
    }

    #[test]
    fn checksums() {
        let raw = rows(&[9, 8, 7, 6], 2);
        let good = png(&ihdr(2, 2, 8, 0), &zlib(&raw, 100), 100);

        // IHDR CRC.
        let mut bad_crc = good.clone();
        bad_crc[29] ^= 1;

        // Adler-32, with the IDAT CRC recomputed to match.
        let mut z = zlib(&raw, 100);
        let last = z.len() - 1;
        z[last] ^= 1;
        let bad_adler = png(&ihdr(2, 2, 8, 0), &z, 100);

        for file in [&bad_crc, &bad_adler] {
            let mut out = [0; 4];
            let mut dec = UncompressedPngDecoder::new();
            assert_eq!(
                decode_all(&mut dec, file, PixelFormat::Y, &mut out),
                Status::Error(Error::BadChecksum)
            );

            let mut dec = UncompressedPngDecoder::new();
            dec.set_quirk(Quirk::IgnoreChecksum, true);
            assert_eq!(decode_all(&mut dec, file, PixelFormat::Y, &mut out), Status::Ok);
            assert_eq!(out, [9, 8, 7, 6]);
        }
    }

    #[test]
    fn rejects_unsupported_and_malformed_files() {
        let raw = rows(&[1, 2, 3, 4], 2);
        let z = zlib(&raw, 100);
        let check = |file: &[u8], expected: Error| {
            let mut out = [0; 4];
            let mut dec = UncompressedPngDecoder::new();
            assert_eq!(
                decode_all(&mut dec, file, PixelFormat::Y, &mut out),
                Status::Error(expected)
            );
        };

        let mut bad_sig = png(&ihdr(2, 2, 8, 0), &z, 100);
        bad_sig[1] = b'Q';
        check(&bad_sig, Error::BadHeader);

        check(&png(&ihdr(0, 2, 8, 0), &z, 100), Error::BadHeader);
        check(&png(&ihdr(2, 2, 8, 3), &z, 100), Error::UnsupportedPngFeature);
        check(&png(&ihdr(2, 2, 4, 0), &z, 100), Error::UnsupportedPngFeature);
        check(&png(&ihdr(2, 2, 8, 1), &z, 100), Error::BadHeader);
        check(&png(&ihdr(2, 2, 5, 0), &z, 100), Error::BadHeader);
        let mut interlaced = ihdr(2, 2, 8, 0);
        interlaced[12] = 1;
        check(&png(&interlaced, &z, 100), Error::UnsupportedPngFeature);

        // A fixed-Huffman block.
        let mut fixed = z.clone();
        fixed[2] = 0b011;
        check(&png(&ihdr(2, 2, 8, 0), &fixed, 100), Error::UnsupportedPngFeature);

        let mut nlen = z.clone();
        nlen[5] ^= 1;
        check(&png(&ihdr(2, 2, 8, 0), &nlen, 100), Error::BadZlibStream);

        let mut preset_dict = z.clone();
        preset_dict[1] = 0x20;
        check(&png(&ihdr(2, 2, 8, 0), &preset_dict, 100), Error::BadZlibStream);

        let mut paeth = raw.clone();
        paeth[0] = 4;
        check(&png(&ihdr(2, 2, 8, 0), &zlib(&paeth, 100), 100), Error::UnsupportedPngFeature);

        check(&png(&ihdr(2, 2, 8, 0), &zlib(&raw[..4], 100), 100), Error::BadZlibStream);
        let mut extra = raw.clone();
        extra.push(0);
        check(&png(&ihdr(2, 2, 8, 0), &zlib(&extra, 100), 100), Error::BadZlibStream);

        let mut unknown_critical = SIGNATURE.to_vec();
        chunk(&mut unknown_critical, b"IHDR", &ihdr(2, 2, 8, 0));
        chunk(&mut unknown_critical, b"XYZW", &[1, 2]);
        check(&unknown_critical, Error::UnsupportedPngFeature);

        let mut no_idat = SIGNATURE.to_vec();
        chunk(&mut no_idat, b"IHDR", &ihdr(2, 2, 8, 0));
        chunk(&mut no_idat, b"IEND", &[]);
        check(&no_idat, Error::BadChunk);
    }

    #[test]
    fn clips_to_the_destination() {
        let raw = rows(&[1, 2, 3, 4, 5, 6], 3);
        let file = png(&ihdr(3, 2, 8, 0), &zlib(&raw, 100), 100);

        let mut dec = UncompressedPngDecoder::new();
        let mut src = IoBuffer::reader(&file[..], true);
        let pixcfg = PixelConfig::from_parts(PixelFormat::Y, PixelSubsampling::NONE, 2, 1);
        let mut out = [0; 2];
        let mut dst = PixelBuffer::from_slice(&pixcfg, &mut out).unwrap();
        assert_eq!(dec.decode_frame(&mut dst, &mut src, PixelBlend::Src), Status::Ok);
        assert_eq!(out, [1, 2]);
    }

    #[test]
    fn unsupported_destination() {
        let raw = rows(&[1, 2, 3, 4], 2);
        let file = png(&ihdr(2, 2, 8, 0), &zlib(&raw, 100), 100);
        let mut out = [0; 4 + 1024];
        let mut dec = UncompressedPngDecoder::new();
        assert_eq!(
            decode_all(&mut dec, &file, PixelFormat::INDEXED__BGRA_NONPREMUL, &mut out),
            Status::Error(Error::UnsupportedPixelSwizzlerOption)
        );
    }
}
