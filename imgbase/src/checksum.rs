//! Incremental CRC-32 (IEEE) and Adler-32 checksums.

const CRC32_IEEE_TABLE: [u32; 256] = make_crc32_ieee_table();

const fn make_crc32_ieee_table() -> [u32; 256] {
    let mut out = [0; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            if (c & 1) != 0 {
                c = 0xEDB8_8320 ^ (c >> 1);
            } else {
                c >>= 1;
            }
            k += 1;
        }
        out[n] = c;
        n += 1;
    }
    out
}

/// The CRC-32 used by PNG, gzip and zip.
#[derive(Debug, Clone, Copy)]
pub struct Crc32Ieee {
    state: u32,
}

impl Default for Crc32Ieee {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32Ieee {
    pub const fn new() -> Self {
        Self { state: u32::MAX }
    }

    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.state;
        for &byte in data {
            let i = (crc ^ u32::from(byte)) as u8 as usize;
            crc = CRC32_IEEE_TABLE[i] ^ (crc >> 8);
        }
        self.state = crc;
    }

    /// The checksum of everything passed to [`update`](Self::update) so far. Does not reset.
    #[inline]
    pub const fn finish(&self) -> u32 {
        self.state ^ u32::MAX
    }
}

/// One-shot CRC-32 of `data`.
pub fn crc32_ieee(data: &[u8]) -> u32 {
    let mut c = Crc32Ieee::new();
    c.update(data);
    c.finish()
}

const ADLER32_MOD: u32 = 65521;
// Largest n such that 255 * n * (n + 1) / 2 + (n + 1) * (ADLER32_MOD - 1) fits in a u32.
const ADLER32_NMAX: usize = 5552;

/// The checksum that trails every zlib stream.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    pub const fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        let (mut s1, mut s2) = (self.s1, self.s2);
        for chunk in data.chunks(ADLER32_NMAX) {
            for &b in chunk {
                s1 += u32::from(b);
                s2 += s1;
            }
            s1 %= ADLER32_MOD;
            s2 %= ADLER32_MOD;
        }
        self.s1 = s1;
        self.s2 = s2;
    }

    #[inline]
    pub const fn finish(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }
}

/// One-shot Adler-32 of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut a = Adler32::new();
    a.update(data);
    a.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_known_values() {
        assert_eq!(crc32_ieee(b""), 0);
        assert_eq!(crc32_ieee(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32_ieee(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn adler32_known_values() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 + i / 13) as u8).collect();
        let mut c = Crc32Ieee::new();
        let mut a = Adler32::new();
        for piece in data.chunks(997) {
            c.update(piece);
            a.update(piece);
        }
        assert_eq!(c.finish(), crc32_ieee(&data));
        assert_eq!(a.finish(), adler32(&data));

        let all_ff = vec![0xFFu8; 100_000];
        let mut slow = (1u32, 0u32);
        for &b in &all_ff {
            slow.0 = (slow.0 + u32::from(b)) % ADLER32_MOD;
            slow.1 = (slow.1 + slow.0) % ADLER32_MOD;
        }
        assert_eq!(adler32(&all_ff), (slow.1 << 16) | slow.0);
    }
}
