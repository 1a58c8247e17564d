// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;

fn transform(state: &mut [u32; 4], buf: &[u8]) {
    assert!(buf.len() == 64);

    let mut input = [0u32; 16];

    macro_rules! collect {
        ($output:ident, $input:ident, $idx:expr) => {
            $output[$idx] = u32::from_le_bytes([
                $input[$idx * 4],
                $input[$idx * 4 + 1],
                $input[$idx * 4 + 2],
                $input[$idx * 4 + 3],
            ]);
        };
    }

    for i in 0..16 {
        collect!(input, buf, i);
    }

    macro_rules! round_step {
        ($a:ident, $b:ident, $f:expr, $m:expr, $s:expr, $k:expr) => {
            $a = $f.wrapping_add($a).wrapping_add($k).wrapping_add($m);
            $a = $b.wrapping_add($a.rotate_left($s));
        };
    }

    let mut a = state[0];
    let mut b = state[1];
    let mut c = state[2];
    let mut d = state[3];

    // Round 1: F(B, C, D) = D xor (B and (C xor D))
    {
        macro_rules! t {
            ($a:ident, $b:ident, $c:ident, $d:ident, $m:expr, $s:expr, $k:expr) => {
                round_step!($a, $b, $d ^ ($b & ($c ^ $d)), $m, $s, $k);
            };
        }
        t!(a, b, c, d, input[0], 7, 0xd76aa478);
        t!(d, a, b, c, input[1], 12, 0xe8c7b756);
        t!(c, d, a, b, input[2], 17, 0x242070db);
        t!(b, c, d, a, input[3], 22, 0xc1bdceee);
        t!(a, b, c, d, input[4], 7, 0xf57c0faf);
        t!(d, a, b, c, input[5], 12, 0x4787c62a);
        t!(c, d, a, b, input[6], 17, 0xa8304613);
        t!(b, c, d, a, input[7], 22, 0xfd469501);
        t!(a, b, c, d, input[8], 7, 0x698098d8);
        t!(d, a, b, c, input[9], 12, 0x8b44f7af);
        t!(c, d, a, b, input[10], 17, 0xffff5bb1);
        t!(b, c, d, a, input[11], 22, 0x895cd7be);
        t!(a, b, c, d, input[12], 7, 0x6b901122);
        t!(d, a, b, c, input[13], 12, 0xfd987193);
        t!(c, d, a, b, input[14], 17, 0xa679438e);
        t!(b, c, d, a, input[15], 22, 0x49b40821);
    }

    // Round 2: G(B, C, D) = C xor (D and (B xor C))
    {
        macro_rules! t {
            ($a:ident, $b:ident, $c:ident, $d:ident, $m:expr, $s:expr, $k:expr) => {
                round_step!($a, $b, $c ^ ($d & ($b ^ $c)), $m, $s, $k);
            };
        }
        t!(a, b, c, d, input[1], 5, 0xf61e2562);
        t!(d, a, b, c, input[6], 9, 0xc040b340);
        t!(c, d, a, b, input[11], 14, 0x265e5a51);
        t!(b, c, d, a, input[0], 20, 0xe9b6c7aa);
        t!(a, b, c, d, input[5], 5, 0xd62f105d);
        t!(d, a, b, c, input[10], 9, 0x02441453);
        t!(c, d, a, b, input[15], 14, 0xd8a1e681);
        t!(b, c, d, a, input[4], 20, 0xe7d3fbc8);
        t!(a, b, c, d, input[9], 5, 0x21e1cde6);
        t!(d, a, b, c, input[14], 9, 0xc33707d6);
        t!(c, d, a, b, input[3], 14, 0xf4d50d87);
        t!(b, c, d, a, input[8], 20, 0x455a14ed);
        t!(a, b, c, d, input[13], 5, 0xa9e3e905);
        t!(d, a, b, c, input[2], 9, 0xfcefa3f8);
        t!(c, d, a, b, input[7], 14, 0x676f02d9);
        t!(b, c, d, a, input[12], 20, 0x8d2a4c8a);
    }

    // Round 3: H(B, C, D) = B xor C xor D
    {
        macro_rules! t {
            ($a:ident, $b:ident, $c:ident, $d:ident, $m:expr, $s:expr, $k:expr) => {
                round_step!($a, $b, $b ^ $c ^ $d, $m, $s, $k);
            };
        }
        t!(a, b, c, d, input[5], 4, 0xfffa3942);
        t!(d, a, b, c, input[8], 11, 0x8771f681);
        t!(c, d, a, b, input[11], 16, 0x6d9d6122);
        t!(b, c, d, a, input[14], 23, 0xfde5380c);
        t!(a, b, c, d, input[1], 4, 0xa4beea44);
        t!(d, a, b, c, input[4], 11, 0x4bdecfa9);
        t!(c, d, a, b, input[7], 16, 0xf6bb4b60);
        t!(b, c, d, a, input[10], 23, 0xbebfbc70);
        t!(a, b, c, d, input[13], 4, 0x289b7ec6);
        t!(d, a, b, c, input[0], 11, 0xeaa127fa);
        t!(c, d, a, b, input[3], 16, 0xd4ef3085);
        t!(b, c, d, a, input[6], 23, 0x04881d05);
        t!(a, b, c, d, input[9], 4, 0xd9d4d039);
        t!(d, a, b, c, input[12], 11, 0xe6db99e5);
        t!(c, d, a, b, input[15], 16, 0x1fa27cf8);
        t!(b, c, d, a, input[2], 23, 0xc4ac5665);
    }

    // Round 4: I(B,C,D) = C xor (B or (not D))
    {
        macro_rules! t {
            ($a:ident, $b:ident, $c:ident, $d:ident, $m:expr, $s:expr, $k:expr) => {
                round_step!($a, $b, $c ^ ($b | !$d), $m, $s, $k);
            };
        }
        t!(a, b, c, d, input[0], 6, 0xf4292244);
        t!(d, a, b, c, input[7], 10, 0x432aff97);
        t!(c, d, a, b, input[14], 15, 0xab9423a7);
        t!(b, c, d, a, input[5], 21, 0xfc93a039);
        t!(a, b, c, d, input[12], 6, 0x655b59c3);
        t!(d, a, b, c, input[3], 10, 0x8f0ccc92);
        t!(c, d, a, b, input[10], 15, 0xffeff47d);
        t!(b, c, d, a, input[1], 21, 0x85845dd1);
        t!(a, b, c, d, input[8], 6, 0x6fa87e4f);
        t!(d, a, b, c, input[15], 10, 0xfe2ce6e0);
        t!(c, d, a, b, input[6], 15, 0xa3014314);
        t!(b, c, d, a, input[13], 21, 0x4e0811a1);
        t!(a, b, c, d, input[4], 6, 0xf7537e82);
        t!(d, a, b, c, input[11], 10, 0xbd3af235);
        t!(c, d, a, b, input[2], 15, 0x2ad7d2bb);
        t!(b, c, d, a, input[9], 21, 0xeb86d391);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

/// `Md5` implements the MD5 hashing algorithm, fed incrementally.
///
/// Used to derive a `FileId` from a `file_name` when the sender did not
/// supply a `file_checksum`.
pub struct Md5 {
    state: [u32; 4],
    block: [u8; Md5::BLOCK_LEN],
    len: u64,
}

impl Default for Md5 {
    fn default() -> Self {
        Md5 {
            state: [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476],
            block: [0; Md5::BLOCK_LEN],
            len: 0,
        }
    }
}

impl Md5 {
    const BLOCK_LEN: usize = 64;
    const BLOCK_LEN_MASK: u64 = 0x3f;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, buf: &[u8]) {
        let mut rem = buf;

        while !rem.is_empty() {
            let block_len = (self.len & Md5::BLOCK_LEN_MASK) as usize;
            let copy_len = cmp::min(rem.len(), Md5::BLOCK_LEN - block_len);

            self.len += copy_len as u64;

            if copy_len == Md5::BLOCK_LEN {
                transform(&mut self.state, &rem[..copy_len]);
            } else {
                self.block[block_len..block_len + copy_len].copy_from_slice(&rem[..copy_len]);

                if self.len & Md5::BLOCK_LEN_MASK == 0 {
                    transform(&mut self.state, &self.block);
                }
            }

            rem = &rem[copy_len..];
        }
    }

    /// Finalizes and returns the computed MD5 digest. Does not consume `self`
    /// so callers may keep hashing (unused here, but mirrors `update`'s
    /// streaming shape).
    pub fn finalize(&self) -> [u8; 16] {
        let mut block = [0; Md5::BLOCK_LEN];
        let mut state = self.state;

        let block_len = (self.len & Md5::BLOCK_LEN_MASK) as usize;
        assert!(block_len < Md5::BLOCK_LEN);

        block[..block_len].copy_from_slice(&self.block[..block_len]);
        block[block_len] = 0x80;

        if Md5::BLOCK_LEN - block_len - 1 < 8 {
            transform(&mut state, &block);
            block = [0; Md5::BLOCK_LEN];
        }

        block[Md5::BLOCK_LEN - 8..Md5::BLOCK_LEN].copy_from_slice(&(self.len << 3).to_le_bytes());
        transform(&mut state, &block);

        let mut hash = [0; 16];
        hash[0..4].copy_from_slice(&state[0].to_le_bytes());
        hash[4..8].copy_from_slice(&state[1].to_le_bytes());
        hash[8..12].copy_from_slice(&state[2].to_le_bytes());
        hash[12..16].copy_from_slice(&state[3].to_le_bytes());
        hash
    }

    /// Convenience one-shot helper: hashes `data` and returns the lowercase
    /// hex digest.
    pub fn hex(data: &[u8]) -> String {
        let mut md5 = Md5::new();
        md5.update(data);
        md5.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }
}
