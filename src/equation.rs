// cell-local truth tables
use crate::error::InitParseError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

pub type Truth6 = u64;

fn mask6(size: usize) -> Truth6 {
    if size == 6 {
        0xffffffffffffffff
    } else {
        (1 << (1 << size)) - 1
    }
}

/// Truth table of a LUT cell, one bit per input combination.
///
/// Address bit `i` corresponds to the cell's `i`-th logical input pin.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LutEquation {
    ninputs: usize,
    words: Vec<u64>,
}

impl LutEquation {
    pub fn zero(ninputs: usize) -> Self {
        assert!(ninputs < 32, "LUT equation with {ninputs} inputs is too wide");
        let nbits: usize = 1 << ninputs;
        Self {
            ninputs,
            words: vec![0; nbits.div_ceil(64)],
        }
    }

    pub fn from_truth6(m: Truth6, ninputs: usize) -> Self {
        assert!(ninputs <= 6);
        let mut ret = Self::zero(ninputs);
        ret.words[0] = m & mask6(ninputs);
        ret
    }

    pub fn from_fn(ninputs: usize, mut f: impl FnMut(usize) -> bool) -> Self {
        let mut ret = Self::zero(ninputs);
        for address in 0..ret.len() {
            ret.set(address, f(address));
        }
        ret
    }

    pub fn ninputs(&self) -> usize {
        self.ninputs
    }

    pub fn len(&self) -> usize {
        1 << self.ninputs
    }

    pub fn get(&self, address: usize) -> bool {
        assert!(
            address < self.len(),
            "address {address} out of range for a {}-input equation",
            self.ninputs
        );
        self.words[address / 64] & (1 << (address % 64)) != 0
    }

    pub fn set(&mut self, address: usize, value: bool) {
        assert!(
            address < self.len(),
            "address {address} out of range for a {}-input equation",
            self.ninputs
        );
        if value {
            self.words[address / 64] |= 1 << (address % 64);
        } else {
            self.words[address / 64] &= !(1 << (address % 64));
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }
}

impl fmt::Display for LutEquation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}'h", self.len())?;
        let ndigits = self.len().div_ceil(4);
        for digit in (0..ndigits).rev() {
            let mut nibble = 0;
            for bit in 0..4 {
                let address = digit * 4 + bit;
                if address < self.len() && self.get(address) {
                    nibble |= 1 << bit;
                }
            }
            write!(f, "{:x}", nibble)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LutEquation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LutEquation({})", self)
    }
}

impl FromStr for LutEquation {
    type Err = InitParseError;

    /// Parses Verilog-style INIT literals such as `4'h8` or `2'b10`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let literal_re = Regex::new(r"^([0-9]+)'([hHbB])([0-9a-fA-F_]+)$").unwrap();
        let Some(captures) = literal_re.captures(text.trim()) else {
            return Err(InitParseError::Malformed(text.to_owned()));
        };
        let width: usize = captures[1]
            .parse()
            .map_err(|_| InitParseError::Malformed(text.to_owned()))?;
        if !width.is_power_of_two() || width > 1 << 16 {
            return Err(InitParseError::Width(width));
        }

        let digit_bits = match &captures[2] {
            "h" | "H" => 4,
            _ => 1,
        };
        let mut ret = Self::zero(width.trailing_zeros() as usize);
        let digits = captures[3].chars().rev().filter(|&ch| ch != '_');
        for (position, ch) in digits.enumerate() {
            let Some(value) = ch.to_digit(1 << digit_bits) else {
                return Err(InitParseError::Malformed(text.to_owned()));
            };
            for bit in 0..digit_bits {
                if value & (1 << bit) == 0 {
                    continue;
                }
                let address = position * digit_bits + bit;
                if address >= width {
                    return Err(InitParseError::Overflow(text.to_owned()));
                }
                ret.set(address, true);
            }
        }
        Ok(ret)
    }
}
