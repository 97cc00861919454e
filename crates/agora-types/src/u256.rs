use crate::error::TypesError;
use crate::TOKEN_DECIMALS;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 256-bit unsigned integer for token amounts.
///
/// Stored as 4 x u64 in little-endian limb order.
/// Arithmetic is checked only and returns `None` at the 256-bit boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]); // [low, mid_low, mid_high, high]

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl U256 {
    pub const ZERO: Self = Self([0, 0, 0, 0]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    /// One whole governance token (10^18 base units)
    pub const TOKEN: Self = Self([1_000_000_000_000_000_000, 0, 0, 0]);

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn as_limbs(&self) -> &[u64; 4] {
        &self.0
    }

    /// Create from a u64 value
    pub const fn from_u64(val: u64) -> Self {
        Self([val, 0, 0, 0])
    }

    /// Create from a u128 value
    pub const fn from_u128(val: u128) -> Self {
        Self([val as u64, (val >> 64) as u64, 0, 0])
    }

    /// `whole` tokens expressed in base units.
    pub fn tokens(whole: u64) -> Option<Self> {
        Self::from_u64(whole).checked_mul(&Self::TOKEN)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&l| l == 0)
    }

    /// Checked addition
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let mut result = [0u64; 4];
        let mut carry = 0u64;

        for i in 0..4 {
            let (sum1, overflow1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum2, overflow2) = sum1.overflowing_add(carry);
            result[i] = sum2;
            carry = (overflow1 as u64) + (overflow2 as u64);
        }

        if carry != 0 {
            None
        } else {
            Some(Self(result))
        }
    }

    /// Checked subtraction
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        if self < rhs {
            return None;
        }
        Some(self.wrapping_sub(rhs))
    }

    fn wrapping_sub(&self, rhs: &Self) -> Self {
        let mut result = [0u64; 4];
        let mut borrow = 0u64;

        for i in 0..4 {
            let (diff1, underflow1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff2, underflow2) = diff1.overflowing_sub(borrow);
            result[i] = diff2;
            borrow = (underflow1 | underflow2) as u64;
        }

        Self(result)
    }

    /// Checked multiplication
    pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
        if self.is_zero() || rhs.is_zero() {
            return Some(Self::ZERO);
        }

        // Full 512-bit schoolbook product; any non-zero high limb is an overflow.
        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let cur = wide[i + j] as u128 + (self.0[i] as u128) * (rhs.0[j] as u128) + carry;
                wide[i + j] = cur as u64;
                carry = cur >> 64;
            }
            wide[i + 4] = carry as u64;
        }

        if wide[4..].iter().any(|&l| l != 0) {
            return None;
        }
        Some(Self([wide[0], wide[1], wide[2], wide[3]]))
    }

    /// Quotient and remainder; `None` on division by zero.
    pub fn checked_div_rem(&self, rhs: &Self) -> Option<(Self, Self)> {
        if rhs.is_zero() {
            return None;
        }
        if self < rhs {
            return Some((Self::ZERO, *self));
        }

        let mut quotient = [0u64; 4];
        let mut remainder = Self::ZERO;

        for i in (0..self.bit_len()).rev() {
            let carried_out = remainder.bit(255);
            remainder = remainder.shl1();
            if self.bit(i) {
                remainder.0[0] |= 1;
            }

            // When a bit was carried out the true remainder exceeds 2^256 > rhs.
            if carried_out || remainder >= *rhs {
                remainder = remainder.wrapping_sub(rhs);
                quotient[(i / 64) as usize] |= 1u64 << (i % 64);
            }
        }

        Some((Self(quotient), remainder))
    }

    /// Checked (floor) division
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        self.checked_div_rem(rhs).map(|(q, _)| q)
    }

    /// `floor(self * numerator / denominator)` without overflowing the
    /// intermediate product, for small numerators such as percentages.
    pub fn mul_div_floor(&self, numerator: u64, denominator: u64) -> Option<Self> {
        let num = Self::from_u64(numerator);
        let den = Self::from_u64(denominator);
        let (q, r) = self.checked_div_rem(&den)?;
        let whole = q.checked_mul(&num)?;
        let part = r.checked_mul(&num)?.checked_div(&den)?;
        whole.checked_add(&part)
    }

    fn shl1(&self) -> Self {
        let mut result = [0u64; 4];
        for i in (0..4).rev() {
            result[i] = self.0[i] << 1;
            if i > 0 {
                result[i] |= self.0[i - 1] >> 63;
            }
        }
        Self(result)
    }

    /// Get bit at position
    pub fn bit(&self, pos: u32) -> bool {
        if pos >= 256 {
            return false;
        }
        (self.0[(pos / 64) as usize] >> (pos % 64)) & 1 != 0
    }

    /// Bit length (position of highest set bit + 1)
    pub fn bit_len(&self) -> u32 {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return (i as u32 + 1) * 64 - self.0[i].leading_zeros();
            }
        }
        0
    }

    /// Convert from big-endian bytes
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut limb_bytes = [0u8; 8];
            limb_bytes.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            limbs[3 - i] = u64::from_be_bytes(limb_bytes);
        }
        Self(limbs)
    }

    /// Parse from decimal string
    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        if s.is_empty() {
            return Err(TypesError::InvalidU256String(s.to_string()));
        }

        let ten = Self::from_u64(10);
        let mut result = Self::ZERO;

        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| TypesError::InvalidU256String(s.to_string()))?;
            result = result
                .checked_mul(&ten)
                .and_then(|r| r.checked_add(&Self::from_u64(digit as u64)))
                .ok_or(TypesError::U256Overflow)?;
        }

        Ok(result)
    }

    /// Parse a human amount such as `"1000"` or `"0.01"` into base units
    /// with `decimals` fractional digits.
    pub fn parse_units(s: &str, decimals: u32) -> Result<Self, TypesError> {
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if frac.len() > decimals as usize {
            return Err(TypesError::TooManyDecimals {
                max: decimals,
                actual: frac.len(),
            });
        }

        let scale = pow10(decimals)?;
        let whole = if whole.is_empty() { Self::ZERO } else { Self::from_decimal_str(whole)? };
        let mut value = whole.checked_mul(&scale).ok_or(TypesError::U256Overflow)?;

        if !frac.is_empty() {
            let frac_scale = pow10(decimals - frac.len() as u32)?;
            let frac_units = Self::from_decimal_str(frac)?
                .checked_mul(&frac_scale)
                .ok_or(TypesError::U256Overflow)?;
            value = value.checked_add(&frac_units).ok_or(TypesError::U256Overflow)?;
        }

        Ok(value)
    }

    /// Parse a whole-or-fractional token amount (18 decimals).
    pub fn parse_tokens(s: &str) -> Result<Self, TypesError> {
        Self::parse_units(s, TOKEN_DECIMALS)
    }

    /// Render base units as a decimal amount with `decimals` fractional
    /// digits, trimming trailing zeros.
    pub fn format_units(&self, decimals: u32) -> String {
        let scale = match pow10(decimals) {
            Ok(scale) => scale,
            Err(_) => return self.to_string(),
        };
        let (whole, frac) = match self.checked_div_rem(&scale) {
            Some(parts) => parts,
            None => return self.to_string(),
        };

        if frac.is_zero() {
            return whole.to_string();
        }

        let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }

    /// Render as whole tokens (18 decimals).
    pub fn format_tokens(&self) -> String {
        self.format_units(TOKEN_DECIMALS)
    }
}

fn pow10(exp: u32) -> Result<U256, TypesError> {
    let ten = U256::from_u64(10);
    let mut result = U256::ONE;
    for _ in 0..exp {
        result = result.checked_mul(&ten).ok_or(TypesError::U256Overflow)?;
    }
    Ok(result)
}

impl From<u64> for U256 {
    fn from(val: u64) -> Self {
        Self::from_u64(val)
    }
}

impl From<u128> for U256 {
    fn from(val: u128) -> Self {
        Self::from_u128(val)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }

        let ten = Self::from_u64(10);
        let mut n = *self;
        let mut digits = Vec::new();

        while !n.is_zero() {
            let (q, r) = n.checked_div_rem(&ten).ok_or(fmt::Error)?;
            digits.push(b'0' + r.0[0] as u8);
            n = q;
        }

        digits.reverse();
        f.write_str(std::str::from_utf8(&digits).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl FromStr for U256 {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let padded = if digits.len() % 2 == 1 {
                format!("0{}", digits)
            } else {
                digits.to_string()
            };
            let bytes = hex::decode(padded)?;
            if bytes.len() > 32 {
                return Err(TypesError::U256Overflow);
            }
            let mut buf = [0u8; 32];
            buf[32 - bytes.len()..].copy_from_slice(&bytes);
            Ok(Self::from_be_bytes(buf))
        } else {
            Self::from_decimal_str(s)
        }
    }
}
