//! Complex numbers

use crate::error::{EvalError, Result};

/// A complex number with binary float parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    /// Real part
    pub re: f64,
    /// Imaginary part
    pub im: f64,
}

impl Complex {
    /// Create a complex number.
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Absolute value.
    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Complex conjugate.
    pub fn conjugate(self) -> Self {
        Self::new(self.re, -self.im)
    }

    /// Sum.
    pub fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    /// Difference.
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }

    /// Product.
    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    /// Quotient (Smith's algorithm).
    pub fn div(self, other: Self) -> Result<Self> {
        if other.re == 0.0 && other.im == 0.0 {
            return Err(EvalError::zero_division("complex division by zero"));
        }
        if other.re.abs() >= other.im.abs() {
            let ratio = other.im / other.re;
            let denom = other.re + other.im * ratio;
            Ok(Self::new(
                (self.re + self.im * ratio) / denom,
                (self.im - self.re * ratio) / denom,
            ))
        } else {
            let ratio = other.re / other.im;
            let denom = other.re * ratio + other.im;
            Ok(Self::new(
                (self.re * ratio + self.im) / denom,
                (self.im * ratio - self.re) / denom,
            ))
        }
    }

    /// Power.
    pub fn pow(self, exp: Self) -> Result<Self> {
        if exp.re == 0.0 && exp.im == 0.0 {
            return Ok(Self::new(1.0, 0.0));
        }
        if self.re == 0.0 && self.im == 0.0 {
            if exp.im != 0.0 || exp.re < 0.0 {
                return Err(EvalError::zero_division(
                    "0.0 to a negative or complex power",
                ));
            }
            return Ok(Self::new(0.0, 0.0));
        }
        if exp.im == 0.0 && exp.re.fract() == 0.0 && exp.re.abs() <= 100.0 {
            let n = exp.re as i32;
            let mut result = Self::new(1.0, 0.0);
            let mut base = self;
            let mut k = n.unsigned_abs();
            while k > 0 {
                if k & 1 == 1 {
                    result = result.mul(base);
                }
                base = base.mul(base);
                k >>= 1;
            }
            return if n < 0 {
                Self::new(1.0, 0.0).div(result)
            } else {
                Ok(result)
            };
        }
        let modulus = self.abs();
        let arg = self.im.atan2(self.re);
        let len = modulus.powf(exp.re) * (-exp.im * arg).exp();
        let phase = arg * exp.re + exp.im * modulus.ln();
        let result = Self::new(len * phase.cos(), len * phase.sin());
        if !result.re.is_finite() || !result.im.is_finite() {
            return Err(EvalError::overflow("complex exponentiation"));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);
        assert_eq!(a.add(b), Complex::new(4.0, 1.0));
        assert_eq!(a.mul(b), Complex::new(5.0, 5.0));
        assert_eq!(a.div(Complex::new(1.0, 0.0)).unwrap(), a);
        assert!(a.div(Complex::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_integer_power() {
        let i = Complex::new(0.0, 1.0);
        assert_eq!(i.pow(Complex::new(2.0, 0.0)).unwrap(), Complex::new(-1.0, 0.0));
        assert_eq!(Complex::new(2.0, 0.0).abs(), 2.0);
    }
}
