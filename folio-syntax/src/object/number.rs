//! Number objects.

use log::debug;

/// A PDF number. Integers and reals are kept apart so that operands like
/// bits-per-component or array indices survive exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Number(pub(crate) InternalNumber);

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum InternalNumber {
    Integer(i64),
    Real(f64),
}

impl Number {
    /// Zero as an integer.
    pub const ZERO: Self = Self(InternalNumber::Integer(0));

    /// Create an integer number.
    pub fn from_i64(num: i64) -> Self {
        Self(InternalNumber::Integer(num))
    }

    /// Create a real number.
    pub fn from_f64(num: f64) -> Self {
        Self(InternalNumber::Real(num))
    }

    /// Whether the number was written without a fractional part.
    pub fn is_integer(&self) -> bool {
        matches!(self.0, InternalNumber::Integer(_))
    }

    /// The number as an `f64`.
    pub fn as_f64(&self) -> f64 {
        match self.0 {
            InternalNumber::Integer(i) => i as f64,
            InternalNumber::Real(r) => r,
        }
    }

    /// The number as an `f32`.
    pub fn as_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    /// The number as an `i64`, truncating reals.
    pub fn as_i64(&self) -> i64 {
        match self.0 {
            InternalNumber::Integer(i) => i,
            InternalNumber::Real(r) => {
                if r.trunc() != r {
                    debug!("real {r} was truncated to an integer");
                }

                r as i64
            }
        }
    }

    /// Parse the body of a numeric token.
    ///
    /// PDF producers emit oddities like `--5`, `4.` or `.5`; these are read
    /// leniently. Returns `None` if no digit is present at all.
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        let mut idx = 0;
        let mut negative = false;

        while let Some(b) = bytes.get(idx).copied() {
            match b {
                b'-' => negative = !negative,
                b'+' => {}
                _ => break,
            }

            idx += 1;
        }

        let mut int_part: i64 = 0;
        let mut literal = String::new();
        let mut seen_dot = false;
        let mut seen_digit = false;
        let mut overflow = false;

        for b in bytes[idx..].iter().copied() {
            match b {
                b'0'..=b'9' => {
                    seen_digit = true;
                    literal.push(b as char);

                    if !seen_dot {
                        let digit = (b - b'0') as i64;

                        match int_part.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                            Some(v) => int_part = v,
                            None => overflow = true,
                        }
                    }
                }
                b'.' if !seen_dot => {
                    seen_dot = true;
                    literal.push('.');
                }
                // A second dot or a stray sign ends the number.
                _ => break,
            }
        }

        if !seen_digit {
            return None;
        }

        if seen_dot || overflow {
            let value = format!("0{literal}").parse::<f64>().ok()?;

            Some(Self::from_f64(if negative { -value } else { value }))
        } else {
            Some(Self::from_i64(if negative { -int_part } else { int_part }))
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Number;

    #[test]
    fn integers() {
        assert_eq!(Number::parse(b"34"), Some(Number::from_i64(34)));
        assert_eq!(Number::parse(b"+17"), Some(Number::from_i64(17)));
        assert_eq!(Number::parse(b"-98"), Some(Number::from_i64(-98)));
        assert_eq!(Number::parse(b"0"), Some(Number::ZERO));
    }

    #[test]
    fn reals() {
        assert_eq!(Number::parse(b"34.5").unwrap().as_f64(), 34.5);
        assert_eq!(Number::parse(b"-.002").unwrap().as_f64(), -0.002);
        assert_eq!(Number::parse(b"4.").unwrap().as_f64(), 4.0);
        assert!(!Number::parse(b"4.").unwrap().is_integer());
    }

    #[test]
    fn lenient() {
        assert_eq!(Number::parse(b"--5"), Some(Number::from_i64(5)));
        assert_eq!(Number::parse(b"1.2.3").unwrap().as_f64(), 1.2);
        assert_eq!(Number::parse(b"-"), None);
    }
}
