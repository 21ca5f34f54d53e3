// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fallible conversion of raw inputs into observations

use crate::error::ValueError;
use std::fmt::Debug;

/// A raw input that may or may not hold a finite number
pub trait BandValue: Debug {
    fn to_band_value(&self) -> Result<f64, ValueError>;
}

#[inline]
fn finite(value: f64) -> Result<f64, ValueError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValueError::NotFinite(value))
    }
}

impl BandValue for f64 {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        finite(*self)
    }
}

impl BandValue for f32 {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        finite(*self as f64)
    }
}

macro_rules! impl_band_value_int {
    ($($t:ty),*) => {
        $(
            impl BandValue for $t {
                fn to_band_value(&self) -> Result<f64, ValueError> {
                    Ok(*self as f64)
                }
            }
        )*
    };
}

impl_band_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl BandValue for str {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        let parsed: f64 = self
            .trim()
            .parse()
            .map_err(|_| ValueError::NotNumeric(self.to_string()))?;
        finite(parsed)
    }
}

impl BandValue for String {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        self.as_str().to_band_value()
    }
}

impl BandValue for serde_json::Value {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        use serde_json::Value;

        match self {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ValueError::NotNumeric(n.to_string()))
                .and_then(finite),
            Value::String(s) => s.to_band_value(),
            Value::Null => Err(ValueError::Missing),
            other => Err(ValueError::NotNumeric(other.to_string())),
        }
    }
}

impl<T: BandValue + ?Sized> BandValue for &T {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        (**self).to_band_value()
    }
}

impl<T: BandValue> BandValue for Option<T> {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        match self {
            Some(inner) => inner.to_band_value(),
            None => Err(ValueError::Missing),
        }
    }
}

impl<T: BandValue, E: Debug + std::fmt::Display> BandValue for Result<T, E> {
    fn to_band_value(&self) -> Result<f64, ValueError> {
        match self {
            Ok(inner) => inner.to_band_value(),
            Err(e) => Err(ValueError::Extraction(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers() {
        assert_eq!(5.5f64.to_band_value(), Ok(5.5));
        assert_eq!(7i64.to_band_value(), Ok(7.0));
        assert_eq!(3u32.to_band_value(), Ok(3.0));
        assert!(f64::NAN.to_band_value().is_err(), "NaN must be rejected");
        assert_eq!(
            f64::INFINITY.to_band_value(),
            Err(ValueError::NotFinite(f64::INFINITY))
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(" 42.5 ".to_band_value(), Ok(42.5));
        assert_eq!("1e3".to_string().to_band_value(), Ok(1000.0));
        assert_eq!(
            "abc".to_band_value(),
            Err(ValueError::NotNumeric("abc".to_string()))
        );
        assert!("inf".to_band_value().is_err());
        assert!("NaN".to_band_value().is_err());
    }

    #[test]
    fn test_json() {
        assert_eq!(json!(5).to_band_value(), Ok(5.0));
        assert_eq!(json!(-1.25).to_band_value(), Ok(-1.25));
        assert_eq!(json!("6").to_band_value(), Ok(6.0));
        assert_eq!(json!(null).to_band_value(), Err(ValueError::Missing));
        assert!(json!(true).to_band_value().is_err());
        assert!(json!([1]).to_band_value().is_err());
        assert!(json!({"a": 1}).to_band_value().is_err());
    }

    #[test]
    fn test_option_and_result() {
        let missing: Option<f64> = None;
        assert_eq!(missing.to_band_value(), Err(ValueError::Missing));
        assert_eq!(Some(2.0).to_band_value(), Ok(2.0));

        let failed: Result<f64, String> = Err("no field".to_string());
        assert_eq!(
            failed.to_band_value(),
            Err(ValueError::Extraction("no field".to_string()))
        );
    }
}
