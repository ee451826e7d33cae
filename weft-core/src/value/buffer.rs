//! Fixed-layout numeric buffers.
//!
//! Elements are kept as `f64` after being coerced to the element kind, so a
//! `Uint8` buffer only ever holds integers in `0..=255`.

/// Element type of a numeric buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Int8,
    Uint8,
    /// Bytes that saturate instead of wrapping.
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl BufferKind {
    /// Convert an arbitrary number to what an element of this kind stores.
    pub fn coerce(self, value: f64) -> f64 {
        match self {
            Self::Int8 => wrap_integer(value, 8, true),
            Self::Uint8 => wrap_integer(value, 8, false),
            Self::Uint8Clamped => clamp_byte(value),
            Self::Int16 => wrap_integer(value, 16, true),
            Self::Uint16 => wrap_integer(value, 16, false),
            Self::Int32 => wrap_integer(value, 32, true),
            Self::Uint32 => wrap_integer(value, 32, false),
            Self::Float32 => value as f32 as f64,
            Self::Float64 => value,
        }
    }
}

/// Truncate, then reduce modulo 2^bits, reinterpreting as signed if asked.
fn wrap_integer(value: f64, bits: u32, signed: bool) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let modulus = 2f64.powi(bits as i32);
    let wrapped = value.trunc().rem_euclid(modulus);
    if signed && wrapped >= modulus / 2.0 {
        wrapped - modulus
    } else {
        wrapped
    }
}

/// Clamp to `0..=255`, rounding halves to even.
fn clamp_byte(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let clamped = value.clamp(0.0, 255.0);
    let floor = clamped.floor();
    let diff = clamped - floor;
    if diff > 0.5 || (diff == 0.5 && floor % 2.0 != 0.0) {
        floor + 1.0
    } else {
        floor
    }
}

/// A fixed-length buffer of numbers of a single element kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericBuffer {
    kind: BufferKind,
    data: Vec<f64>,
}

impl NumericBuffer {
    /// A buffer of `len` zeros.
    pub fn zeroed(kind: BufferKind, len: usize) -> Self {
        Self {
            kind,
            data: vec![0.0; len],
        }
    }

    /// A buffer holding `values`, each coerced to `kind`.
    pub fn from_values<I>(kind: BufferKind, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self {
            kind,
            data: values.into_iter().map(|v| kind.coerce(v)).collect(),
        }
    }

    /// Element kind.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The element at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.data.get(index).copied()
    }

    /// Store a coerced value and return what was there before, or `None` if
    /// `index` is outside the buffer.
    pub fn set(&mut self, index: usize, value: f64) -> Option<f64> {
        let kind = self.kind;
        self.data
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, kind.coerce(value)))
    }

    /// The stored elements.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_kinds_wrap() {
        assert_eq!(BufferKind::Uint8.coerce(256.0), 0.0);
        assert_eq!(BufferKind::Uint8.coerce(-1.0), 255.0);
        assert_eq!(BufferKind::Int8.coerce(128.0), -128.0);
        assert_eq!(BufferKind::Int16.coerce(3.9), 3.0);
        assert_eq!(BufferKind::Uint32.coerce(-1.0), 4_294_967_295.0);
        assert_eq!(BufferKind::Int32.coerce(f64::NAN), 0.0);
    }

    #[test]
    fn clamped_bytes_saturate_and_round_to_even() {
        assert_eq!(BufferKind::Uint8Clamped.coerce(300.0), 255.0);
        assert_eq!(BufferKind::Uint8Clamped.coerce(-5.0), 0.0);
        assert_eq!(BufferKind::Uint8Clamped.coerce(1.5), 2.0);
        assert_eq!(BufferKind::Uint8Clamped.coerce(2.5), 2.0);
        assert_eq!(BufferKind::Uint8Clamped.coerce(2.6), 3.0);
    }

    #[test]
    fn floats_round_through_f32() {
        assert_eq!(BufferKind::Float32.coerce(0.1), 0.1f32 as f64);
        assert_eq!(BufferKind::Float64.coerce(0.1), 0.1);
    }

    #[test]
    fn set_reports_previous_value_and_bounds() {
        let mut buffer = NumericBuffer::zeroed(BufferKind::Uint8, 2);
        assert_eq!(buffer.set(1, 7.0), Some(0.0));
        assert_eq!(buffer.set(1, 263.0), Some(7.0));
        assert_eq!(buffer.get(1), Some(7.0));
        assert_eq!(buffer.set(2, 1.0), None);
        assert_eq!(buffer.as_slice(), &[0.0, 7.0]);
    }
}
