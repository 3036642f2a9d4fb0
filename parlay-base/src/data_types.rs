//! Types used within Parlay and related functions.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structure that represents an unsigned scalar type.
///
/// Each scalar value corresponds to an unsigned integer modulo `modulus`,
/// i.e., an integer between `0` and `modulus` - 1.
///
/// If `modulus` is `None`, then numbers are to be understood as modulo 2<sup>64</sup>.
///
/// Supported scalar types are [UINT8], [UINT16], [UINT32] and [UINT64].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Hash)]
pub struct ScalarType {
    /// Provides an upper-bound on the scalar values.
    /// `None` value indicates a modulo 2<sup>64</sup> scalar value.
    pub modulus: Option<u64>,
}

/// Unsigned 8-bit scalar type.
pub const UINT8: ScalarType = ScalarType {
    modulus: Some(1 << 8),
};
/// Unsigned 16-bit scalar type.
pub const UINT16: ScalarType = ScalarType {
    modulus: Some(1 << 16),
};
/// Unsigned 32-bit scalar type.
pub const UINT32: ScalarType = ScalarType {
    modulus: Some(1 << 32),
};
/// Unsigned 64-bit scalar type.
pub const UINT64: ScalarType = ScalarType { modulus: None };

impl ScalarType {
    /// Tests whether a scalar type is supported.
    ///
    /// # Returns
    ///
    /// `true` if the scalar type is one of [UINT8], [UINT16], [UINT32], [UINT64], `false` otherwise
    pub fn is_valid(&self) -> bool {
        matches!(*self, UINT8 | UINT16 | UINT32 | UINT64)
    }

    /// Returns the upper-bound on the values of this scalar type, `None` meaning 2<sup>64</sup>.
    pub fn get_modulus(&self) -> Option<u64> {
        self.modulus
    }

    /// Returns the number of bits needed to represent a value of this scalar type.
    pub fn size_in_bits(&self) -> u64 {
        match self.modulus {
            Some(m) => (64 - (m - 1).leading_zeros()) as u64,
            None => 64,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "u{}", self.size_in_bits())
    }
}

/// Visibility of a value with respect to the parties of the computation.
///
/// `Secret` values are contributed by one party and hidden from the others
/// during computation; `Public` values are known to everyone.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Hash)]
pub enum Visibility {
    Public,
    Secret,
}

impl Visibility {
    /// Returns the visibility of a value derived from two operands.
    ///
    /// The result is `Secret` if either operand is secret.
    pub fn combine(self, other: Visibility) -> Visibility {
        if self == Visibility::Secret || other == Visibility::Secret {
            Visibility::Secret
        } else {
            Visibility::Public
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Secret => write!(f, "secret"),
        }
    }
}

/// A scalar type together with its visibility.
///
/// This is the type attached to every node of a computation graph.
///
/// # Example
///
/// ```
/// # use parlay_base::data_types::{secret_scalar_type, UINT64};
/// let t = secret_scalar_type(UINT64);
/// assert_eq!("secret u64", t.to_string());
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Hash)]
pub struct Type {
    pub scalar: ScalarType,
    pub visibility: Visibility,
}

impl Type {
    pub fn is_valid(&self) -> bool {
        self.scalar.is_valid()
    }

    pub fn get_scalar_type(&self) -> ScalarType {
        self.scalar
    }

    pub fn get_visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_secret(&self) -> bool {
        self.visibility == Visibility::Secret
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.visibility, self.scalar)
    }
}

/// Returns a new secret type with a given scalar type.
///
/// # Arguments
///
/// `st` - scalar type
///
/// # Returns
///
/// New secret type
pub fn secret_scalar_type(st: ScalarType) -> Type {
    Type {
        scalar: st,
        visibility: Visibility::Secret,
    }
}

/// Returns a new public type with a given scalar type.
///
/// # Arguments
///
/// `st` - scalar type
///
/// # Returns
///
/// New public type
pub fn public_scalar_type(st: ScalarType) -> Type {
    Type {
        scalar: st,
        visibility: Visibility::Public,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_validity() {
        assert!(UINT8.is_valid());
        assert!(UINT16.is_valid());
        assert!(UINT32.is_valid());
        assert!(UINT64.is_valid());
        assert!(!ScalarType { modulus: Some(100) }.is_valid());
        assert!(!ScalarType { modulus: Some(2) }.is_valid());
    }

    #[test]
    fn test_scalar_type_size() {
        assert_eq!(UINT8.size_in_bits(), 8);
        assert_eq!(UINT16.size_in_bits(), 16);
        assert_eq!(UINT32.size_in_bits(), 32);
        assert_eq!(UINT64.size_in_bits(), 64);
    }

    #[test]
    fn test_display() {
        assert_eq!(UINT8.to_string(), "u8");
        assert_eq!(UINT64.to_string(), "u64");
        assert_eq!(secret_scalar_type(UINT64).to_string(), "secret u64");
        assert_eq!(public_scalar_type(UINT32).to_string(), "public u32");
    }

    #[test]
    fn test_visibility_combine() {
        assert_eq!(
            Visibility::Public.combine(Visibility::Public),
            Visibility::Public
        );
        assert_eq!(
            Visibility::Public.combine(Visibility::Secret),
            Visibility::Secret
        );
        assert_eq!(
            Visibility::Secret.combine(Visibility::Public),
            Visibility::Secret
        );
        assert_eq!(
            Visibility::Secret.combine(Visibility::Secret),
            Visibility::Secret
        );
    }
}
