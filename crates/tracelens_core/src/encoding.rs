//! Canonical encoding for content addressing.
//!
//! Uses postcard for byte-stable encoding. Two values that compare equal
//! encode to the same bytes, which is what makes fingerprints stable.

use crate::error::Result;
use crate::hash::Hash;
use serde::Serialize;

/// Trait for canonical serialization
pub trait CanonicalEncode: Serialize {
    /// Encode to canonical bytes
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidEncoding`] if the value cannot be serialized
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// BLAKE3 hash of the canonical encoding
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidEncoding`] if the value cannot be serialized
    fn content_hash(&self) -> Result<Hash> {
        Ok(Hash::compute(&self.encode()?))
    }
}

impl<T: Serialize + ?Sized> CanonicalEncode for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    struct Record {
        index: u64,
        name: String,
        data: Vec<u8>,
    }

    #[test]
    fn test_encode_is_stable() {
        let record = Record {
            index: 7,
            name: "glDrawArrays".to_string(),
            data: vec![1, 2, 3],
        };
        assert_eq!(record.encode().unwrap(), record.clone().encode().unwrap());
        assert_eq!(
            record.content_hash().unwrap(),
            Hash::compute(&record.encode().unwrap())
        );
    }

    #[test]
    fn test_postcard_error_maps_to_invalid_encoding() {
        let err: Error = postcard::Error::SerializeBufferFull.into();
        assert!(matches!(err, Error::InvalidEncoding { .. }));
    }

    proptest! {
        #[test]
        fn prop_equal_values_hash_equal(index: u64, name: String, data: Vec<u8>) {
            let a = Record { index, name: name.clone(), data: data.clone() };
            let b = Record { index, name, data };
            prop_assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
        }

        #[test]
        fn prop_distinct_index_hash_distinct(a: u64, b: u64, name: String) {
            prop_assume!(a != b);
            let left = Record { index: a, name: name.clone(), data: Vec::new() };
            let right = Record { index: b, name, data: Vec::new() };
            prop_assert_ne!(left.content_hash().unwrap(), right.content_hash().unwrap());
        }
    }
}
