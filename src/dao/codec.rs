//! Conversion between records and the bytes stored by a [`SaveStore`](super::save_store::SaveStore).
//!
//! Records are written as JSON text. Categories listed in the obfuscated set
//! additionally go through a keyed XOR pass, which only keeps casual readers
//! from editing the file by hand and provides no confidentiality.

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    dao::models::{Category, Record},
    error::PersistError,
};

/// Symmetric byte-wise XOR with a repeating key. Applying it twice is the identity.
#[derive(Debug, Clone)]
pub struct Obfuscator {
    key: Arc<[u8]>,
}

impl Obfuscator {
    /// Build an obfuscator from `key`; an empty key leaves bytes untouched.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: Arc::from(key.as_ref()),
        }
    }

    /// XOR `bytes` in place.
    pub fn apply(&self, bytes: &mut [u8]) {
        if self.key.is_empty() {
            return;
        }
        for (byte, key) in bytes.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= key;
        }
    }
}

/// Per-category serializer with optional obfuscation.
#[derive(Debug, Clone)]
pub struct SaveCodec {
    obfuscator: Obfuscator,
    obfuscated: BTreeSet<Category>,
}

impl SaveCodec {
    /// Obfuscate the `obfuscated` categories with `obfuscator`.
    pub fn new(obfuscator: Obfuscator, obfuscated: BTreeSet<Category>) -> Self {
        Self {
            obfuscator,
            obfuscated,
        }
    }

    /// Codec writing every category as cleartext JSON.
    pub fn cleartext() -> Self {
        Self::new(Obfuscator::new(b""), BTreeSet::new())
    }

    /// Whether payloads of `category` are XOR-obfuscated.
    pub fn is_obfuscated(&self, category: Category) -> bool {
        self.obfuscated.contains(&category)
    }

    /// Serialize `record` into the bytes persisted for its category.
    pub fn encode<T: Record>(&self, record: &T) -> Result<Vec<u8>, PersistError> {
        let mut bytes = serde_json::to_vec(record).map_err(|source| PersistError::Encode {
            category: T::CATEGORY,
            source,
        })?;
        if self.is_obfuscated(T::CATEGORY) {
            self.obfuscator.apply(&mut bytes);
        }
        Ok(bytes)
    }

    /// Decode bytes previously produced by [`SaveCodec::encode`] and normalize the record.
    pub fn decode<T: Record>(&self, mut bytes: Vec<u8>) -> Result<T, PersistError> {
        if self.is_obfuscated(T::CATEGORY) {
            self.obfuscator.apply(&mut bytes);
        }
        let text = String::from_utf8(bytes).map_err(|source| PersistError::Utf8 {
            category: T::CATEGORY,
            source,
        })?;
        let mut record: T = serde_json::from_str(&text).map_err(|source| PersistError::Decode {
            category: T::CATEGORY,
            source,
        })?;
        record.normalize();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{PlayerState, SettingsState};

    #[test]
    fn xor_is_its_own_inverse() {
        let obfuscator = Obfuscator::new("NamPhuThuy");
        let plain = b"{\"coin\":120,\"health\":4}".to_vec();
        let mut bytes = plain.clone();

        obfuscator.apply(&mut bytes);
        assert_ne!(bytes, plain);
        obfuscator.apply(&mut bytes);
        assert_eq!(bytes, plain);
    }

    #[test]
    fn empty_key_is_identity() {
        let mut bytes = b"plain".to_vec();
        Obfuscator::new("").apply(&mut bytes);
        assert_eq!(bytes, b"plain");
    }

    #[test]
    fn obfuscation_is_per_category() {
        let codec = SaveCodec::new(
            Obfuscator::new("NamPhuThuy"),
            BTreeSet::from([Category::Settings]),
        );

        let player = codec.encode(&PlayerState::default()).unwrap();
        let settings = codec.encode(&SettingsState::default()).unwrap();

        assert!(serde_json::from_slice::<serde_json::Value>(&player).is_ok());
        assert!(serde_json::from_slice::<serde_json::Value>(&settings).is_err());
        assert_eq!(
            codec.decode::<SettingsState>(settings).unwrap(),
            SettingsState::default()
        );
    }

    #[test]
    fn garbage_reports_decode_error() {
        let codec = SaveCodec::cleartext();
        let err = codec
            .decode::<PlayerState>(b"{\"coin\": \"lots\"".to_vec())
            .unwrap_err();
        assert!(matches!(
            err,
            PersistError::Decode {
                category: Category::Player,
                ..
            }
        ));
    }

    #[test]
    fn invalid_utf8_reports_utf8_error() {
        let codec = SaveCodec::cleartext();
        let err = codec
            .decode::<SettingsState>(vec![0xff, 0xfe, 0x00])
            .unwrap_err();
        assert!(matches!(err, PersistError::Utf8 { .. }));
    }
}
