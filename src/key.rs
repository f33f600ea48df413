use std::hash::Hash;
use std::sync::Arc;

/// A key type usable with the engine.
///
/// Mirrors the Go source's `BitcaskKey` constraint (`comparable` + `Serializable`): a
/// key must be cheaply comparable and have a total, deterministic, injective byte
/// encoding so that distinct keys never collide in the on-disk log or the in-memory
/// key directory.
pub trait BitcaskKey: Clone + Eq + Hash + Send + Sync + 'static {
    /// Serializes the key to its canonical byte representation.
    ///
    /// Must be total, deterministic, and injective: distinct keys produce distinct
    /// byte sequences.
    fn serialize(&self) -> Vec<u8>;
}

impl BitcaskKey for String {
    fn serialize(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl BitcaskKey for Vec<u8> {
    fn serialize(&self) -> Vec<u8> {
        self.clone()
    }
}

/// Maps a segment's raw key bytes back to a typed key.
///
/// Injected by the caller (the binding layer owns key typing), used only during
/// merge and reload when the engine needs to materialize a `K` from bytes read off
/// disk.
pub type KeyMapper<K> = Arc<dyn Fn(&[u8]) -> K + Send + Sync>;

/// Builds a [`KeyMapper`] for `String` keys out of UTF-8 bytes.
///
/// Lossy on invalid UTF-8 (mirrors `string(b)` conversions in the original Go code,
/// which never validates either).
pub fn string_key_mapper() -> KeyMapper<String> {
    Arc::new(|bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_key_serializes_to_its_utf8_bytes() {
        let key = String::from("topic");
        assert_eq!(key.serialize(), b"topic".to_vec());
    }

    #[test]
    fn string_key_mapper_round_trips_through_serialize() {
        let mapper = string_key_mapper();
        let key = String::from("disk type");
        let mapped = mapper(&key.serialize());
        assert_eq!(mapped, key);
    }
}
