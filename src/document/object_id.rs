use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// 5-byte per-process random component, fixed for the process lifetime.
static PROCESS_RANDOM: Lazy<[u8; 5]> = Lazy::new(|| {
    let mut bytes = [0u8; 5];
    OsRng.fill_bytes(&mut bytes);
    bytes
});

// 3-byte counter seeded randomly so ids from different processes diverge.
static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(OsRng.gen::<u32>() & 0x00FF_FFFF));

/// A 12-byte document identifier.
///
/// Generated ids carry a 4-byte big-endian UNIX timestamp in seconds, a
/// 5-byte per-process random value, and a 3-byte incrementing counter
/// seeded randomly at startup. Ids generated within one process are unique
/// and roughly time-ordered.
///
/// # Examples
///
/// ```rust,ignore
/// use ferrite::document::ObjectId;
///
/// let id = ObjectId::new();
/// assert_eq!(id.to_string().len(), 24); // hex encoded
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a fresh object id.
    pub fn new() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) & 0x00FF_FFFF;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_RANDOM);
        bytes[9] = (counter >> 16) as u8;
        bytes[10] = (counter >> 8) as u8;
        bytes[11] = counter as u8;

        ObjectId(bytes)
    }

    /// Creates an object id from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Returns the raw bytes of this id.
    pub fn bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Returns the embedded timestamp in UNIX seconds.
    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId(\"{}\")", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_ids() {
        let mut ids = Vec::new();
        for _ in 0..1000 {
            ids.push(ObjectId::new());
        }

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn embeds_current_timestamp() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        let id = ObjectId::new();
        let after = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        assert!(id.seconds() >= before);
        assert!(id.seconds() <= after);
    }

    #[test]
    fn displays_as_hex() {
        let id = ObjectId::from_bytes([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 255]);
        assert_eq!(id.to_string(), "000102030405060708090aff");
    }

    #[test]
    fn round_trips_bytes() {
        let id = ObjectId::new();
        let copy = ObjectId::from_bytes(*id.bytes());
        assert_eq!(id, copy);
    }

    #[test]
    fn concurrent_generation_stays_unique() {
        use std::thread;

        let mut handles = vec![];
        for _ in 0..8 {
            handles.push(thread::spawn(|| {
                let mut ids = Vec::new();
                for _ in 0..500 {
                    ids.push(ObjectId::new());
                }
                ids
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let mut unique = all.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(all.len(), unique.len());
    }
}
