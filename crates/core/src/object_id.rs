//! 12-byte object identifiers
//!
//! Layout (big-endian):
//! - bytes 0..4: seconds since the Unix epoch at generation time
//! - bytes 4..9: per-process random value
//! - bytes 9..12: counter, seeded randomly and incremented per id
//!
//! Ids generated in the same process therefore sort by creation second and
//! then by generation order within that second (until the 24-bit counter wraps).

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const COUNTER_MASK: u32 = 0x00FF_FFFF;

fn process_unique() -> &'static ([u8; 5], AtomicU32) {
    static STATE: OnceLock<([u8; 5], AtomicU32)> = OnceLock::new();
    STATE.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let bytes: [u8; 5] = rng.gen();
        let seed = rng.gen::<u32>() & COUNTER_MASK;
        (bytes, AtomicU32::new(seed))
    })
}

/// A 12-byte identifier, ordered bytewise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a new, process-unique id
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let (random, counter) = process_unique();
        let count = counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(random);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        ObjectId(bytes)
    }

    /// Wrap raw bytes
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Raw bytes
    pub const fn to_bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Seconds component embedded in the id
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    /// Parse a 24-character hexadecimal string
    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 24 || !s.is_ascii() {
            return Err(Error::InvalidInput(format!(
                "ObjectId must be 24 hex characters, got {:?}",
                s
            )));
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| Error::InvalidInput(format!("invalid hex in ObjectId: {:?}", s)))?;
        }
        Ok(ObjectId(bytes))
    }
}
