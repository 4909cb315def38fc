//! Branded id newtypes.
//!
//! Console-side identifiers are 64-bit values. Each gets a distinct newtype
//! so a session id can never be passed where a player id is expected. On the
//! JSON side they travel as 16-digit upper-case hex strings, which is what
//! the backend keys its resources by.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw value.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw 64-bit value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Zero is never a valid id.
            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }

            /// Hex form used in backend resource paths.
            #[must_use]
            pub fn to_hex(self) -> String {
                format!("{:016X}", self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016X}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.trim_start_matches("0x").trim_start_matches("0X");
                u64::from_str_radix(digits, 16).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(HexIdVisitor).map(Self)
            }
        }
    };
}

/// Accepts either a hex string or a plain JSON number.
struct HexIdVisitor;

impl Visitor<'_> for HexIdVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex string or unsigned integer id")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative id {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        let digits = v.trim_start_matches("0x").trim_start_matches("0X");
        u64::from_str_radix(digits, 16).map_err(|e| E::custom(format!("bad id {v:?}: {e}")))
    }
}

numeric_id! {
    /// Player account identifier.
    Xuid
}

numeric_id! {
    /// Multiplayer session identifier.
    SessionId
}

numeric_id! {
    /// Console identity, used to group members by machine for arbitration.
    MachineId
}

impl Xuid {
    /// Online accounts carry `0x0009` in the top 16 bits.
    #[must_use]
    pub const fn is_online(self) -> bool {
        self.0 >> 48 == 0x0009
    }

    /// Offline (local-only) accounts carry `0xE` in the top nibble.
    #[must_use]
    pub const fn is_offline(self) -> bool {
        self.0 >> 60 == 0xE
    }
}

impl SessionId {
    /// Tag byte carried by locally generated session ids.
    pub const LOCAL_TAG: u64 = 0xAE00_0000_0000_0000;

    /// Generate a random id carrying [`Self::LOCAL_TAG`] in its top byte.
    #[must_use]
    pub fn generate() -> Self {
        let low: u64 = rand::random::<u64>() & 0x00FF_FFFF_FFFF_FFFF;
        Self(Self::LOCAL_TAG | low.max(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MacAddress
// ─────────────────────────────────────────────────────────────────────────────

/// Link-layer address of a peer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Whether every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(format!("expected 6 octets in {s:?}"));
        }
        let mut out = [0u8; 6];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = u8::from_str_radix(part, 16).map_err(|e| format!("bad octet {part:?}: {e}"))?;
        }
        Ok(Self(out))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
