//! HTTP verbs and verb masks.
//!
//! Every verb owns one bit. The listener contract and the handler-facing
//! types share this layout, so a request verb can be tested against a
//! route's mask without any translation.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// HTTP request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum HttpVerb {
    /// GET method
    Get = 1 << 0,
    /// POST method
    Post = 1 << 1,
    /// PUT method
    Put = 1 << 2,
    /// PATCH method
    Patch = 1 << 3,
    /// DELETE method
    Delete = 1 << 4,
    /// OPTIONS method
    Options = 1 << 5,
}

impl HttpVerb {
    /// All verbs in bit order.
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
    ];

    /// Parses a verb from a string, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Returns the verb as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// The bit this verb occupies in a [`VerbMask`].
    pub fn bit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A set of HTTP verbs stored as a bitset.
///
/// Serializes as a list of verb names, e.g. `["GET","POST"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<HttpVerb>", into = "Vec<HttpVerb>")]
pub struct VerbMask(u8);

impl VerbMask {
    /// The empty mask.
    pub const NONE: Self = Self(0);
    /// `GET` only.
    pub const GET: Self = Self(HttpVerb::Get as u8);
    /// `POST` only.
    pub const POST: Self = Self(HttpVerb::Post as u8);
    /// `PUT` only.
    pub const PUT: Self = Self(HttpVerb::Put as u8);
    /// `PATCH` only.
    pub const PATCH: Self = Self(HttpVerb::Patch as u8);
    /// `DELETE` only.
    pub const DELETE: Self = Self(HttpVerb::Delete as u8);
    /// `OPTIONS` only.
    pub const OPTIONS: Self = Self(HttpVerb::Options as u8);
    /// Every known verb.
    pub const ALL: Self = Self(0b0011_1111);

    /// Builds a mask from raw bits, dropping bits no verb owns.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if no verb is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if `verb` is in the mask.
    pub const fn contains(self, verb: HttpVerb) -> bool {
        self.0 & (verb as u8) != 0
    }

    /// Iterates over the verbs in the mask, in bit order.
    pub fn iter(self) -> impl Iterator<Item = HttpVerb> {
        HttpVerb::ALL.into_iter().filter(move |v| self.contains(*v))
    }
}

impl From<HttpVerb> for VerbMask {
    fn from(verb: HttpVerb) -> Self {
        Self(verb.bit())
    }
}

impl BitOr for VerbMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<HttpVerb> for VerbMask {
    type Output = Self;

    fn bitor(self, rhs: HttpVerb) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl BitOr for HttpVerb {
    type Output = VerbMask;

    fn bitor(self, rhs: Self) -> VerbMask {
        VerbMask(self.bit() | rhs.bit())
    }
}

impl BitOrAssign for VerbMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<HttpVerb> for VerbMask {
    fn from_iter<I: IntoIterator<Item = HttpVerb>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |mask, verb| mask | verb)
    }
}

impl From<Vec<HttpVerb>> for VerbMask {
    fn from(verbs: Vec<HttpVerb>) -> Self {
        verbs.into_iter().collect()
    }
}

impl From<VerbMask> for Vec<HttpVerb> {
    fn from(mask: VerbMask) -> Self {
        mask.iter().collect()
    }
}

impl fmt::Display for VerbMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names: Vec<&str> = self.iter().map(|v| v.as_str()).collect();
        write!(f, "{}", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_parsing() {
        assert_eq!(HttpVerb::parse("GET"), Some(HttpVerb::Get));
        assert_eq!(HttpVerb::parse("patch"), Some(HttpVerb::Patch));
        assert_eq!(HttpVerb::parse("TRACE"), None);
    }

    #[test]
    fn test_bit_layout() {
        assert_eq!(HttpVerb::Get.bit(), 0b1);
        assert_eq!(HttpVerb::Post.bit(), 0b10);
        assert_eq!(HttpVerb::Delete.bit(), 0b1_0000);
        assert_eq!(VerbMask::ALL.iter().count(), HttpVerb::ALL.len());
    }

    #[test]
    fn test_mask_union() {
        let mask = VerbMask::GET | VerbMask::POST;
        assert!(mask.contains(HttpVerb::Get));
        assert!(mask.contains(HttpVerb::Post));
        assert!(!mask.contains(HttpVerb::Delete));
        assert_eq!(mask, HttpVerb::Post | HttpVerb::Get);
    }

    #[test]
    fn test_mask_merge_order_independent() {
        let mut a = VerbMask::GET;
        a |= VerbMask::POST;
        let mut b = VerbMask::POST;
        b |= VerbMask::GET;
        assert_eq!(a, b);
    }

    #[test]
    fn test_truncate_unknown_bits() {
        let mask = VerbMask::from_bits_truncate(0xFF);
        assert_eq!(mask, VerbMask::ALL);
        assert!(VerbMask::NONE.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!((VerbMask::GET | VerbMask::DELETE).to_string(), "GET|DELETE");
        assert_eq!(VerbMask::NONE.to_string(), "NONE");
    }

    #[test]
    fn test_serde_as_verb_list() {
        let mask = VerbMask::GET | VerbMask::PUT;
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, r#"["GET","PUT"]"#);

        let parsed: VerbMask = serde_json::from_str(r#"["POST","DELETE"]"#).unwrap();
        assert_eq!(parsed, VerbMask::POST | VerbMask::DELETE);
    }
}
