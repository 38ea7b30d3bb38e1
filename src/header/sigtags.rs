use num_derive::FromPrimitive;
use strum_macros::Display;

use super::RpmTag;

/// Tags of the signature header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, Display)]
pub enum SignatureTag {
    HeaderSignatures = 62,
    Immutable = 63,
    I18nTable = 100,
    Rsa = 268,
    Sha1Header = 269,
    Sha256Header = 273,
    HeaderAndPayloadSize = 1000,
    Md5 = 1004,
    Gpg = 1005,
    UncompressedPayloadSize = 1007,
    ReservedSpace = 1008,
}

impl RpmTag for SignatureTag {
    fn code(self) -> i32 {
        self as i32
    }
}
