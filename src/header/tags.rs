use num_derive::FromPrimitive;
use strum_macros::Display;

use super::RpmTag;

/// Tags of the package metadata header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, Display)]
pub enum Tag {
    HeaderSignatures = 62,
    Immutable = 63,
    I18nTable = 100,
    Name = 1000,
    Version = 1001,
    Release = 1002,
    Summary = 1004,
    Description = 1005,
    BuildTime = 1006,
    BuildHost = 1007,
    InstalledSize = 1009,
    Vendor = 1011,
    License = 1014,
    Packager = 1015,
    Group = 1016,
    Url = 1020,
    OperatingSystem = 1021,
    Architecture = 1022,
    Prein = 1023,
    Postin = 1024,
    Preun = 1025,
    Postun = 1026,
    FileSizes = 1028,
    FileModes = 1030,
    DeviceFileIds = 1033,
    FileModificationTimestamp = 1034,
    FileDigests = 1035,
    FileLinkTos = 1036,
    FileFlags = 1037,
    FileUserName = 1039,
    FileGroupName = 1040,
    SourceRpm = 1044,
    FileVerifyFlags = 1045,
    ProvideName = 1047,
    RequireFlags = 1048,
    RequireName = 1049,
    RequireVersion = 1050,
    ConflictFlags = 1053,
    ConflictName = 1054,
    ConflictVersion = 1055,
    RpmVersion = 1064,
    ChangelogTimestamp = 1080,
    ChangelogName = 1081,
    ChangelogText = 1082,
    PreinProg = 1085,
    PostinProg = 1086,
    PreunProg = 1087,
    PostunProg = 1088,
    FileDevices = 1095,
    FileInode = 1096,
    FileLang = 1097,
    Prefixes = 1098,
    ProvideFlags = 1112,
    ProvideVersion = 1113,
    DirectoryNameIndices = 1116,
    BaseNames = 1117,
    DirectoryNames = 1118,
    PayloadFormat = 1124,
    PayloadCompressor = 1125,
    PayloadCompressorLevel = 1126,
    Platform = 1132,
    FileColors = 1140,
    FileClass = 1141,
    FileClassDictionary = 1142,
    FileDigestAlgorithm = 5011,
    Encoding = 5062,
    CompressedPayloadDigest = 5092,
    PayloadDigestAlgorithm = 5093,
    UncompressedPayloadDigest = 5097,
}

impl RpmTag for Tag {
    fn code(self) -> i32 {
        self as i32
    }
}
