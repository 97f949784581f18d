//! File classification: suffix → [`FileType`], plus parsing of operator-supplied
//! type and processor names.
//!
//! Classification from a suffix is speculative and always succeeds, falling
//! back to [`FileType::Other`]. Parsing an explicit name is not: an unknown name
//! is a [`ValidationError`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Content type of a released file, carrying the numeric code the release
/// service expects in its `type_id` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileType {
    DebianPackage,
    BinaryRedhatPackage,
    DosExe,
    Windows16BitExe,
    Windows32BitExe,
    Os2Exe,
    Jar,
    Macbinary,
    PalmResourceDatabase,
    BinaryZip,
    BinaryBzip2,
    BinaryGzip,
    Stuffit,
    Nodeball,
    Dmg,
    Iso,
    SourceZip,
    SourceBz2,
    SourceGzip,
    SourceZ,
    SourceRedhatPackage,
    OtherSource,
    SourcePatchOrDiff,
    JpegImage,
    Text,
    Html,
    Pdf,
    #[default]
    Other,
}

/// Target processor of a released file (`processor_id` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessorType {
    I386,
    Ppc,
    Mips,
    Sparc,
    Ultrasparc,
    Ia64,
    Alpha,
    #[default]
    Any,
    PlatformIndependent,
}

// (name, variant, code). Names are the normalised upper-case identifiers.
const FILE_TYPES: &[(&str, FileType, u32)] = &[
    ("DEBIAN_PACKAGE", FileType::DebianPackage, 1000),
    ("BINARY_REDHAT_PACKAGE", FileType::BinaryRedhatPackage, 2000),
    ("DOS_EXE", FileType::DosExe, 2500),
    ("WINDOWS_16_BIT_EXE", FileType::Windows16BitExe, 2501),
    ("WINDOWS_32_BIT_EXE", FileType::Windows32BitExe, 2502),
    ("OS2_EXE", FileType::Os2Exe, 2600),
    ("JAR", FileType::Jar, 2601),
    ("MACBINARY", FileType::Macbinary, 2650),
    ("PALM_RESOURCE_DATABASE", FileType::PalmResourceDatabase, 2700),
    ("BINARY_ZIP", FileType::BinaryZip, 3000),
    ("BINARY_BZIP2", FileType::BinaryBzip2, 3001),
    ("BINARY_GZIP", FileType::BinaryGzip, 3002),
    ("STUFFIT", FileType::Stuffit, 3003),
    ("NODEBALL", FileType::Nodeball, 3004),
    ("DMG", FileType::Dmg, 3005),
    ("ISO", FileType::Iso, 3006),
    ("SOURCE_ZIP", FileType::SourceZip, 5000),
    ("SOURCE_BZ2", FileType::SourceBz2, 5001),
    ("SOURCE_GZIP", FileType::SourceGzip, 5002),
    ("SOURCE_Z", FileType::SourceZ, 5003),
    ("SOURCE_REDHAT_PACKAGE", FileType::SourceRedhatPackage, 5100),
    ("OTHER_SOURCE", FileType::OtherSource, 5900),
    ("SOURCE_PATCH_OR_DIFF", FileType::SourcePatchOrDiff, 5901),
    ("JPEG_IMAGE", FileType::JpegImage, 8000),
    ("TEXT", FileType::Text, 8001),
    ("HTML", FileType::Html, 8002),
    ("PDF", FileType::Pdf, 8003),
    ("OTHER", FileType::Other, 9999),
];

const PROCESSOR_TYPES: &[(&str, ProcessorType, u32)] = &[
    ("I386", ProcessorType::I386, 1000),
    ("PPC", ProcessorType::Ppc, 2000),
    ("MIPS", ProcessorType::Mips, 3000),
    ("SPARC", ProcessorType::Sparc, 4000),
    ("ULTRASPARC", ProcessorType::Ultrasparc, 5000),
    ("IA64", ProcessorType::Ia64, 6000),
    ("ALPHA", ProcessorType::Alpha, 7000),
    ("ANY", ProcessorType::Any, 8000),
    ("PLATFORM_INDEPENDENT", ProcessorType::PlatformIndependent, 8500),
];

const SUFFIXES: &[(&str, FileType)] = &[
    ("deb", FileType::DebianPackage),
    ("rpm", FileType::BinaryRedhatPackage),
    ("zip", FileType::BinaryZip),
    ("bz2", FileType::BinaryBzip2),
    ("gz", FileType::BinaryGzip),
    ("tgz", FileType::BinaryGzip),
    ("jpg", FileType::JpegImage),
    ("jpeg", FileType::JpegImage),
    ("txt", FileType::Text),
    ("text", FileType::Text),
    ("htm", FileType::Html),
    ("html", FileType::Html),
    ("pdf", FileType::Pdf),
    ("sit", FileType::Stuffit),
    ("nbz", FileType::Nodeball),
    ("exe", FileType::Windows32BitExe),
    ("dmg", FileType::Dmg),
    ("jar", FileType::Jar),
    ("diff", FileType::SourcePatchOrDiff),
    ("patch", FileType::SourcePatchOrDiff),
    ("prc", FileType::PalmResourceDatabase),
    ("iso", FileType::Iso),
    ("z", FileType::SourceZ),
    ("bin", FileType::Macbinary),
];

/// Classifies a file by the suffix of its base name.
///
/// The suffix is whatever follows the last `.`, compared case-insensitively.
/// A name ending in `.`, a name without a `.`, or an unknown suffix all
/// classify as [`FileType::Other`].
pub fn classify(base_name: &str) -> FileType {
    let Some(idx) = base_name.rfind('.') else {
        return FileType::Other;
    };
    let suffix = &base_name[idx + 1..];
    if suffix.is_empty() {
        return FileType::Other;
    }
    SUFFIXES
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(suffix))
        .map(|(_, t)| *t)
        .unwrap_or(FileType::Other)
}

/// Upper-cases, trims, turns spaces into underscores and strips `suffix`.
fn normalise_name(raw: &str, suffix: &str) -> String {
    let upper = raw.trim().replace(' ', "_").to_ascii_uppercase();
    match upper.strip_suffix(suffix) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => upper,
    }
}

impl FileType {
    /// Parses a free-form type name such as `"text"`, `"Binary Zip"` or
    /// `"SOURCE_GZIP_FILE"`.
    pub fn parse_name(raw: &str) -> Result<Self, ValidationError> {
        let wanted = normalise_name(raw, "_FILE");
        FILE_TYPES
            .iter()
            .find(|(name, _, _)| *name == wanted)
            .map(|(_, t, _)| *t)
            .ok_or_else(|| ValidationError::UnknownFileType(raw.to_string()))
    }

    pub fn code(self) -> u32 {
        FILE_TYPES
            .iter()
            .find(|(_, t, _)| *t == self)
            .map(|(_, _, c)| *c)
            .unwrap_or(9999)
    }

    pub fn from_code(code: u32) -> Option<Self> {
        FILE_TYPES
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(_, t, _)| *t)
    }
}

impl ProcessorType {
    /// Parses a free-form processor name such as `"i386"`, `"any"` or
    /// `"Platform Independent"`.
    pub fn parse_name(raw: &str) -> Result<Self, ValidationError> {
        let wanted = normalise_name(raw, "_PROCESSOR");
        PROCESSOR_TYPES
            .iter()
            .find(|(name, _, _)| *name == wanted)
            .map(|(_, p, _)| *p)
            .ok_or_else(|| ValidationError::UnknownProcessorType(raw.to_string()))
    }

    pub fn code(self) -> u32 {
        PROCESSOR_TYPES
            .iter()
            .find(|(_, p, _)| *p == self)
            .map(|(_, _, c)| *c)
            .unwrap_or(8000)
    }

    pub fn from_code(code: u32) -> Option<Self> {
        PROCESSOR_TYPES
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(_, p, _)| *p)
    }
}

impl FromStr for FileType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s)
    }
}

impl FromStr for ProcessorType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_name(s)
    }
}
