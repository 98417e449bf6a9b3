use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ParseError;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:([abfpx])(\d+))?$").expect("version pattern compiles")
});

/// Release stage suffix of a version label. The discriminant is the ordinal
/// written into the version key.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseStage {
    // No suffix, e.g. "3.4.0"
    Unstaged = 0,
    Alpha = 1,
    Beta = 2,
    Experimental = 3,
    Final = 4,
    Patch = 5,
}

impl ReleaseStage {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "a" => Some(ReleaseStage::Alpha),
            "b" => Some(ReleaseStage::Beta),
            "x" => Some(ReleaseStage::Experimental),
            "f" => Some(ReleaseStage::Final),
            "p" => Some(ReleaseStage::Patch),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ReleaseStage::Unstaged => "",
            ReleaseStage::Alpha => "a",
            ReleaseStage::Beta => "b",
            ReleaseStage::Experimental => "x",
            ReleaseStage::Final => "f",
            ReleaseStage::Patch => "p",
        }
    }
}

/// Totally ordered integer form of a version label.
///
/// Decimal layout, most significant first: major (3 digits), minor (2),
/// patch (2), stage (1), build (2). Integer order equals release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionKey(u32);

impl VersionKey {
    pub const MAX: VersionKey = VersionKey(u32::MAX);

    pub const fn from_raw(raw: u32) -> Self {
        VersionKey(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionKey {
    type Err = ParseError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        UnityVersion::parse(label)?.key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnityVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub stage: ReleaseStage,
    pub build: u32,
}

impl UnityVersion {
    pub fn parse(label: &str) -> Result<Self, ParseError> {
        let caps = VERSION_PATTERN
            .captures(label)
            .ok_or_else(|| ParseError::InvalidLabel(label.to_string()))?;

        let number = |idx: usize| -> Result<u32, ParseError> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u32>()
                    .map_err(|_| ParseError::InvalidLabel(label.to_string())),
                None => Ok(0),
            }
        };

        let stage = match caps.get(4) {
            Some(m) => ReleaseStage::from_suffix(m.as_str())
                .ok_or_else(|| ParseError::InvalidLabel(label.to_string()))?,
            None => ReleaseStage::Unstaged,
        };

        Ok(UnityVersion {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            stage,
            build: number(5)?,
        })
    }

    /// Computes the order key. Fails when a component does not fit its width.
    pub fn key(&self) -> Result<VersionKey, ParseError> {
        let major = encode_major(self.major).ok_or_else(|| self.out_of_range("major", self.major))?;
        let minor = self.two_digits("minor", self.minor)?;
        let patch = self.two_digits("patch", self.patch)?;
        let build = self.two_digits("build", self.build)?;

        let key = u64::from(major) * 10_000_000
            + u64::from(minor) * 100_000
            + u64::from(patch) * 1_000
            + u64::from(self.stage as u8) * 100
            + u64::from(build);

        u32::try_from(key)
            .map(VersionKey)
            .map_err(|_| ParseError::ComponentOutOfRange {
                label: self.to_string(),
                component: "key",
                value: key,
            })
    }

    fn two_digits(&self, component: &'static str, value: u32) -> Result<u32, ParseError> {
        if value > 99 {
            return Err(self.out_of_range(component, value));
        }
        Ok(value)
    }

    fn out_of_range(&self, component: &'static str, value: u32) -> ParseError {
        ParseError::ComponentOutOfRange {
            label: self.to_string(),
            component,
            value: u64::from(value),
        }
    }
}

// Unity majors come in three eras: 1-5, 2017-2023 and 6000+. Each era is
// folded into its own band of the 3-digit major slot, keeping era order.
fn encode_major(major: u32) -> Option<u32> {
    match major {
        0..=99 => Some(major),
        2000..=2199 => Some(major - 1900),
        6000..=6099 => Some(major - 5700),
        _ => None,
    }
}

impl FromStr for UnityVersion {
    type Err = ParseError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        UnityVersion::parse(label)
    }
}

impl fmt::Display for UnityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.stage != ReleaseStage::Unstaged {
            write!(f, "{}{}", self.stage.suffix(), self.build)?;
        }
        Ok(())
    }
}

/// Parses `label` and returns its order key.
pub fn version_key(label: &str) -> Result<VersionKey, ParseError> {
    label.parse()
}
