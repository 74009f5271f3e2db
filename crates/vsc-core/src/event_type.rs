//! Player event type enum as the single source of truth for event type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Player event types the session aggregator knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventType {
    MediaStarted,
    MediaEnded,
    MediaCompleted,
    MediaBufferingStart,
    MediaBufferingEnd,
    MediaInitialBufferStart,
    MediaInitialBufferEnd,
    MediaQualityChangeAuto,
    MediaQualityChange,
    MediaQualityChangedProgrammatically,
    MediaScrub,
}

impl MediaEventType {
    pub const ALL: [Self; 11] = [
        Self::MediaStarted,
        Self::MediaEnded,
        Self::MediaCompleted,
        Self::MediaBufferingStart,
        Self::MediaBufferingEnd,
        Self::MediaInitialBufferStart,
        Self::MediaInitialBufferEnd,
        Self::MediaQualityChangeAuto,
        Self::MediaQualityChange,
        Self::MediaQualityChangedProgrammatically,
        Self::MediaScrub,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MediaStarted => "MediaStarted",
            Self::MediaEnded => "MediaEnded",
            Self::MediaCompleted => "MediaCompleted",
            Self::MediaBufferingStart => "MediaBufferingStart",
            Self::MediaBufferingEnd => "MediaBufferingEnd",
            Self::MediaInitialBufferStart => "MediaInitialBufferStart",
            Self::MediaInitialBufferEnd => "MediaInitialBufferEnd",
            Self::MediaQualityChangeAuto => "MediaQualityChangeAuto",
            Self::MediaQualityChange => "MediaQualityChange",
            Self::MediaQualityChangedProgrammatically => "MediaQualityChangedProgrammatically",
            Self::MediaScrub => "MediaScrub",
        }
    }

    /// Opens a playing interval in the duration ledger.
    #[must_use]
    pub const fn starts_playback(&self) -> bool {
        matches!(self, Self::MediaStarted | Self::MediaInitialBufferStart)
    }

    /// Closes a playing interval in the duration ledger.
    #[must_use]
    pub const fn ends_playback(&self) -> bool {
        matches!(self, Self::MediaEnded | Self::MediaCompleted)
    }
}

impl fmt::Display for MediaEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

impl Serialize for MediaEventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MediaEventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}
