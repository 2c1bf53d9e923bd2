use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::wire::{FixedWidth, WireDecode, WireEncode};

/// Ticks per second (one tick is 100 ns).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// A UTC timestamp as signed 100 ns ticks since 0001-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub i64);

impl Ticks {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Convert from a `SystemTime`, saturating at the representable range.
    pub fn from_system_time(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => UNIX_EPOCH_TICKS.saturating_add(duration_ticks(after)),
            Err(before) => UNIX_EPOCH_TICKS.saturating_sub(duration_ticks(before.duration())),
        };
        Self(ticks)
    }

    /// Convert to a `SystemTime`.
    pub fn to_system_time(self) -> SystemTime {
        let delta = self.0.saturating_sub(UNIX_EPOCH_TICKS);
        let magnitude = Duration::from_nanos(delta.unsigned_abs().saturating_mul(100));
        if delta >= 0 {
            UNIX_EPOCH + magnitude
        } else {
            UNIX_EPOCH - magnitude
        }
    }

    /// Milliseconds since the Unix epoch, saturating for decoded values
    /// far outside the calendar range.
    pub fn unix_millis(self) -> i64 {
        self.0.saturating_sub(UNIX_EPOCH_TICKS) / 10_000
    }
}

fn duration_ticks(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos() / 100).unwrap_or(i64::MAX)
}

impl FixedWidth for Ticks {
    const WIRE_SIZE: usize = 8;
}

impl WireEncode for Ticks {
    fn wire_len(&self) -> usize {
        Self::WIRE_SIZE
    }

    fn encode_into(&self, dst: &mut [u8]) {
        self.0.encode_into(dst)
    }
}

impl WireDecode for Ticks {
    fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
        let (raw, used) = i64::decode_from(src)?;
        Ok((Self(raw), used))
    }
}

/// A four-part version number (`major.minor.build.revision`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
    pub revision: i32,
}

impl Version {
    pub const fn new(major: i32, minor: i32, build: i32, revision: i32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FixedWidth for Version {
    const WIRE_SIZE: usize = 16;
}

impl WireEncode for Version {
    fn wire_len(&self) -> usize {
        Self::WIRE_SIZE
    }

    fn encode_into(&self, dst: &mut [u8]) {
        for (slot, part) in dst
            .chunks_exact_mut(4)
            .zip([self.major, self.minor, self.build, self.revision])
        {
            part.encode_into(slot);
        }
    }
}

impl WireDecode for Version {
    fn decode_from(src: &[u8]) -> Result<(Self, usize)> {
        let (major, _) = i32::decode_from(src)?;
        let (minor, _) = i32::decode_from(src.get(4..).unwrap_or_default())?;
        let (build, _) = i32::decode_from(src.get(8..).unwrap_or_default())?;
        let (revision, _) = i32::decode_from(src.get(12..).unwrap_or_default())?;
        Ok((Self::new(major, minor, build, revision), Self::WIRE_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{deserialize, to_vec};

    #[test]
    fn unix_epoch_maps_to_known_ticks() {
        assert_eq!(Ticks::from_system_time(UNIX_EPOCH), Ticks(UNIX_EPOCH_TICKS));
        assert_eq!(Ticks(UNIX_EPOCH_TICKS).unix_millis(), 0);
    }

    #[test]
    fn system_time_roundtrip_at_tick_precision() {
        let time = UNIX_EPOCH + Duration::from_nanos(1_700_000_000_123_456_700);
        let ticks = Ticks::from_system_time(time);
        assert_eq!(ticks.to_system_time(), time);
    }

    #[test]
    fn times_before_epoch() {
        let time = UNIX_EPOCH - Duration::from_secs(1);
        let ticks = Ticks::from_system_time(time);
        assert_eq!(ticks.0, UNIX_EPOCH_TICKS - TICKS_PER_SECOND);
        assert_eq!(ticks.to_system_time(), time);
        assert_eq!(ticks.unix_millis(), -1_000);
    }

    #[test]
    fn unix_millis_saturates_for_extreme_ticks() {
        assert_eq!(Ticks(0).unix_millis(), -UNIX_EPOCH_TICKS / 10_000);
        assert_eq!(Ticks(i64::MIN).unix_millis(), i64::MIN / 10_000);
        assert_eq!(Ticks(i64::MAX).unix_millis(), (i64::MAX - UNIX_EPOCH_TICKS) / 10_000);
    }

    #[test]
    fn ticks_encode_as_i64() {
        let ticks = Ticks(638_000_000_000_000_000);
        assert_eq!(to_vec(&ticks), to_vec(&ticks.0));
        let (decoded, used) = deserialize::<Ticks>(Some(&to_vec(&ticks)), 0).unwrap();
        assert_eq!(decoded, ticks);
        assert_eq!(used, 8);
    }

    #[test]
    fn version_layout_and_roundtrip() {
        let version = Version::new(1, 2, 3, 4);
        let bytes = to_vec(&version);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[12..], &[4, 0, 0, 0]);
        let (decoded, used) = deserialize::<Version>(Some(&bytes), 0).unwrap();
        assert_eq!(decoded, version);
        assert_eq!(used, 16);
        assert_eq!(version.to_string(), "1.2.3.4");
    }

    #[test]
    fn truncated_version_is_short() {
        let bytes = to_vec(&Version::new(1, 2, 3, 4));
        let err = deserialize::<Version>(Some(&bytes[..10]), 0).unwrap_err();
        assert_eq!(err.code(), -2);
    }
}
