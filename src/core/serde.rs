use serde::{Serialize, Deserialize, Serializer, Deserializer};
use std::time::{SystemTime, Duration, UNIX_EPOCH};

/// Serializes Duration as seconds
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.as_secs_f64().serialize(serializer)
}

/// Deserializes Duration from seconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(serde::de::Error::custom(format!("invalid duration: {}", secs)));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Serializes SystemTime as (seconds, nanoseconds) since UNIX_EPOCH.
///
/// Times before the epoch collapse to the epoch, which is also the
/// "unset" value of every timestamp in the heartbeat messages.
pub fn serialize_time<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let duration = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
}

/// Deserializes SystemTime from (seconds, nanoseconds) since UNIX_EPOCH
pub fn deserialize_time<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
where
    D: Deserializer<'de>,
{
    let (secs, nanos) = <(u64, u32)>::deserialize(deserializer)?;
    UNIX_EPOCH
        .checked_add(Duration::new(secs, nanos))
        .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
}
