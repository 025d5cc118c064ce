pub mod instant_to_epoch_seconds {
    // Serializes a `tokio::time::Instant` as approximate epoch seconds with
    // millisecond precision, e.g. `1653950726.456`. An `Instant` has no wall
    // clock reference, so the value is derived from the current offset.
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde::{ser::Error, Serialize, Serializer};
    use tokio::time::Instant;

    pub fn serialize<S>(instant: &Instant, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let system_now = SystemTime::now();
        let instant_now = Instant::now();
        let approx = system_now - instant_now.saturating_duration_since(*instant);
        let epoch = approx
            .duration_since(UNIX_EPOCH)
            .map_err(|e| S::Error::custom(format!("time went backwards: {e}")))?;

        let epoch_secs = epoch.as_millis() as f64 / 1000.0;

        epoch_secs.serialize(serializer)
    }
}
