use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt::{Debug, Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// A locally monotonic `(seconds, counter)` stamp.
///
/// Stamps order first by `t`, then by `i`. Two stamps produced by the same
/// [TimestampGenerator] never compare equal.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Deserialize, serde::Serialize,
)]
pub struct Timestamp {
    /// Wall clock in UNIX seconds at generation time.
    pub t: u32,
    /// Ordinal of the stamp within its second.
    pub i: u32,
}

impl Timestamp {
    pub fn new(t: u32, i: u32) -> Self {
        Timestamp { t, i }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{t: {}, i: {}}}", self.t, self.i)
    }
}

impl Debug for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Timestamp({}, {})", self.t, self.i)
    }
}

/// Generator of locally monotonic timestamps.
///
/// The generator keeps `(seconds, counter)` state behind its own lock. On
/// each call it reads the wall clock in seconds; if the second is unchanged
/// since the previous call the counter keeps counting up, otherwise it is
/// reset. Stamps are strictly increasing for a single generator even when
/// the wall clock stalls.
///
/// A process-wide instance is available as [TimestampGenerator::global];
/// hosts running multiple engines may also embed their own instances.
pub struct TimestampGenerator {
    state: Mutex<(u32, u32)>,
}

static GLOBAL: Lazy<TimestampGenerator> = Lazy::new(TimestampGenerator::new);

impl TimestampGenerator {
    /// Creates a generator with fresh state.
    pub fn new() -> Self {
        TimestampGenerator {
            state: Mutex::new((0, 0)),
        }
    }

    /// Returns the shared process-wide generator.
    pub fn global() -> &'static TimestampGenerator {
        &GLOBAL
    }

    /// Generates the next locally monotonic timestamp.
    pub fn generate(&self) -> Timestamp {
        let mut state = self.state.lock();

        // get current time
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        // check if reset is needed
        if state.0 != now {
            state.0 = now;
            state.1 = 1;
        }

        // increment counter
        state.1 += 1;

        Timestamp {
            t: state.0,
            i: state.1,
        }
    }
}

impl Default for TimestampGenerator {
    fn default() -> Self {
        TimestampGenerator::new()
    }
}
