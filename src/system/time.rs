//! Wall clock access and calendar conversion.

use core::cell::Cell;

use critical_section::Mutex;

/// Source of UTC time.
pub trait Clock {
    /// Seconds since the Unix epoch, or 0 while the time has not been set.
    fn utc(&self) -> u32;

    /// Set the clock from a calendar date.
    fn set(&mut self, datetime: &DateTime);
}

/// Calendar date and time of day, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    /// Full year, e.g. 2018.
    pub year: u16,
    /// Month, 1 to 12.
    pub month: u8,
    /// Day of the month, 1 to 31.
    pub day: u8,
    /// Hour, 0 to 23.
    pub hour: u8,
    /// Minute, 0 to 59.
    pub minute: u8,
    /// Second, 0 to 59.
    pub second: u8,
}

impl DateTime {
    /// Size of the packed record.
    pub const PACKED_SIZE: usize = 7;

    /// Years a 32-bit Unix timestamp can hold in full.
    pub const YEARS: core::ops::RangeInclusive<u16> = 1970..=2105;

    /// Decode the packed record `year (u16 LE), month, day, hour, minute, second`.
    ///
    /// Returns `None` if `bytes` is shorter than [`Self::PACKED_SIZE`] or a
    /// field is out of range. A decoded record always converts with
    /// [`to_unix`](Self::to_unix).
    pub fn from_packed(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; Self::PACKED_SIZE] = bytes.get(..Self::PACKED_SIZE)?.try_into().ok()?;
        let datetime = Self {
            year: u16::from_le_bytes([bytes[0], bytes[1]]),
            month: bytes[2],
            day: bytes[3],
            hour: bytes[4],
            minute: bytes[5],
            second: bytes[6],
        };
        datetime.is_valid().then_some(datetime)
    }

    fn is_valid(&self) -> bool {
        Self::YEARS.contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }

    /// Seconds since 1970-01-01T00:00:00Z, or `None` past the range of a
    /// `u32`.
    ///
    /// ```rust
    /// use cryptoauth_kit::system::time::DateTime;
    ///
    /// let dt = DateTime { year: 2000, month: 3, day: 1, hour: 0, minute: 0, second: 0 };
    /// assert_eq!(dt.to_unix(), Some(951_868_800));
    /// ```
    pub fn to_unix(&self) -> Option<u32> {
        let (mut year, mut month) = (self.year as u32, self.month as u32);

        // January and February count as months 13 and 14 of the previous year.
        if month <= 2 {
            month += 12;
            year = year.saturating_sub(1);
        }

        let days = 365 * year + year / 4 - year / 100 + year / 400
            + 30 * month
            + 3 * (month + 1) / 5
            + self.day as u32;

        days.saturating_sub(UNIX_EPOCH_DAYS)
            .checked_mul(86_400)?
            .checked_add(3_600 * self.hour as u32)?
            .checked_add(60 * self.minute as u32)?
            .checked_add(self.second as u32)
    }
}

/// Day number of 1970-01-01 in the counting used by [`DateTime::to_unix`].
const UNIX_EPOCH_DAYS: u32 = 719_561;

/// Software clock advanced by the system tick.
///
/// Stands in for an RTC counter: it reads 0 until set and then counts
/// seconds. Shared as a `static`; the tick interrupt calls
/// [`advance`](Self::advance) and every user gets a `&SystemClock`, which
/// implements [`Clock`].
#[derive(Debug)]
pub struct SystemClock {
    period_ms: u32,
    // (seconds, milliseconds into the current second); None until set
    state: Mutex<Cell<Option<(u32, u32)>>>,
}

impl SystemClock {
    /// An unset clock advanced every `period_ms`.
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            state: Mutex::new(Cell::new(None)),
        }
    }

    /// Count one tick.
    pub fn advance(&self) {
        critical_section::with(|cs| {
            let state = self.state.borrow(cs);
            if let Some((seconds, ms)) = state.get() {
                let ms = ms + self.period_ms;
                state.set(Some((seconds.wrapping_add(ms / 1000), ms % 1000)));
            }
        });
    }

    /// Whether the clock has been set since power up.
    pub fn is_set(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().is_some())
    }

    fn set_unix(&self, seconds: u32) {
        critical_section::with(|cs| self.state.borrow(cs).set(Some((seconds, 0))));
    }
}

impl Clock for &SystemClock {
    fn utc(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow(cs).get().map_or(0, |(seconds, _)| seconds))
    }

    fn set(&mut self, datetime: &DateTime) {
        debug!(
            "clock: set {}-{}-{} {}:{}:{}",
            datetime.year,
            datetime.month,
            datetime.day,
            datetime.hour,
            datetime.minute,
            datetime.second
        );
        match datetime.to_unix() {
            Some(seconds) => self.set_unix(seconds),
            None => warn!("clock: {} is out of range", datetime.year),
        }
    }
}
