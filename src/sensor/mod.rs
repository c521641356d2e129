//! Temperature driven fan control.
//!
//! [`FanController`] samples a [`Thermometer`], averages the last
//! [`TEMP_SAMPLES`] readings and sets the [`Fan`] target speed from a
//! [`SpeedMap`]. The cloud can replace the map or force a speed for a while
//! through [`FanControl`].
//!
//! Temperatures are in milli-degrees Celsius, speeds in RPM.

use heapless::Vec;

use crate::system::scheduler::Task;
use crate::system::time::Clock;

/// Readings averaged per update.
pub const TEMP_SAMPLES: usize = 4;

/// Capacity of a [`SpeedMap`].
pub const MAP_ENTRIES_MAX: usize = 8;

/// Fan control errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The temperature sensor did not answer.
    Sensor,
    /// The fan controller did not answer.
    Fan,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Sensor => defmt::write!(f, "Sensor"),
            Error::Fan => defmt::write!(f, "Fan"),
        }
    }
}

/// Temperature sensor on the shared I2C bus.
pub trait Thermometer {
    /// Current temperature in milli-degrees Celsius.
    fn read_milli_celsius(&mut self) -> Result<i32, Error>;
}

/// Fan controller on the shared I2C bus.
pub trait Fan {
    /// Set the closed-loop target speed.
    fn set_target_tach(&mut self, rpm: u16) -> Result<(), Error>;

    /// Measured speed.
    fn tach(&mut self) -> Result<u16, Error>;
}

/// One step of a [`SpeedMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    /// Temperature the step applies above, milli-degrees Celsius.
    pub threshold: i32,
    /// Speed for temperatures above `threshold`.
    pub rpm: u16,
}

/// Temperature to speed steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedMap {
    entries: Vec<MapEntry, MAP_ENTRIES_MAX>,
}

const DEFAULT_MAP: [(i32, u16); 7] = [
    (0, 0),
    (24_000, 1000),
    (24_500, 1500),
    (25_000, 2000),
    (25_500, 2500),
    (26_000, 3000),
    (27_000, 4000),
];

impl Default for SpeedMap {
    fn default() -> Self {
        let mut entries = Vec::new();
        for (threshold, rpm) in DEFAULT_MAP {
            // capacity exceeds the default table
            let _ = entries.push(MapEntry { threshold, rpm });
        }
        Self { entries }
    }
}

impl SpeedMap {
    /// A map without steps; every temperature maps to 0.
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a map from `[degrees, rpm]` pairs.
    ///
    /// Pairs beyond [`MAP_ENTRIES_MAX`] are dropped.
    pub fn from_degrees(pairs: &[[u32; 2]]) -> Self {
        let mut map = Self::empty();
        for &[degrees, rpm] in pairs.iter().take(MAP_ENTRIES_MAX) {
            let threshold = i32::try_from(degrees.saturating_mul(1000)).unwrap_or(i32::MAX);
            let rpm = u16::try_from(rpm).unwrap_or(u16::MAX);
            let _ = map.entries.push(MapEntry { threshold, rpm });
        }
        map
    }

    /// The steps in order.
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Speed for `milli_celsius`: the last step whose threshold is below it.
    ///
    /// ```rust
    /// use cryptoauth_kit::sensor::SpeedMap;
    ///
    /// let map = SpeedMap::default();
    /// assert_eq!(map.speed_for(24_200), 1000);
    /// assert_eq!(map.speed_for(24_500), 1000);
    /// assert_eq!(map.speed_for(30_000), 4000);
    /// assert_eq!(map.speed_for(-5_000), 0);
    /// ```
    pub fn speed_for(&self, milli_celsius: i32) -> u16 {
        self.entries
            .iter()
            .rev()
            .find(|entry| milli_celsius > entry.threshold)
            .map_or(0, |entry| entry.rpm)
    }
}

/// Settings and readings the cloud client needs from fan control.
pub trait FanControl {
    /// Fresh temperature reading.
    fn temperature(&mut self) -> Result<i32, Error>;

    /// Measured fan speed.
    fn fan_speed(&mut self) -> Result<u16, Error>;

    /// Replace the speed map.
    fn set_speed_map(&mut self, map: SpeedMap);

    /// Run at `rpm` until UTC second `until`.
    fn set_override(&mut self, rpm: u16, until: u32);
}

/// Fan control loop.
#[derive(Debug)]
pub struct FanController<T, F, C> {
    thermometer: T,
    fan: F,
    clock: C,
    map: SpeedMap,
    samples: [i32; TEMP_SAMPLES],
    next_sample: usize,
    primed: bool,
    override_rpm: u16,
    override_end: u32,
}

impl<T, F, C> FanController<T, F, C>
where
    T: Thermometer,
    F: Fan,
    C: Clock,
{
    /// Control `fan` from `thermometer` with the default map.
    pub fn new(thermometer: T, fan: F, clock: C) -> Self {
        Self {
            thermometer,
            fan,
            clock,
            map: SpeedMap::default(),
            samples: [0; TEMP_SAMPLES],
            next_sample: 0,
            primed: false,
            override_rpm: 0,
            override_end: 0,
        }
    }

    /// Current speed map.
    pub fn speed_map(&self) -> &SpeedMap {
        &self.map
    }

    /// Whether an override is in force at UTC second `now`.
    pub fn override_active(&self, now: u32) -> bool {
        now < self.override_end
    }

    /// Run one control step and return the target speed set.
    pub fn update(&mut self) -> Result<u16, Error> {
        let now = self.clock.utc();
        let rpm = if self.override_active(now) {
            self.override_rpm
        } else {
            let average = self.sample()?;
            self.map.speed_for(average)
        };

        self.fan.set_target_tach(rpm)?;
        Ok(rpm)
    }

    /// Take a reading and return the moving average.
    fn sample(&mut self) -> Result<i32, Error> {
        let reading = self.thermometer.read_milli_celsius()?;
        if !self.primed {
            self.samples = [reading; TEMP_SAMPLES];
            self.primed = true;
        }

        self.samples[self.next_sample] = reading;
        self.next_sample = (self.next_sample + 1) % TEMP_SAMPLES;

        let sum: i64 = self.samples.iter().map(|&s| s as i64).sum();
        Ok((sum / TEMP_SAMPLES as i64) as i32)
    }
}

impl<T, F, C> FanControl for FanController<T, F, C>
where
    T: Thermometer,
    F: Fan,
    C: Clock,
{
    fn temperature(&mut self) -> Result<i32, Error> {
        self.thermometer.read_milli_celsius()
    }

    fn fan_speed(&mut self) -> Result<u16, Error> {
        self.fan.tach()
    }

    fn set_speed_map(&mut self, map: SpeedMap) {
        debug!("sensor: speed map replaced, {} steps", map.entries().len());
        self.map = map;
    }

    fn set_override(&mut self, rpm: u16, until: u32) {
        debug!("sensor: override {} rpm until {}", rpm, until);
        self.override_rpm = rpm;
        self.override_end = until;
    }
}

impl<T, F, C> Task for FanController<T, F, C>
where
    T: Thermometer,
    F: Fan,
    C: Clock,
{
    fn poll(&mut self) {
        if let Err(err) = self.update() {
            warn!("sensor: update failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_steps() {
        let map = SpeedMap::default();
        assert_eq!(map.entries().len(), 7);
        assert_eq!(map.speed_for(0), 0);
        assert_eq!(map.speed_for(1), 0);
        assert_eq!(map.speed_for(25_001), 2000);
        assert_eq!(map.speed_for(26_999), 3000);
    }

    #[test]
    fn degrees_are_scaled_and_capped() {
        let pairs = [[20, 500]; MAP_ENTRIES_MAX + 2];
        let map = SpeedMap::from_degrees(&pairs);
        assert_eq!(map.entries().len(), MAP_ENTRIES_MAX);
        assert_eq!(map.entries()[0], MapEntry { threshold: 20_000, rpm: 500 });
    }

    #[test]
    fn empty_map_stops_the_fan() {
        assert_eq!(SpeedMap::empty().speed_for(40_000), 0);
    }
}
