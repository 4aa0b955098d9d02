//! Simulation time and size units.
//!
//! Ticks are picoseconds, matching the convention of the configuration scripts this
//! simulator replaces (`Exiting @ tick N` reports picoseconds). Clock and size strings
//! use the same spelling as those scripts: `"1GHz"`, `"16kB"`, `"8192MiB"`.

use crate::common::error::ConfigError;

/// The simulator's atomic unit of time (one picosecond).
pub type Tick = u64;

/// Ticks per second.
pub const TICKS_PER_SECOND: u64 = 1_000_000_000_000;

/// Parses a clock string into a clock period in ticks.
///
/// Accepts frequencies (`GHz`, `MHz`, `kHz`, `Hz`) and periods (`ns`, `ps`). Fractional
/// values are allowed (`"2.5GHz"`); the period is rounded to the nearest tick.
pub fn parse_clock(s: &str) -> Result<Tick, ConfigError> {
    let bad = || ConfigError::MalformedClock(s.to_string());
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(bad)?;
    let (num, unit) = trimmed.split_at(split);
    let value: f64 = num.trim().parse().map_err(|_| bad())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(bad());
    }

    let period = match unit.trim() {
        "GHz" => 1e3 / value,
        "MHz" => 1e6 / value,
        "kHz" => 1e9 / value,
        "Hz" => 1e12 / value,
        "ns" => value * 1e3,
        "ps" => value,
        _ => return Err(bad()),
    };

    let ticks = period.round();
    if ticks < 1.0 {
        return Err(bad());
    }
    Ok(ticks as Tick)
}

/// Parses a size string into bytes.
///
/// `k`/`K`, `M`, `G` prefixes are binary multiples whether or not the `i` is present
/// (`"16kB" == "16KiB" == 16384`). A bare number is a byte count.
pub fn parse_size(s: &str) -> Result<u64, ConfigError> {
    let bad = || ConfigError::MalformedSize(s.to_string());
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (num, unit) = trimmed.split_at(split);
    let value: u64 = num.parse().map_err(|_| bad())?;

    let shift = match unit.trim() {
        "" | "B" => 0,
        "k" | "kB" | "K" | "KB" | "KiB" | "kiB" => 10,
        "M" | "MB" | "MiB" => 20,
        "G" | "GB" | "GiB" => 30,
        _ => return Err(bad()),
    };

    value.checked_shl(shift).filter(|v| v >> shift == value).ok_or_else(bad)
}
