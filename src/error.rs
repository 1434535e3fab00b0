use core::fmt;

use crate::edge::EdgeLine;

/// Misconfiguration detected while wiring tasks, pins and interrupt lines.
///
/// There is no recovery path on the target: the firmware logs the error and
/// halts before any interrupt is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The tick period is shorter than one core clock cycle.
    TickTooShort,
    /// The reload value does not fit the timer's counter.
    TickTooLong { reload: u64, max: u32 },
    /// A task period that is not a positive whole number of ticks.
    BadPeriodMultiple { period_ms: u32, tick_ms: u32 },
    /// A task built with a period multiple of zero.
    ZeroPeriodMultiple,
    TaskTableFull,
    EdgeTableFull,
    DuplicateLine(EdgeLine),
    PriorityClash { line: EdgeLine, other: EdgeLine, priority: u8 },
    /// The pin has no GPIO interrupt, or the trigger is level sensitive.
    UnsupportedPinInterrupt { port: u8, pin: u8 },
    DuplicatePin { port: u8, pin: u8 },
    /// Two owners claimed overlapping bits of the same port.
    PinConflict { port: u8, overlap: u32 },
    /// The output handle was built for a different port than the claim.
    PortMismatch { claimed: u8, port: u8 },
    EmptyTable,
    InvalidClampRange { min: u32, max: u32 },
    InvalidPattern { len: u8 },
    /// Two color channels that overlap or don't cover their output's bits.
    InvalidChannels { owned: u32, green: u32, blue: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TickTooShort => write!(f, "tick period shorter than one clock cycle"),
            ConfigError::TickTooLong { reload, max } => {
                write!(f, "tick reload {} exceeds counter maximum {}", reload, max)
            }
            ConfigError::BadPeriodMultiple { period_ms, tick_ms } => write!(
                f,
                "task period {} ms is not a positive multiple of the {} ms tick",
                period_ms, tick_ms
            ),
            ConfigError::ZeroPeriodMultiple => write!(f, "task period multiple must be at least one tick"),
            ConfigError::TaskTableFull => write!(f, "task table full"),
            ConfigError::EdgeTableFull => write!(f, "edge table full"),
            ConfigError::DuplicateLine(line) => write!(f, "{:?} registered twice", line),
            ConfigError::PriorityClash { line, other, priority } => write!(
                f,
                "{:?} and {:?} share priority {}",
                line, other, priority
            ),
            ConfigError::UnsupportedPinInterrupt { port, pin } => {
                write!(f, "P{}.{} has no edge interrupt", port, pin)
            }
            ConfigError::DuplicatePin { port, pin } => write!(f, "P{}.{} registered twice", port, pin),
            ConfigError::PinConflict { port, overlap } => {
                write!(f, "port {} bits {:#010x} already owned", port, overlap)
            }
            ConfigError::PortMismatch { claimed, port } => {
                write!(f, "claim for port {} used with port {}", claimed, port)
            }
            ConfigError::EmptyTable => write!(f, "pattern table is empty"),
            ConfigError::InvalidClampRange { min, max } => {
                write!(f, "invalid clamp range [{}, {}]", min, max)
            }
            ConfigError::InvalidPattern { len } => write!(f, "invalid pulse pattern length {}", len),
            ConfigError::InvalidChannels { owned, green, blue } => write!(
                f,
                "green {:#010x} and blue {:#010x} do not split {:#010x}",
                green, blue, owned
            ),
        }
    }
}
