//! Error types for laser-motion.
//!
//! Provides unified error handling across configuration, planning, and the
//! command protocol. The step interrupt never returns errors.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all laser-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Planner flow control or misuse
    Planner(PlannerError),
    /// Command stream error
    Protocol(ProtocolError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Steps per unit must be > 0
    InvalidStepsPerUnit {
        /// Axis letter
        axis: char,
        /// Offending value
        value: f32,
    },
    /// Maximum feed rate must be > 0
    InvalidMaxFeedRate {
        /// Axis letter
        axis: char,
        /// Offending value
        value: f32,
    },
    /// Acceleration must be > 0
    InvalidAcceleration(f32),
    /// Junction deviation must be > 0
    InvalidJunctionDeviation(f32),
    /// Laser PWM range must satisfy min <= max <= 10000
    InvalidLaserPwm {
        /// Minimum duty in basis points
        min: u16,
        /// Maximum duty in basis points
        max: u16,
    },
    /// Default feed rates must be > 0
    InvalidFeedRate(f32),
    /// Step timer frequency must be > 0
    InvalidTimerFrequency(u32),
    /// A required pin was not supplied to a builder
    MissingPin(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Planner errors.
///
/// `QueueFull` and `Busy` are flow control, not faults: the caller keeps the
/// request and retries once the step generator has consumed blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerError {
    /// The block ring has no free slot.
    QueueFull,
    /// A drain barrier is waiting for the queue to empty.
    Busy,
    /// An idle-only operation was requested while motion is queued.
    NotIdle,
}

impl PlannerError {
    /// True for conditions the caller should simply retry.
    #[inline]
    pub fn is_would_block(self) -> bool {
        matches!(self, PlannerError::QueueFull | PlannerError::Busy)
    }
}

/// Command stream errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Opcode not part of the command set
    UnknownOpcode(i32),
    /// Bitmap header describes more words than the buffer holds
    BitmapTooLarge {
        /// Words required by the header
        words: u32,
        /// Buffer capacity in words
        capacity: u32,
    },
    /// Bits per pixel outside 1..=32
    InvalidBitsPerPixel(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Planner(e) => write!(f, "Planner error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepsPerUnit { axis, value } => {
                write!(f, "Invalid steps_per_unit for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidMaxFeedRate { axis, value } => {
                write!(f, "Invalid max_feed_rate for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidAcceleration(v) => write!(f, "Invalid acceleration: {}. Must be > 0", v),
            ConfigError::InvalidJunctionDeviation(v) => {
                write!(f, "Invalid junction deviation: {}. Must be > 0", v)
            }
            ConfigError::InvalidLaserPwm { min, max } => {
                write!(f, "Invalid laser PWM range: min ({}) <= max ({}) <= 10000 required", min, max)
            }
            ConfigError::InvalidFeedRate(v) => write!(f, "Invalid feed rate: {}. Must be > 0", v),
            ConfigError::InvalidTimerFrequency(v) => {
                write!(f, "Invalid step timer frequency: {}. Must be > 0", v)
            }
            ConfigError::MissingPin(name) => write!(f, "{} is required", name),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::QueueFull => write!(f, "Block queue is full"),
            PlannerError::Busy => write!(f, "Waiting for the block queue to drain"),
            PlannerError::NotIdle => write!(f, "Operation requires an idle machine"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownOpcode(op) => write!(f, "Unknown opcode {}", op),
            ProtocolError::BitmapTooLarge { words, capacity } => {
                write!(f, "Bitmap of {} words exceeds capacity of {}", words, capacity)
            }
            ProtocolError::InvalidBitsPerPixel(bpp) => write!(f, "Invalid bits per pixel: {}", bpp),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<PlannerError> for Error {
    fn from(e: PlannerError) -> Self {
        Error::Planner(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for PlannerError {}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
