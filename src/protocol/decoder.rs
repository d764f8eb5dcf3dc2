//! Streaming decoder for the integer command protocol.
//!
//! Every command is an opcode followed by a fixed number of signed integer
//! parameters. Coordinates are micrometers. Bitmap uploads carry a two-word
//! header followed by `ceil(bpp * width / 32)` data words.

use crate::config::units::{Micrometers, MmPerMin};
use crate::config::{FeedConfig, POWER_SCALE};
use crate::error::ProtocolError;
use crate::planner::Target;

use super::bitmap::{BitmapBuffer, DEFAULT_BITMAP_WORDS};
use super::opcode::{Opcode, Parameter};

/// Largest fixed parameter count of any opcode.
const MAX_PARAMS: usize = 3;

/// A decoded command ready for the planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionRequest {
    /// Command that produced the request.
    pub opcode: Opcode,
    /// Target in work coordinates. E is left at zero; the dispatcher fills
    /// it from the planned position.
    pub target: Target,
    /// Feed for the move.
    pub feed_rate: MmPerMin,
    /// Laser power, 0-10000.
    pub power: u16,
    /// Parameter written by [`Opcode::SetParameter`].
    pub parameter: Option<(Parameter, i32)>,
}

/// Output of [`Decoder::feed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    /// A complete command.
    Action(ActionRequest),
    /// A bitmap upload finished; the staged bitmap is in [`Decoder::bitmap`].
    BitmapReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Params { opcode: Opcode, received: usize },
    BitmapData,
    /// Discarding the data words of a rejected bitmap.
    Skip { remaining: u32 },
}

/// Command decoder state machine.
///
/// Feed it one integer at a time. Unknown opcodes are dropped and the
/// decoder waits for the next opcode.
#[derive(Debug, Clone)]
pub struct Decoder<const W: usize = DEFAULT_BITMAP_WORDS> {
    state: State,
    params: [i32; MAX_PARAMS],
    feeds: FeedConfig,
    laser_feed: MmPerMin,
    power: u16,
    /// Last commanded position. Z persists across XY commands.
    position: Target,
    bitmap: BitmapBuffer<W>,
    resyncs: u32,
}

impl<const W: usize> Decoder<W> {
    /// Decoder with the given default feeds, full laser power.
    pub fn new(feeds: FeedConfig) -> Self {
        Self {
            state: State::Idle,
            params: [0; MAX_PARAMS],
            laser_feed: feeds.laser,
            feeds,
            power: POWER_SCALE,
            position: Target::default(),
            bitmap: BitmapBuffer::new(),
            resyncs: 0,
        }
    }

    /// Consume one integer from the stream.
    pub fn feed(&mut self, word: i32) -> Option<Decoded> {
        match self.state {
            State::Idle => match Opcode::try_from(word) {
                Ok(opcode) if opcode.param_count() == 0 => self.complete(opcode),
                Ok(opcode) => {
                    self.state = State::Params {
                        opcode,
                        received: 0,
                    };
                    None
                }
                Err(_) => {
                    warn!("unknown opcode {}, resynchronizing", word);
                    self.resync();
                    None
                }
            },
            State::Params { opcode, received } => {
                self.params[received] = word;
                let received = received + 1;
                if received < opcode.param_count() {
                    self.state = State::Params { opcode, received };
                    None
                } else {
                    self.state = State::Idle;
                    self.complete(opcode)
                }
            }
            State::BitmapData => {
                if self.bitmap.push_word(word as u32) {
                    self.state = State::Idle;
                    debug!("bitmap upload complete: {} words", self.bitmap.size_words());
                    Some(Decoded::BitmapReady)
                } else {
                    None
                }
            }
            State::Skip { remaining } => {
                self.state = if remaining > 1 {
                    State::Skip {
                        remaining: remaining - 1,
                    }
                } else {
                    State::Idle
                };
                None
            }
        }
    }

    /// Drop any partial command.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.params = [0; MAX_PARAMS];
    }

    /// Bitmap staged by the last upload.
    #[inline]
    pub fn bitmap(&self) -> &BitmapBuffer<W> {
        &self.bitmap
    }

    /// Feed currently used for laser lines.
    #[inline]
    pub fn laser_feed(&self) -> MmPerMin {
        self.laser_feed
    }

    /// Power currently used for laser lines.
    #[inline]
    pub fn power(&self) -> u16 {
        self.power
    }

    /// Number of times the stream was resynchronized.
    #[inline]
    pub fn resyncs(&self) -> u32 {
        self.resyncs
    }

    /// No partial command is pending.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    fn resync(&mut self) {
        self.resyncs = self.resyncs.wrapping_add(1);
        self.reset();
    }

    fn complete(&mut self, opcode: Opcode) -> Option<Decoded> {
        let [p0, p1, p2] = self.params;
        let (feed_rate, power) = match opcode {
            Opcode::Move => {
                self.position.x = millimeters(p0);
                self.position.y = millimeters(p1);
                (self.feeds.travel, 0)
            }
            Opcode::Line => {
                self.position.x = millimeters(p0);
                self.position.y = millimeters(p1);
                (self.laser_feed, self.power)
            }
            Opcode::MoveZ => {
                self.position.z = millimeters(p0);
                (self.feeds.z, 0)
            }
            Opcode::SetPosition => {
                self.position.x = millimeters(p0);
                self.position.y = millimeters(p1);
                self.position.z = millimeters(p2);
                (self.feeds.travel, 0)
            }
            Opcode::NoOp => (self.feeds.travel, 0),
            Opcode::SetParameter => {
                self.set_parameter(Parameter::from(p0), p1);
                (self.laser_feed, self.power)
            }
            Opcode::Bitmap => return self.begin_bitmap(p0, p1),
        };

        let parameter = match opcode {
            Opcode::SetParameter => Some((Parameter::from(p0), p1)),
            _ => None,
        };

        Some(Decoded::Action(ActionRequest {
            opcode,
            target: Target::new(self.position.x, self.position.y, self.position.z, 0.0),
            feed_rate,
            power,
            parameter,
        }))
    }

    fn set_parameter(&mut self, parameter: Parameter, value: i32) {
        match parameter {
            Parameter::LaserSpeed => {
                let scale = value.clamp(1, i32::from(POWER_SCALE)) as f32 / f32::from(POWER_SCALE);
                self.laser_feed = self.feeds.laser * scale;
            }
            Parameter::LaserPower => {
                self.power = value.clamp(0, i32::from(POWER_SCALE)) as u16;
            }
            Parameter::Unknown(index) => {
                debug!("ignoring parameter {}", index);
            }
        }
    }

    fn begin_bitmap(&mut self, bpp: i32, width: i32) -> Option<Decoded> {
        match self.bitmap.begin(bpp, width) {
            Ok(0) => Some(Decoded::BitmapReady),
            Ok(_) => {
                self.state = State::BitmapData;
                None
            }
            Err(ProtocolError::BitmapTooLarge { words, .. }) => {
                warn!("bitmap of {} words rejected", words);
                self.resyncs = self.resyncs.wrapping_add(1);
                self.state = if words > 0 {
                    State::Skip { remaining: words }
                } else {
                    State::Idle
                };
                None
            }
            Err(_) => {
                warn!("invalid bitmap header, resynchronizing");
                self.resync();
                None
            }
        }
    }
}

#[inline]
fn millimeters(micrometers: i32) -> f32 {
    Micrometers(micrometers).to_millimeters().value()
}
