//! Command dispatch: decoder output into the planner.
//!
//! The dispatcher holds at most one decoded command that the planner could
//! not take yet. While it is pending no further words are consumed, so a
//! full queue stalls the stream instead of dropping commands.

use crate::config::FeedConfig;
use crate::error::PlannerError;
use crate::planner::{ActionKind, Planner};
use crate::protocol::{ActionRequest, Decoded, Decoder, Opcode, DEFAULT_BITMAP_WORDS};

/// Feeds a word stream through a [`Decoder`] into a [`Planner`].
#[derive(Debug, Clone)]
pub struct Dispatcher<const W: usize = DEFAULT_BITMAP_WORDS> {
    decoder: Decoder<W>,
    pending: Option<Decoded>,
    /// A bitmap was loaded; the next laser line follows it.
    bitmap_armed: bool,
}

impl<const W: usize> Dispatcher<W> {
    /// Create a dispatcher with the given decoder feeds.
    pub fn new(feeds: FeedConfig) -> Self {
        Self {
            decoder: Decoder::new(feeds),
            pending: None,
            bitmap_armed: false,
        }
    }

    /// Consume one word from the host.
    ///
    /// # Errors
    ///
    /// [`PlannerError::QueueFull`] or [`PlannerError::Busy`] when an earlier
    /// command is still waiting for the planner. The word was not consumed;
    /// feed the same word again later.
    pub fn feed<const N: usize, const PW: usize>(
        &mut self,
        word: i32,
        planner: &mut Planner<N, PW>,
    ) -> Result<(), PlannerError> {
        self.poll(planner)?;
        if let Some(decoded) = self.decoder.feed(word) {
            self.pending = Some(decoded);
            // Still pending on failure; the word itself has been consumed
            self.poll(planner).ok();
        }
        Ok(())
    }

    /// Retry the pending command, if any.
    ///
    /// # Errors
    ///
    /// [`PlannerError::QueueFull`] or [`PlannerError::Busy`] while the
    /// command is still pending.
    pub fn poll<const N: usize, const PW: usize>(
        &mut self,
        planner: &mut Planner<N, PW>,
    ) -> Result<(), PlannerError> {
        let Some(decoded) = self.pending else {
            return Ok(());
        };
        match decoded {
            Decoded::Action(request) => self.dispatch(&request, planner)?,
            Decoded::BitmapReady => {
                planner
                    .idle()
                    .map_err(|_| PlannerError::Busy)?
                    .load_bitmap(self.decoder.bitmap());
                self.bitmap_armed = true;
            }
        }
        self.pending = None;
        Ok(())
    }

    fn dispatch<const N: usize, const PW: usize>(
        &mut self,
        request: &ActionRequest,
        planner: &mut Planner<N, PW>,
    ) -> Result<(), PlannerError> {
        // Axes a command does not name stay where the last queued block ends
        let planned = planner.planned_position();
        let mut target = request.target;
        target.e = planned.e;
        match request.opcode {
            Opcode::Move | Opcode::Line => target.z = planned.z,
            Opcode::MoveZ => {
                target.x = planned.x;
                target.y = planned.y;
            }
            _ => {}
        }

        match request.opcode {
            Opcode::Move | Opcode::MoveZ => {
                planner.enqueue(&target, request.feed_rate, ActionKind::Move, 0)
            }
            Opcode::Line => {
                let action = if self.bitmap_armed {
                    ActionKind::BitmapLine
                } else {
                    ActionKind::LaserLine
                };
                planner.enqueue(&target, request.feed_rate, action, request.power)?;
                self.bitmap_armed = false;
                Ok(())
            }
            Opcode::SetPosition => {
                planner
                    .idle()
                    .map_err(|_| PlannerError::Busy)?
                    .set_current_position(target.x, target.y, target.z);
                Ok(())
            }
            // Parameters live in the decoder
            Opcode::NoOp | Opcode::SetParameter | Opcode::Bitmap => Ok(()),
        }
    }

    /// No command is waiting for the planner.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.pending.is_none()
    }

    /// The next laser line will follow the loaded bitmap.
    #[inline]
    pub fn bitmap_armed(&self) -> bool {
        self.bitmap_armed
    }

    /// The decoder.
    #[inline]
    pub fn decoder(&self) -> &Decoder<W> {
        &self.decoder
    }

    /// Drop the pending command and any partial one.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.pending = None;
        self.bitmap_armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{MmPerMin, MmPerSecSquared};
    use crate::config::MachineConfig;
    use crate::planner::{BlockSource, MotionBlock};

    fn config() -> MachineConfig {
        MachineConfig::uniform(100.0, MmPerMin(6000.0), MmPerSecSquared(500.0))
    }

    fn feed_all<const N: usize>(
        dispatcher: &mut Dispatcher<4>,
        planner: &mut Planner<N, 4>,
        words: &[i32],
    ) -> Result<(), PlannerError> {
        words.iter().try_for_each(|&word| dispatcher.feed(word, planner))
    }

    fn blocks<const N: usize>(planner: &Planner<N, 4>) -> heapless::Vec<MotionBlock, 16> {
        planner.blocks().copied().collect()
    }

    #[test]
    fn test_move_then_line() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[7, 101, 2500, 0, 10_000, 0, 1, 10_000, 10_000]).unwrap();

        let queued = blocks(&planner);
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].action, ActionKind::Move);
        assert_eq!(queued[0].steps, [1000, 0, 0, 0]);
        assert_eq!(queued[1].action, ActionKind::LaserLine);
        assert_eq!(queued[1].steps, [0, 1000, 0, 0]);
        assert_eq!(queued[1].power, 2500);
        assert!(dispatcher.is_ready());
    }

    #[test]
    fn test_full_queue_stalls_stream() {
        // Holds three blocks
        let mut planner: Planner<4, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[0, 1000, 0, 0, 2000, 0, 0, 3000, 0]).unwrap();
        assert_eq!(planner.queue_depth(), 3);

        // The fourth move decodes but cannot be queued
        feed_all(&mut dispatcher, &mut planner, &[0, 4000, 0]).unwrap();
        assert!(!dispatcher.is_ready());
        assert_eq!(dispatcher.feed(0, &mut planner), Err(PlannerError::QueueFull));
        assert_eq!(dispatcher.poll(&mut planner), Err(PlannerError::QueueFull));

        planner.current_block();
        planner.discard_current_block();

        assert_eq!(dispatcher.feed(0, &mut planner), Ok(()));
        assert!(dispatcher.is_ready());
        let queued = blocks(&planner);
        assert_eq!(queued.len(), 3);
        assert_eq!(queued[2].steps, [100, 0, 0, 0]);
        assert!(!queued[2].is_negative(crate::config::Axis::X));
    }

    #[test]
    fn test_bitmap_arms_next_line() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[9, 1, 8]).unwrap();
        assert!(!dispatcher.bitmap_armed());
        feed_all(&mut dispatcher, &mut planner, &[0x5500_0000]).unwrap();
        assert!(dispatcher.bitmap_armed());
        assert_eq!(planner.bitmap().width(), 8);
        assert!(planner.bitmap().bit(1));
        assert!(!planner.bitmap().bit(0));

        feed_all(&mut dispatcher, &mut planner, &[1, 8000, 0, 1, 16_000, 0]).unwrap();
        let queued = blocks(&planner);
        assert_eq!(queued[0].action, ActionKind::BitmapLine);
        assert_eq!(queued[1].action, ActionKind::LaserLine);
        assert!(!dispatcher.bitmap_armed());
    }

    #[test]
    fn test_bitmap_waits_for_idle() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[0, 1000, 0, 9, 1, 8, -1]).unwrap();
        assert!(!dispatcher.is_ready());
        assert_eq!(planner.bitmap().width(), 0);

        planner.current_block();
        planner.discard_current_block();
        dispatcher.poll(&mut planner).unwrap();
        assert!(dispatcher.bitmap_armed());
        assert!(planner.bitmap().bit(7));
    }

    #[test]
    fn test_set_position_waits_for_idle() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[0, 5000, 0, 4, 0, 0, 1000]).unwrap();
        assert_eq!(dispatcher.poll(&mut planner), Err(PlannerError::Busy));

        planner.current_block();
        planner.discard_current_block();
        dispatcher.poll(&mut planner).unwrap();

        let planned = planner.planned_position();
        assert!(planned.x.abs() < 1e-4);
        assert!((planned.z - 1.0).abs() < 1e-4);
        assert!(planner.queue_empty());
    }

    #[test]
    fn test_xy_move_after_flush_keeps_z() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[2, 5000]).unwrap();
        assert_eq!(planner.queue_depth(), 1);
        planner.clear_buffer();

        feed_all(&mut dispatcher, &mut planner, &[0, 1000, 0]).unwrap();
        let queued = blocks(&planner);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].steps, [100, 0, 0, 0]);
        assert!(planner.planned_position().z.abs() < 1e-4);
    }

    #[test]
    fn test_z_move_after_flush_keeps_xy() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[0, 3000, 2000]).unwrap();
        planner.clear_buffer();

        feed_all(&mut dispatcher, &mut planner, &[2, 1000]).unwrap();
        let queued = blocks(&planner);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].steps, [0, 0, 100, 0]);
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let mut planner: Planner<16, 4> = Planner::new(&MachineConfig::uniform(
            1000.0,
            MmPerMin(6000.0),
            MmPerSecSquared(500.0),
        ));
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(
            &mut dispatcher,
            &mut planner,
            &[0, i32::MIN + 1, 0, 0, i32::MAX, 0],
        )
        .unwrap();
        assert!(dispatcher.is_ready());
        assert!(planner.queue_depth() <= 2);
        for block in planner.blocks() {
            assert!(block.step_event_count <= i32::MAX as u32);
        }
    }

    #[test]
    fn test_unknown_opcode_is_skipped() {
        let mut planner: Planner<16, 4> = Planner::new(&config());
        let mut dispatcher = Dispatcher::new(config().feeds);

        feed_all(&mut dispatcher, &mut planner, &[42, 0, 1000, 0]).unwrap();
        assert_eq!(dispatcher.decoder().resyncs(), 1);
        assert_eq!(planner.queue_depth(), 1);
    }
}
