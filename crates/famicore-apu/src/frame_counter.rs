//! Frame counter: the low-frequency sequencer driving envelope, length and
//! sweep clocks.
//!
//! Counted in APU cycles (one per two CPU cycles). The 4-step sequence
//! fires quarter-frame events at {3729, 7457, 11186, 14915}, half-frame
//! events at steps 2 and 4, and raises the frame IRQ at step 4 unless
//! inhibited; the counter then wraps. 5-step mode inserts a quiet fourth
//! step and moves the final quarter+half to 18641 with no IRQ.
//!
//! A $4017 write resets the counter. Writing with the inhibit bit set also
//! clears a pending frame IRQ (it is never raised retroactively when the
//! bit clears), and writing 5-step mode clocks both quarter and half
//! events immediately.

/// Sequencer mode selected by $4017 bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameCounterMode {
    /// Four steps, IRQ at the end of the sequence.
    #[default]
    FourStep,
    /// Five steps, no IRQ.
    FiveStep,
}

/// Events produced by one frame-counter clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEvents {
    /// Clock envelopes and the triangle linear counter.
    pub quarter: bool,
    /// Clock length counters and sweeps.
    pub half: bool,
}

const STEP1: u32 = 3729;
const STEP2: u32 = 7457;
const STEP3: u32 = 11186;
const STEP4: u32 = 14915;
const STEP5: u32 = 18641;

/// Frame counter state.
#[derive(Debug, Clone, Copy)]
pub struct FrameCounter {
    cycle: u32,
    mode: FrameCounterMode,
    irq_inhibit: bool,
    irq_pending: bool,
}

impl FrameCounter {
    /// Power-on state: 4-step, IRQ enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycle: 0,
            mode: FrameCounterMode::FourStep,
            irq_inhibit: false,
            irq_pending: false,
        }
    }

    /// $4017 write. Returns events to clock immediately (5-step mode fires
    /// quarter+half on the write itself).
    pub fn write(&mut self, value: u8) -> FrameEvents {
        self.irq_inhibit = value & 0x40 != 0;
        if self.irq_inhibit {
            self.irq_pending = false;
        }

        self.mode = if value & 0x80 != 0 {
            FrameCounterMode::FiveStep
        } else {
            FrameCounterMode::FourStep
        };
        self.cycle = 0;

        if self.mode == FrameCounterMode::FiveStep {
            FrameEvents { quarter: true, half: true }
        } else {
            FrameEvents::default()
        }
    }

    /// Advance one APU cycle.
    pub fn clock(&mut self) -> FrameEvents {
        self.cycle += 1;
        let mut events = FrameEvents::default();

        match self.mode {
            FrameCounterMode::FourStep => match self.cycle {
                STEP1 | STEP3 => events.quarter = true,
                STEP2 => {
                    events.quarter = true;
                    events.half = true;
                }
                STEP4 => {
                    events.quarter = true;
                    events.half = true;
                    if !self.irq_inhibit {
                        self.irq_pending = true;
                    }
                    self.cycle = 0;
                }
                _ => {}
            },
            FrameCounterMode::FiveStep => match self.cycle {
                STEP1 | STEP3 => events.quarter = true,
                STEP2 => {
                    events.quarter = true;
                    events.half = true;
                }
                STEP5 => {
                    events.quarter = true;
                    events.half = true;
                    self.cycle = 0;
                }
                // STEP4 is the quiet step in 5-step mode.
                _ => {}
            },
        }

        events
    }

    /// Frame IRQ line level.
    #[must_use]
    pub const fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Clear the frame IRQ ($4015 read side effect).
    pub fn clear_irq(&mut self) {
        self.irq_pending = false;
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}
