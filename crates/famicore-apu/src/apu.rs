//! APU top level: register decoding, per-cycle clocking, sample output.

use crate::dmc::Dmc;
use crate::frame_counter::{FrameCounter, FrameEvents};
use crate::mixer::{Channel, Mixer};
use crate::noise::Noise;
use crate::pulse::Pulse;
use crate::sweep::PulseChannel;
use crate::triangle::Triangle;
use crate::AudioSink;

/// NTSC CPU clock rate in Hz; the APU is clocked off the CPU.
pub const CPU_CLOCK_HZ: f64 = 1_789_773.0;

/// 2A03 APU state.
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_counter: FrameCounter,
    mixer: Mixer,

    /// CPU cycle parity divider for the APU-cycle units.
    cycle: u64,

    /// Output accumulator: one sample is emitted each time it crosses 1.
    sample_accum: f64,
    sample_ratio: f64,
    buffer: Vec<f32>,
}

impl Apu {
    /// Create an APU emitting samples at `sample_rate` Hz.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            pulse1: Pulse::new(PulseChannel::One),
            pulse2: Pulse::new(PulseChannel::Two),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),
            frame_counter: FrameCounter::new(),
            mixer: Mixer::new(),
            cycle: 0,
            sample_accum: 0.0,
            sample_ratio: f64::from(sample_rate) / CPU_CLOCK_HZ,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Reset to power-on state, keeping the configured sample rate.
    pub fn reset(&mut self) {
        let ratio = self.sample_ratio;
        *self = Self::new(48_000);
        self.sample_ratio = ratio;
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) {
        // Triangle and DMC run at CPU rate.
        self.triangle.clock_timer();
        self.dmc.clock_timer();

        // Pulses, noise and the frame counter run at half rate.
        if self.cycle & 1 == 1 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
            let events = self.frame_counter.clock();
            self.dispatch(events);
        }
        self.cycle += 1;

        self.sample_accum += self.sample_ratio;
        if self.sample_accum >= 1.0 {
            self.sample_accum -= 1.0;
            let sample = self.mixer.sample(
                self.pulse1.output(),
                self.pulse2.output(),
                self.triangle.output(),
                self.noise.output(),
                self.dmc.output(),
            );
            self.buffer.push(sample);
        }
    }

    fn dispatch(&mut self, events: FrameEvents) {
        if events.quarter {
            self.pulse1.clock_quarter();
            self.pulse2.clock_quarter();
            self.triangle.clock_quarter();
            self.noise.clock_quarter();
        }
        if events.half {
            self.pulse1.clock_half();
            self.pulse2.clock_half();
            self.triangle.clock_half();
            self.noise.clock_half();
        }
    }

    /// Register write, $4000-$4017.
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000 => self.pulse1.write_ctrl(value),
            0x4001 => self.pulse1.write_sweep(value),
            0x4002 => self.pulse1.write_timer_lo(value),
            0x4003 => self.pulse1.write_timer_hi(value),

            0x4004 => self.pulse2.write_ctrl(value),
            0x4005 => self.pulse2.write_sweep(value),
            0x4006 => self.pulse2.write_timer_lo(value),
            0x4007 => self.pulse2.write_timer_hi(value),

            0x4008 => self.triangle.write_linear(value),
            0x400A => self.triangle.write_timer_lo(value),
            0x400B => self.triangle.write_timer_hi(value),

            0x400C => self.noise.write_ctrl(value),
            0x400E => self.noise.write_period(value),
            0x400F => self.noise.write_length(value),

            0x4010 => self.dmc.write_ctrl(value),
            0x4011 => self.dmc.write_level(value),
            0x4012 => self.dmc.write_sample_address(value),
            0x4013 => self.dmc.write_sample_length(value),

            0x4015 => self.write_status(value),
            0x4017 => {
                let events = self.frame_counter.write(value);
                self.dispatch(events);
            }
            _ => {}
        }
    }

    fn write_status(&mut self, value: u8) {
        self.pulse1.set_enabled(value & 0x01 != 0);
        self.pulse2.set_enabled(value & 0x02 != 0);
        self.triangle.set_enabled(value & 0x04 != 0);
        self.noise.set_enabled(value & 0x08 != 0);
        self.dmc.set_enabled(value & 0x10 != 0);

        self.mixer.set_channel_enabled(Channel::Pulse1, value & 0x01 != 0);
        self.mixer.set_channel_enabled(Channel::Pulse2, value & 0x02 != 0);
        self.mixer.set_channel_enabled(Channel::Triangle, value & 0x04 != 0);
        self.mixer.set_channel_enabled(Channel::Noise, value & 0x08 != 0);
        self.mixer.set_channel_enabled(Channel::Dmc, value & 0x10 != 0);
    }

    /// $4015 read: length/activity flags plus the two IRQ flags, both of
    /// which the read acknowledges.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_counter.clear_irq();
        self.dmc.clear_irq();
        status
    }

    /// $4015 value without the read side effects.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut status = 0;
        if self.pulse1.active() {
            status |= 0x01;
        }
        if self.pulse2.active() {
            status |= 0x02;
        }
        if self.triangle.active() {
            status |= 0x04;
        }
        if self.noise.active() {
            status |= 0x08;
        }
        if self.dmc.active() {
            status |= 0x10;
        }
        if self.frame_counter.irq_pending() {
            status |= 0x40;
        }
        if self.dmc.irq_pending() {
            status |= 0x80;
        }
        status
    }

    /// Combined APU IRQ line (frame counter or DMC).
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending() || self.dmc.irq_pending()
    }

    /// A DMC sample fetch is holding the bus.
    #[must_use]
    pub fn dmc_dma_active(&self) -> bool {
        self.dmc.dma_active()
    }

    /// Burn one master cycle of DMC DMA; `Some(addr)` means the scheduler
    /// must read that address now and hand the byte to
    /// [`Apu::dmc_load_sample`].
    pub fn dmc_dma_tick(&mut self) -> Option<u16> {
        self.dmc.dma_tick()
    }

    /// Deliver a DMA-fetched sample byte to the DMC.
    pub fn dmc_load_sample(&mut self, value: u8) {
        self.dmc.load_sample(value);
    }

    /// Hand accumulated samples to the host in one batch.
    pub fn flush_samples(&mut self, sink: &mut impl AudioSink) {
        if !self.buffer.is_empty() {
            sink.submit(&self.buffer);
            self.buffer.clear();
        }
    }

    /// Samples accumulated since the last flush.
    #[must_use]
    pub fn pending_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Pulse 1 length counter, for tests and debug UIs.
    #[must_use]
    pub fn pulse1_length(&self) -> u8 {
        self.pulse1.length_value()
    }

    /// Triangle length counter, for tests and debug UIs.
    #[must_use]
    pub fn triangle_length(&self) -> u8 {
        self.triangle.length_value()
    }
}
