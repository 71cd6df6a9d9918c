//! Non-linear mixer, DC blocker, and anti-click gain ramps.
//!
//! The two mixer stages follow the measured hardware transfer curves:
//!
//! ```text
//! pulse_out = 95.88 / (8128 / (p1 + p2) + 100)
//! tnd_out   = 159.79 / (1 / (t/8227 + n/12241 + d/22638) + 100)
//! ```
//!
//! A one-pole high-pass filter removes the DC offset
//! (`y = x - x_prev + 0.995 * y_prev`), and each channel carries a short
//! gain ramp (~64 samples) so $4015 enable flips do not step the output.

/// Channel indices into the gain ramp array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Pulse 1.
    Pulse1 = 0,
    /// Pulse 2.
    Pulse2 = 1,
    /// Triangle.
    Triangle = 2,
    /// Noise.
    Noise = 3,
    /// Delta modulation.
    Dmc = 4,
}

/// Gain step per emitted sample: full swing in 64 samples.
const GAIN_STEP: f32 = 1.0 / 64.0;

/// Mixer state.
#[derive(Debug, Clone)]
pub struct Mixer {
    gains: [f32; 5],
    targets: [f32; 5],
    prev_in: f32,
    prev_out: f32,
}

impl Mixer {
    /// Create a mixer with every channel ramped up.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gains: [1.0; 5],
            targets: [1.0; 5],
            prev_in: 0.0,
            prev_out: 0.0,
        }
    }

    /// Point a channel's gain ramp at 1.0 (enabled) or 0.0 (disabled).
    pub fn set_channel_enabled(&mut self, channel: Channel, enabled: bool) {
        self.targets[channel as usize] = if enabled { 1.0 } else { 0.0 };
    }

    /// Mix one sample from the raw channel levels.
    pub fn sample(&mut self, p1: u8, p2: u8, t: u8, n: u8, d: u8) -> f32 {
        for (gain, target) in self.gains.iter_mut().zip(self.targets) {
            if (*gain - target).abs() <= GAIN_STEP {
                *gain = target;
            } else if *gain < target {
                *gain += GAIN_STEP;
            } else {
                *gain -= GAIN_STEP;
            }
        }

        let p1 = f32::from(p1) * self.gains[Channel::Pulse1 as usize];
        let p2 = f32::from(p2) * self.gains[Channel::Pulse2 as usize];
        let t = f32::from(t) * self.gains[Channel::Triangle as usize];
        let n = f32::from(n) * self.gains[Channel::Noise as usize];
        let d = f32::from(d) * self.gains[Channel::Dmc as usize];

        let pulse_sum = p1 + p2;
        let pulse_out = if pulse_sum > 0.0 {
            95.88 / (8128.0 / pulse_sum + 100.0)
        } else {
            0.0
        };

        let tnd_sum = t / 8227.0 + n / 12241.0 + d / 22638.0;
        let tnd_out = if tnd_sum > 0.0 {
            159.79 / (1.0 / tnd_sum + 100.0)
        } else {
            0.0
        };

        self.high_pass(pulse_out + tnd_out)
    }

    /// One-pole DC blocker.
    fn high_pass(&mut self, x: f32) -> f32 {
        let y = x - self.prev_in + 0.995 * self.prev_out;
        self.prev_in = x;
        self.prev_out = y;
        y
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}
