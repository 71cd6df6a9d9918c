//! NES 2A03 APU emulation.
//!
//! Two pulse channels, triangle, noise, and the delta-modulation channel,
//! clocked against the CPU; a frame counter producing quarter/half-frame
//! envelope and length events; and a non-linear mixer with DC blocking and
//! anti-click gain ramps, resampled to the host rate.
//!
//! The APU never reads memory itself: DMC sample fetches surface as DMA
//! requests ([`Apu::dmc_dma_active`]/[`Apu::dmc_dma_tick`]) that the system
//! scheduler services, stalling the CPU for the four-cycle fetch window.
//!
//! Finished samples accumulate internally and are handed to the host in
//! batches through the [`AudioSink`] trait.

mod apu;
mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod mixer;
mod noise;
mod pulse;
mod sweep;
mod timer;
mod triangle;

pub use apu::{Apu, CPU_CLOCK_HZ};
pub use dmc::DMA_STALL_CYCLES;
pub use frame_counter::FrameCounterMode;
pub use mixer::Channel;

/// Host-owned audio queue.
///
/// The core only appends; buffering, synchronisation with the audio
/// callback thread, and playback are the host's concern.
pub trait AudioSink {
    /// Append a batch of mono f32 samples at the configured rate.
    fn submit(&mut self, samples: &[f32]);
}

/// Sink that drops every sample; used when the host has no audio output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn submit(&mut self, _samples: &[f32]) {}
}
