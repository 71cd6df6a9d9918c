//! Delta modulation channel.
//!
//! Plays 1-bit delta-encoded samples fetched from CPU memory. The channel
//! itself never touches the bus: when its sample buffer runs dry it raises
//! a DMA request (address + 4-cycle stall) and the system scheduler
//! performs the read and delivers the byte back through
//! [`Dmc::load_sample`].

/// CPU cycles per output-shifter tick, indexed by the $4010 rate field
/// (NTSC).
const RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// Number of CPU cycles the CPU is stalled per sample fetch.
pub const DMA_STALL_CYCLES: u8 = 4;

/// Pending sample fetch handed to the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct DmaRequest {
    /// Address the scheduler must read.
    pub addr: u16,
    /// Master cycles left before the read is issued.
    pub cycles_left: u8,
}

/// DMC channel state.
#[derive(Debug, Clone)]
pub struct Dmc {
    irq_enabled: bool,
    loop_flag: bool,
    rate: u16,
    counter: u16,

    output_level: u8,
    sample_buffer: Option<u8>,
    shift_register: u8,
    bits_remaining: u8,
    silence: bool,

    sample_address: u8,
    sample_length: u8,
    current_address: u16,
    bytes_remaining: u16,

    irq_pending: bool,
    dma: Option<DmaRequest>,
}

impl Dmc {
    /// Create a silent DMC.
    #[must_use]
    pub fn new() -> Self {
        Self {
            irq_enabled: false,
            loop_flag: false,
            rate: RATE_TABLE[0],
            counter: 0,
            output_level: 0,
            sample_buffer: None,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
            sample_address: 0,
            sample_length: 0,
            current_address: 0xC000,
            bytes_remaining: 0,
            irq_pending: false,
            dma: None,
        }
    }

    /// $4010: IRQ enable, loop, rate index.
    pub fn write_ctrl(&mut self, value: u8) {
        self.irq_enabled = value & 0x80 != 0;
        self.loop_flag = value & 0x40 != 0;
        self.rate = RATE_TABLE[usize::from(value & 0x0F)];
        if !self.irq_enabled {
            self.irq_pending = false;
        }
    }

    /// $4011: direct 7-bit output level load.
    pub fn write_level(&mut self, value: u8) {
        self.output_level = value & 0x7F;
    }

    /// $4012: sample start = $C000 + value * 64.
    pub fn write_sample_address(&mut self, value: u8) {
        self.sample_address = value;
    }

    /// $4013: sample length = value * 16 + 1 bytes.
    pub fn write_sample_length(&mut self, value: u8) {
        self.sample_length = value;
    }

    /// $4015 enable bit. Enabling with an exhausted sample restarts it;
    /// disabling stops playback by zeroing the remaining byte count.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            if self.bytes_remaining == 0 {
                self.restart_sample();
            }
        } else {
            self.bytes_remaining = 0;
            self.dma = None;
        }
        self.request_dma_if_needed();
    }

    fn restart_sample(&mut self) {
        self.current_address = 0xC000 | (u16::from(self.sample_address) << 6);
        self.bytes_remaining = (u16::from(self.sample_length) << 4) | 1;
    }

    fn request_dma_if_needed(&mut self) {
        if self.dma.is_none() && self.sample_buffer.is_none() && self.bytes_remaining > 0 {
            self.dma = Some(DmaRequest {
                addr: self.current_address,
                cycles_left: DMA_STALL_CYCLES,
            });
        }
    }

    /// A DMA fetch is stalling the CPU.
    #[must_use]
    pub fn dma_active(&self) -> bool {
        self.dma.is_some()
    }

    /// Burn one master cycle of the DMA stall. Returns the fetch address
    /// on the cycle the read must be issued; the caller then feeds the
    /// byte back through [`Dmc::load_sample`].
    pub fn dma_tick(&mut self) -> Option<u16> {
        let req = self.dma.as_mut()?;
        req.cycles_left -= 1;
        if req.cycles_left == 0 {
            let addr = req.addr;
            self.dma = None;
            Some(addr)
        } else {
            None
        }
    }

    /// Deliver a fetched sample byte: fill the buffer, advance the
    /// address (wrapping $FFFF back to $8000), and on sample end either
    /// loop or raise the IRQ.
    pub fn load_sample(&mut self, value: u8) {
        self.sample_buffer = Some(value);
        self.current_address = if self.current_address == 0xFFFF {
            0x8000
        } else {
            self.current_address + 1
        };
        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart_sample();
            } else if self.irq_enabled {
                self.irq_pending = true;
            }
        }
    }

    /// CPU-cycle clock for the output unit.
    pub fn clock_timer(&mut self) {
        if self.counter > 0 {
            self.counter -= 1;
            return;
        }
        self.counter = self.rate - 1;

        if !self.silence {
            if self.shift_register & 0x01 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;
        self.bits_remaining -= 1;

        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.sample_buffer.take() {
                Some(byte) => {
                    self.silence = false;
                    self.shift_register = byte;
                }
                None => self.silence = true,
            }
            self.request_dma_if_needed();
        }
    }

    /// Current 7-bit output level.
    #[must_use]
    pub fn output(&self) -> u8 {
        self.output_level
    }

    /// Sample playback still has bytes left ($4015 status bit 4).
    #[must_use]
    pub fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// DMC IRQ line level.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Clear the DMC IRQ ($4015 read side effect).
    pub fn clear_irq(&mut self) {
        self.irq_pending = false;
    }
}

impl Default for Dmc {
    fn default() -> Self {
        Self::new()
    }
}
