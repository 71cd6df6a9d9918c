//! CPU-side system scenarios: execution through the full bus, halt
//! behaviour, and OAM DMA timing.

mod common;

use common::RomBuilder;
use famicore_core::{Console, NullAudio, NullVideo};
use famicore_cpu::Bus;

#[test]
fn test_nrom_reset_and_execute_until_halt() {
    // LDA #$42, STA $00, HLT
    let rom = RomBuilder::nrom()
        .program(&[0xA9, 0x42, 0x85, 0x00, 0x02])
        .build();
    let mut console = Console::new(&rom).unwrap();

    console.clock_frame(&mut NullVideo, &mut NullAudio);

    assert!(console.halted());
    assert_eq!(console.bus_mut().read(0x0000), 0x42);
}

#[test]
fn test_nop_program_runs_a_full_frame() {
    let rom = RomBuilder::nrom().build(); // NOP slide into more NOPs
    let mut console = Console::new(&rom).unwrap();

    console.clock_frame(&mut NullVideo, &mut NullAudio);

    assert!(!console.halted());
    // A frame is ~29780 CPU cycles; all of them ran on the CPU since no
    // DMA was requested.
    let cpu_cycles = console.cpu().cycles();
    assert_eq!(cpu_cycles, console.master_cycles());
    assert!((29_700..30_000).contains(&cpu_cycles), "{cpu_cycles}");
}

#[test]
fn test_oam_dma_transfers_a_page_and_stalls_the_cpu() {
    // Fill $0200-$02FF with X, then fire OAM DMA from page 2 and halt.
    #[rustfmt::skip]
    let program = [
        0xA2, 0x00,             // LDX #$00
        0x8A,                   // loop: TXA
        0x9D, 0x00, 0x02,       // STA $0200,X
        0xE8,                   // INX
        0xD0, 0xF9,             // BNE loop
        0xA9, 0x02,             // LDA #$02
        0x8D, 0x14, 0x40,       // STA $4014
        0x02,                   // HLT
    ];
    let rom = RomBuilder::nrom().program(&program).build();
    let mut console = Console::new(&rom).unwrap();

    console.clock_frame(&mut NullVideo, &mut NullAudio);
    assert!(console.halted());

    // The CPU was off the bus for exactly the DMA duration.
    let stall = console.master_cycles() - console.cpu().cycles();
    assert!(stall == 513 || stall == 514, "stall was {stall}");

    // All 256 bytes landed in OAM (attribute bytes lose bits 2-4).
    let bus = console.bus_mut();
    for i in 0..=255u8 {
        bus.write(0x2003, i);
        let expected = if i & 0x03 == 2 { i & 0xE3 } else { i };
        assert_eq!(bus.read(0x2004), expected, "OAM[{i}]");
    }
}

#[test]
fn test_controller_bits_reach_the_cpu() {
    // Strobe the pad, then read 8 bits of controller 1 into $00-$07.
    #[rustfmt::skip]
    let program = [
        0xA9, 0x01,             // LDA #$01
        0x8D, 0x16, 0x40,       // STA $4016
        0xA9, 0x00,             // LDA #$00
        0x8D, 0x16, 0x40,       // STA $4016
        0xA2, 0x00,             // LDX #$00
        0xAD, 0x16, 0x40,       // loop: LDA $4016
        0x29, 0x01,             // AND #$01
        0x95, 0x00,             // STA $00,X
        0xE8,                   // INX
        0xE0, 0x08,             // CPX #$08
        0xD0, 0xF4,             // BNE loop
        0x02,                   // HLT
    ];
    let rom = RomBuilder::nrom().program(&program).build();
    let mut console = Console::new(&rom).unwrap();
    console.set_controller(0, 0b1001_0001); // A, Start, Right

    console.clock_frame(&mut NullVideo, &mut NullAudio);
    assert!(console.halted());

    let bus = console.bus_mut();
    let bits: Vec<u8> = (0..8).map(|i| bus.read(i)).collect();
    assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 1]);
}
