//! PPU-side system scenarios: nametable mirroring through PPUDATA,
//! sprite-0 hit, frame pacing, and pixel output.

mod common;

use common::{FrameCapture, RomBuilder};
use famicore_core::{Console, NullAudio, NullVideo};
use famicore_cpu::Bus;

#[test]
fn test_horizontal_mirroring_pairs_nametables() {
    let rom = RomBuilder::nrom().build(); // flags6 bit 0 clear -> horizontal
    let mut console = Console::new(&rom).unwrap();
    let bus = console.bus_mut();

    // $2000 and $2400 are the same physical page.
    bus.write(0x2006, 0x20);
    bus.write(0x2006, 0x00);
    bus.write(0x2007, 0xAB);

    bus.write(0x2006, 0x24);
    bus.write(0x2006, 0x00);
    let _ = bus.read(0x2007); // delay buffer
    assert_eq!(bus.read(0x2007), 0xAB);

    // $2800/$2C00 are the other page.
    bus.write(0x2006, 0x28);
    bus.write(0x2006, 0x00);
    bus.write(0x2007, 0x55);

    bus.write(0x2006, 0x2C);
    bus.write(0x2006, 0x00);
    let _ = bus.read(0x2007);
    assert_eq!(bus.read(0x2007), 0x55);

    // And the two pages are distinct.
    bus.write(0x2006, 0x20);
    bus.write(0x2006, 0x00);
    let _ = bus.read(0x2007);
    assert_eq!(bus.read(0x2007), 0xAB);
}

#[test]
fn test_vertical_mirroring_pairs_nametables() {
    let rom = RomBuilder::nrom().vertical_mirroring().build();
    let mut console = Console::new(&rom).unwrap();
    let bus = console.bus_mut();

    bus.write(0x2006, 0x20);
    bus.write(0x2006, 0x00);
    bus.write(0x2007, 0xCD);

    bus.write(0x2006, 0x28);
    bus.write(0x2006, 0x00);
    let _ = bus.read(0x2007);
    assert_eq!(bus.read(0x2007), 0xCD);
}

/// Program used by the sprite-0 scenario: a solid background tile at tile
/// coordinates (2,2), sprite 0 over it at (16,16), both layers on with the
/// left-column masks enabled, then spin.
#[rustfmt::skip]
const SPRITE_ZERO_PROGRAM: &[u8] = &[
    // OAM entry 0: Y=$0F (top shows at 16), tile 1, attr 0, X=$10.
    0xA9, 0x00,             // LDA #$00
    0x8D, 0x03, 0x20,       // STA $2003
    0xA9, 0x0F,             // LDA #$0F
    0x8D, 0x04, 0x20,       // STA $2004
    0xA9, 0x01,             // LDA #$01
    0x8D, 0x04, 0x20,       // STA $2004
    0xA9, 0x00,             // LDA #$00
    0x8D, 0x04, 0x20,       // STA $2004
    0xA9, 0x10,             // LDA #$10
    0x8D, 0x04, 0x20,       // STA $2004
    // Nametable entry (2,2) = tile 1 at $2042.
    0xA9, 0x20,             // LDA #$20
    0x8D, 0x06, 0x20,       // STA $2006
    0xA9, 0x42,             // LDA #$42
    0x8D, 0x06, 0x20,       // STA $2006
    0xA9, 0x01,             // LDA #$01
    0x8D, 0x07, 0x20,       // STA $2007
    // Reset the scroll address so rendering starts at the origin.
    0xA9, 0x00,             // LDA #$00
    0x8D, 0x06, 0x20,       // STA $2006
    0x8D, 0x06, 0x20,       // STA $2006
    // Enable both layers, left columns included.
    0xA9, 0x1E,             // LDA #$1E
    0x8D, 0x01, 0x20,       // STA $2001
    0x4C, 0x35, 0x80,       // spin: JMP spin
];

#[test]
fn test_sprite_zero_hit_sets_and_clears_with_the_frame() {
    let rom = RomBuilder::nrom()
        .solid_tile(1)
        .program(SPRITE_ZERO_PROGRAM)
        .build();
    let mut console = Console::new(&rom).unwrap();

    // Frame 1 runs the setup; frame 2 renders with both layers enabled.
    console.clock_frame(&mut NullVideo, &mut NullAudio);
    console.clock_frame(&mut NullVideo, &mut NullAudio);

    let status = console.bus_mut().read(0x2002);
    assert_eq!(status & 0x40, 0x40, "sprite-0 hit not flagged");
    // The hit flag survives further reads within the frame.
    assert_eq!(console.bus_mut().read(0x2002) & 0x40, 0x40);

    // Disable rendering: the pre-render line clears the flag and nothing
    // re-triggers it.
    console.bus_mut().write(0x2001, 0x00);
    console.clock_frame(&mut NullVideo, &mut NullAudio);
    assert_eq!(console.bus_mut().read(0x2002) & 0x40, 0);
}

#[test]
fn test_no_hit_when_background_is_disabled() {
    let rom = RomBuilder::nrom()
        .solid_tile(1)
        .program(SPRITE_ZERO_PROGRAM)
        .build();
    let mut console = Console::new(&rom).unwrap();
    console.clock_frame(&mut NullVideo, &mut NullAudio);
    // Sprites only.
    console.bus_mut().write(0x2001, 0x14);
    console.clock_frame(&mut NullVideo, &mut NullAudio);
    assert_eq!(console.bus_mut().read(0x2002) & 0x40, 0);
}

#[test]
fn test_vblank_flag_clears_on_read() {
    let rom = RomBuilder::nrom().build();
    let mut console = Console::new(&rom).unwrap();
    console.clock_frame(&mut NullVideo, &mut NullAudio);

    let status = console.bus_mut().read(0x2002);
    assert_eq!(status & 0x80, 0x80);
    assert_eq!(console.bus_mut().read(0x2002) & 0x80, 0);
}

#[test]
fn test_frames_pace_at_ntsc_length() {
    let rom = RomBuilder::nrom()
        .program(&[0xA9, 0x08, 0x8D, 0x01, 0x20, 0x4C, 0x05, 0x80])
        .build(); // enable background, spin
    let mut console = Console::new(&rom).unwrap();

    console.clock_frame(&mut NullVideo, &mut NullAudio);
    let mut deltas = Vec::new();
    for _ in 0..4 {
        let before = console.master_cycles();
        console.clock_frame(&mut NullVideo, &mut NullAudio);
        deltas.push(console.master_cycles() - before);
    }
    // 89341-89342 dots at 3 dots per master cycle.
    for delta in &deltas {
        assert!((29_779..=29_782).contains(delta), "delta {delta}");
    }
}

#[test]
fn test_background_pixels_reach_the_frame_buffer() {
    // Solid tile everywhere via tile 0 untouched (all zero -> backdrop);
    // make tile 1 solid, point nametable entry (0,0) at it, and give
    // palette entry 3 of palette 0 a distinct colour.
    #[rustfmt::skip]
    let program = [
        // Palette $3F03 = $21 (light blue-ish).
        0xA9, 0x3F,             // LDA #$3F
        0x8D, 0x06, 0x20,       // STA $2006
        0xA9, 0x03,             // LDA #$03
        0x8D, 0x06, 0x20,       // STA $2006
        0xA9, 0x21,             // LDA #$21
        0x8D, 0x07, 0x20,       // STA $2007
        // Nametable (0,0) = tile 1.
        0xA9, 0x20,             // LDA #$20
        0x8D, 0x06, 0x20,       // STA $2006
        0xA9, 0x00,             // LDA #$00
        0x8D, 0x06, 0x20,       // STA $2006
        0xA9, 0x01,             // LDA #$01
        0x8D, 0x07, 0x20,       // STA $2007
        // Scroll to origin, enable background with the left column.
        0xA9, 0x00,             // LDA #$00
        0x8D, 0x06, 0x20,       // STA $2006
        0x8D, 0x06, 0x20,       // STA $2006
        0xA9, 0x0A,             // LDA #$0A
        0x8D, 0x01, 0x20,       // STA $2001
        0x4C, 0x2B, 0x80,       // spin: JMP spin
    ];
    let rom = RomBuilder::nrom().solid_tile(1).program(&program).build();
    let mut console = Console::new(&rom).unwrap();

    let mut frame = FrameCapture::new();
    console.clock_frame(&mut frame, &mut NullAudio);
    console.clock_frame(&mut frame, &mut NullAudio);

    // Tile (0,0) covers pixels (0..8, 0..8); its colour differs from the
    // backdrop next to it.
    let inside = frame.pixel(4, 4);
    let outside = frame.pixel(12, 4);
    assert_ne!(inside, outside);
}
