#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pixelflut::{decode_frame, PixelCommand, WireEncode};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    x: u32,
    y: u32,
    color: [u8; 3],
}

fuzz_target!(|input: FuzzInput| {
    let cmd = PixelCommand::new(input.x, input.y, input.color);

    // Encode
    let frame = cmd.encode();

    // Decode - must give back exactly what was encoded
    let update = decode_frame(&frame).expect("encoded command must decode");
    assert_eq!((update.x, update.y, update.color), (cmd.x, cmd.y, cmd.color));
});
