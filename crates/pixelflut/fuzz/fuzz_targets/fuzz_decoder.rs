#![no_main]

use libfuzzer_sys::fuzz_target;
use pixelflut::{decode_frame, Canvas, FrameReader, Rect};

fuzz_target!(|data: &[u8]| {
    // The decoder should never panic, regardless of input
    let _ = decode_frame(data);

    // Nor should a full stream of garbage applied to a canvas
    let canvas = Canvas::new(Rect::new(0, 0, 32, 32)).unwrap();
    let mut reader = FrameReader::new(data);
    while let Ok(Some(frame)) = reader.read_frame() {
        if let Ok(update) = decode_frame(frame) {
            let _ = canvas.apply(&update);
        }
    }
});
