use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use roi_tracker::{Frame, FrameSlot};

fn fill_for(seq: u64) -> u8 {
    (seq % 251) as u8
}

fn dims_for(seq: u64) -> (u32, u32) {
    if seq % 2 == 0 {
        (640, 480)
    } else {
        (320, 240)
    }
}

/// A reader racing a writer never observes a mixed or truncated frame.
#[test]
fn reader_never_sees_a_torn_frame() {
    let slot = Arc::new(FrameSlot::new());
    let done = Arc::new(AtomicBool::new(false));

    let writer_slot = Arc::clone(&slot);
    let writer_done = Arc::clone(&done);
    let writer = std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_millis(300);
        let mut seq = 0u64;
        while Instant::now() < deadline {
            seq += 1;
            let (w, h) = dims_for(seq);
            let value = fill_for(seq);
            writer_slot.publish(Frame::new(seq, RgbImage::from_pixel(w, h, Rgb([value; 3]))));
        }
        writer_done.store(true, Ordering::SeqCst);
        seq
    });

    let mut observed = 0u64;
    let mut last_seq = 0u64;
    while !done.load(Ordering::SeqCst) {
        let Some(frame) = slot.latest() else {
            continue;
        };
        let (w, h) = dims_for(frame.seq);
        assert_eq!((frame.width(), frame.height()), (w, h));
        assert_eq!(frame.pixels().len(), (w * h * 3) as usize);
        let expected = fill_for(frame.seq);
        assert!(
            frame.pixels().iter().all(|&b| b == expected),
            "frame {} is not uniform",
            frame.seq
        );
        assert!(frame.seq >= last_seq, "slot went backwards");
        last_seq = frame.seq;
        observed += 1;
    }

    let written = writer.join().expect("writer thread");
    assert!(observed > 0);
    assert_eq!(slot.latest().map(|f| f.seq), Some(written));
}
