#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for hint in [None, Some("wav"), Some("mp3")] {
        let _ = voxguard_neural::decoder::load(data, hint);
    }
});
