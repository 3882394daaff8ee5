//! Fuzz target for COCO JSON parsing.
//!
//! Anything that parses is also pushed through selection, sampling and
//! packing, so malformed-but-valid corpora (dangling ids, odd boxes, zero
//! image sizes) exercise the whole offline pipeline.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use cocolift::corpus::io_coco_json::from_coco_slice;
use cocolift::upload::{OfflineRegistry, UploadMode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for JSON annotation files.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(store) = from_coco_slice(data) else {
        return;
    };

    for mode in [UploadMode::Detection, UploadMode::Classification] {
        let mut registry = OfflineRegistry::new();
        let _ = cocolift::plan_upload(&store, &[], 0, mode, &mut registry);
    }
});
