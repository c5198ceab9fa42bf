// Per-file detectors run by the worker pool

mod unused_import;

pub use unused_import::UnusedImportDetector;
