#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = scalelink_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A config that validates must also map onto a reader config the core accepts.
        let reader = scalelink_core::ReaderCfg::from(&cfg);
        assert!(reader.validate().is_ok());
    }
});
