#![no_main]

use fsci_fftw::WisdomStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let store = WisdomStore::new();
    if store.import_from_string(text).is_ok() {
        let exported = store
            .export_to_string()
            .expect("imported wisdom must export");
        let again = WisdomStore::new();
        again
            .import_from_string(&exported)
            .expect("exported wisdom must import");
        assert_eq!(again.len(), store.len());
    }
});
