#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Errors are expected for most inputs; panics are bugs.
    let _ = xinvoice::detect(data);
    let _ = xinvoice::convert(data, None);
    let _ = xinvoice::convert(data, Some("xrechnung-ubl"));
});
