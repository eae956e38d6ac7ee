#![no_main]

use libfuzzer_sys::fuzz_target;
use xinvoice::Format;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(invoice) = xinvoice::xml::from_ubl_xml(s) {
            if let Ok(xml) = xinvoice::to_xml(&invoice, Format::XRechnungUbl) {
                let _ = xinvoice::xml::from_ubl_xml(&xml);
            }
        }
    }
});
