#![no_main]

use libfuzzer_sys::fuzz_target;

use kiln_safety::{
    compose_final_reply, extract_directives, sanitize_reply, NO_RESPONSE_MARKER,
    PING_SUPPORT_MARKER,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    let directives = extract_directives(&raw);
    assert!(!directives.cleaned_text.contains(PING_SUPPORT_MARKER));
    assert!(!directives.cleaned_text.contains(NO_RESPONSE_MARKER));
    assert_eq!(directives.cleaned_text, directives.cleaned_text.trim());

    let sanitized = sanitize_reply(&directives.cleaned_text);
    if sanitized.ends_with("```") {
        panic!("trailing fence must be followed by a line break");
    }

    let escalated = compose_final_reply(&sanitized, true, "424242");
    assert!(escalated.starts_with("<@&424242>"));
    let passthrough = compose_final_reply(&sanitized, false, "424242");
    assert_eq!(passthrough, sanitized);
});
