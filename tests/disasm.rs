use hackvm_gen::disasm::listing;
use hackvm_gen::programs;

#[test]
fn gradient_listing() {
    let text = listing(&programs::gradient().unwrap().bytes, false);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 14);
    assert_eq!(lines[0], "0x0000: movi r4, #0x4000");
    assert_eq!(lines[3], "0x000c: mov r0, r4");
    assert_eq!(lines[11], "0x001f: jnz 0x000c");
    assert_eq!(lines[13], "0x0023: halt");
}

#[test]
fn keyboard_listing_shows_patched_target() {
    let text = listing(&programs::keyboard_test().unwrap().bytes, true);
    assert!(text.contains("0x0009: 52 12 00     jz 0x0012"));
    assert!(text.contains("0x0010: 13 e0        loadb r7, [r0]"));
}
