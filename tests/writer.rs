use std::path::PathBuf;

use pretty_assertions::assert_eq;

use hackvm_gen::programs::{catalog, Program, CATALOG};
use hackvm_gen::writer::write_all;
use hackvm_gen::AsmError;

fn builds() -> impl Iterator<Item = Result<Program, AsmError>> {
    CATALOG.iter().map(|(_, build)| build())
}

fn scratch(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hackvm-gen-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn regenerating_is_byte_identical() {
    let a = scratch("first");
    let b = scratch("second");
    let first = write_all(&a, builds(), |_, _| {}).unwrap();
    let second = write_all(&b, builds(), |_, _| {}).unwrap();
    assert_eq!(first.len(), 5);

    for ((pa, na), (pb, nb)) in first.iter().zip(&second) {
        assert_eq!(na, nb);
        assert_eq!(pa.file_name(), pb.file_name());
        assert_eq!(std::fs::read(pa).unwrap(), std::fs::read(pb).unwrap());
    }

    // overwriting in place keeps the same contents
    write_all(&a, builds(), |_, _| {}).unwrap();
    for ((pa, _), (pb, _)) in first.iter().zip(&second) {
        assert_eq!(std::fs::read(pa).unwrap(), std::fs::read(pb).unwrap());
    }

    let _ = std::fs::remove_dir_all(&a);
    let _ = std::fs::remove_dir_all(&b);
}

#[test]
fn files_have_no_header() {
    let dir = scratch("raw");
    let progs = catalog().unwrap();
    let written = write_all(&dir, progs.iter().cloned().map(Ok), |_, _| {}).unwrap();
    let sizes: Vec<_> = written.iter().map(|(_, n)| *n).collect();
    assert_eq!(sizes, vec![15, 36, 21, 33, 112]);
    for (p, (path, _)) in progs.iter().zip(&written) {
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("{}.bin", p.name));
        assert_eq!(std::fs::read(path).unwrap(), p.bytes);
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn earlier_files_are_reported_when_a_later_write_fails() {
    let dir = scratch("partial");
    std::fs::create_dir_all(dir.join("gradient.bin")).unwrap();

    let mut lines = Vec::new();
    let err = write_all(&dir, builds(), |path, n| {
        lines.push(format!("Wrote {n} bytes to {}", path.display()));
    })
    .unwrap_err();

    assert!(format!("{err:#}").contains("gradient.bin"));
    assert_eq!(lines, vec![format!("Wrote 15 bytes to {}", dir.join("fill_red.bin").display())]);
    assert_eq!(std::fs::read(dir.join("fill_red.bin")).unwrap().len(), 15);
    assert!(!dir.join("color_cycle.bin").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
