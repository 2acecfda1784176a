//! Exercises the public CLI contract end to end: a small source file in,
//! a `.prg` on disk out. Mirrors the teacher's `vex::test::write_read`
//! round-trip style, adapted from a binary-format round trip to an
//! assemble-then-read-the-output round trip.

use badass::{Cli, OutputFormat};
use std::path::PathBuf;

fn unique_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("badass-cli-test-{}-{}", std::process::id(), name))
}

#[test]
fn assembles_a_source_file_to_a_prg() {
    let src = unique_path("hello.asm");
    let out = unique_path("hello.prg");
    std::fs::write(&src, "!org $0801\nstart:\n lda #$01\n sta $d020\n rts\n").unwrap();

    let cli = Cli { sources: vec![src.clone()], out: Some(out.clone()), format: OutputFormat::Prg, quiet: true, ..Cli::default() };
    badass::run(&cli).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..2], &[0x01, 0x08]); // little-endian load address $0801
    assert_eq!(bytes[2], 0xA9); // LDA #imm opcode

    std::fs::remove_file(&src).ok();
    std::fs::remove_file(&out).ok();
}

#[test]
fn no_source_files_is_an_error() {
    let cli = Cli::default();
    assert!(badass::run(&cli).is_err());
}
