//! Writes laid-out sections to a final output byte format.
//!
//! Grounded on the teacher's `vexfile` (a small `byteorder`-based
//! reader/writer pair over a `Read`/`Write` generic), generalized from a
//! single custom format to the three formats the original assembler
//! supports: raw concatenation, a C64 PRG load header, and a C64 CRT
//! cartridge image (`original_source/src/machine.cpp`'s
//! `Machine::write`/`writeCrt`).

use badass_asm::section::Section;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{self, Write};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no sections produced any data")]
    NoData,
    #[error("section '{name}' overlaps the previous one (starts at ${start:04x}, previous ended at ${prev_end:04x})")]
    Overlap { name: String, start: u32, prev_end: u32 },
    #[error("CRT output requires addresses in $8000-$bfff, got ${start:04x}-${end:04x} for section '{name}'")]
    OutOfCrtRange { name: String, start: u32, end: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Raw,
    Prg,
    Crt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(OutputFormat::Raw),
            "prg" => Ok(OutputFormat::Prg),
            "crt" => Ok(OutputFormat::Crt),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Non-empty, storable sections in address order; mirrors `Machine::write`'s
/// `non_empty` filter-then-sort.
fn storable(sections: &[Section]) -> Vec<&Section> {
    let mut v: Vec<&Section> = sections.iter().filter(|s| !s.data.is_empty() && !s.flags.no_storage).collect();
    v.sort_by_key(|s| s.start.unwrap_or(0));
    v
}

/// Concatenates section bytes in address order, zero-padding any gaps.
fn write_body<W: Write>(w: &mut W, sections: &[&Section]) -> Result<(), Error> {
    let mut last_end: Option<u32> = None;
    for section in sections {
        let start = section.start.unwrap_or(0);
        if let Some(end) = last_end {
            if start < end {
                return Err(Error::Overlap { name: section.name.clone(), start, prev_end: end });
            }
            for _ in 0..(start - end) {
                w.write_u8(0)?;
            }
        }
        w.write_all(&section.data)?;
        last_end = Some(start + section.data.len() as u32);
    }
    Ok(())
}

/// Raw concatenation of section bytes, zero-padded between.
pub fn write_raw<W: Write>(w: &mut W, sections: &[Section]) -> Result<(), Error> {
    let storable = storable(sections);
    if storable.is_empty() {
        return Err(Error::NoData);
    }
    write_body(w, &storable)
}

/// A 2-byte little-endian load address, then as [`write_raw`].
pub fn write_prg<W: Write>(w: &mut W, sections: &[Section]) -> Result<(), Error> {
    let storable = storable(sections);
    let start = storable.first().ok_or(Error::NoData)?.start.unwrap_or(0);
    w.write_u8(start as u8)?;
    w.write_u8((start >> 8) as u8)?;
    write_body(w, &storable)
}

const CHIP_BANK_SIZE: usize = 0x4000;

/// A C64 cartridge image: a 64-byte header then one `CHIP` record per bank
/// touched by `$8000-$bfff`-range sections.
pub fn write_crt<W: Write>(w: &mut W, label: &str, sections: &[Section]) -> Result<(), Error> {
    let storable = storable(sections);
    if storable.is_empty() {
        return Err(Error::NoData);
    }

    let mut banks: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    let mut banked = false;
    let mut game = 1u8;

    for section in &storable {
        let addr = section.start.unwrap_or(0);
        let bank = addr >> 16;
        let start = addr & 0xffff;
        let end = start + section.data.len() as u32;
        if start < 0x8000 || end > 0xc000 {
            return Err(Error::OutOfCrtRange { name: section.name.clone(), start, end });
        }
        if end >= 0xa000 {
            game = 0;
        }
        if bank > 0 {
            banked = true;
        }
        let chip = banks.entry(bank).or_insert_with(|| vec![0u8; CHIP_BANK_SIZE]);
        let offset = (start - 0x8000) as usize;
        chip[offset..offset + section.data.len()].copy_from_slice(&section.data);
    }

    w.write_all(b"C64 CARTRIDGE   ")?;
    w.write_u32::<BigEndian>(0x40)?;
    w.write_u16::<BigEndian>(0x0100)?;
    w.write_u16::<BigEndian>(if banked { 32 } else { 0 })?;
    w.write_u8(0)?; // exrom
    w.write_u8(game)?;
    w.write_all(&[0u8; 6])?;
    let mut label_bytes = [0u8; 32];
    let bytes = label.as_bytes();
    let n = bytes.len().min(32);
    label_bytes[..n].copy_from_slice(&bytes[..n]);
    w.write_all(&label_bytes)?;

    for (bank, data) in &banks {
        w.write_all(b"CHIP")?;
        w.write_u32::<BigEndian>(data.len() as u32 + 0x10)?;
        w.write_u16::<BigEndian>(0)?; // ROM
        w.write_u16::<BigEndian>(*bank as u16)?;
        w.write_u16::<BigEndian>(0x8000)?;
        w.write_u16::<BigEndian>(data.len() as u16)?;
        w.write_all(data)?;
    }
    Ok(())
}

pub fn write<W: Write>(w: &mut W, format: OutputFormat, label: &str, sections: &[Section]) -> Result<(), Error> {
    match format {
        OutputFormat::Raw => write_raw(w, sections),
        OutputFormat::Prg => write_prg(w, sections),
        OutputFormat::Crt => write_crt(w, label, sections),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn section(name: &str, start: u32, data: Vec<u8>) -> Section {
        let mut s = Section::new(name, start);
        for b in data {
            s.add_byte(b);
        }
        s
    }

    #[test]
    fn raw_pads_gaps_with_zero() {
        let sections = vec![section("a", 0x10, vec![1, 2]), section("b", 0x20, vec![3])];
        let mut out = Vec::new();
        write_raw(&mut out, &sections).unwrap();
        assert_eq!(out.len(), 0x20 - 0x10 + 1);
        assert_eq!(out[0], 1);
        assert_eq!(out[1], 2);
        assert_eq!(*out.last().unwrap(), 3);
    }

    #[test]
    fn prg_prefixes_little_endian_load_address() {
        let sections = vec![section("a", 0x0801, vec![0xAA])];
        let mut out = Vec::new();
        write_prg(&mut out, &sections).unwrap();
        assert_eq!(&out[..2], &[0x01, 0x08]);
        assert_eq!(out[2], 0xAA);
    }

    #[test]
    fn crt_header_starts_with_the_c64_magic() {
        let sections = vec![section("a", 0x8000, vec![1, 2, 3])];
        let mut out = Vec::new();
        write_crt(&mut out, "TEST", &sections).unwrap();
        assert_eq!(&out[..16], b"C64 CARTRIDGE   ");
        assert_eq!(&out[64..68], b"CHIP");
    }

    #[test]
    fn crt_rejects_addresses_outside_cartridge_rom_window() {
        let sections = vec![section("a", 0x1000, vec![1])];
        let mut out = Vec::new();
        assert!(write_crt(&mut out, "TEST", &sections).is_err());
    }

    #[test]
    fn no_sections_is_an_error() {
        let mut out = Vec::new();
        assert!(write_raw(&mut out, &[]).is_err());
    }
}
