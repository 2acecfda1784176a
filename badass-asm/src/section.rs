//! Sections: named, possibly-nested spans of output bytes with either a
//! fixed or floating start address, laid out into final addresses once
//! every section has been declared.

use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionFlags {
    /// May not directly hold bytes; only groups children (a non-leaf section).
    pub no_storage: bool,
    pub write_to_disk: bool,
    pub read_only: bool,
    /// Keep this section first even if a new first section is later added.
    pub keep_first: bool,
    pub keep_last: bool,
    /// `start` was given explicitly and may not move during layout.
    pub fixed_start: bool,
    /// `size` was given explicitly; overflow is an error rather than growth.
    pub fixed_size: bool,
}

#[derive(Clone, Debug)]
pub struct Section {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub start: Option<u32>,
    pub pc: u32,
    pub size: Option<u32>,
    pub flags: SectionFlags,
    pub data: Vec<u8>,
    pub valid: bool,
}

impl Section {
    pub fn new(name: impl Into<String>, start: u32) -> Section {
        Section {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            start: Some(start),
            pc: start,
            size: None,
            flags: SectionFlags {
                fixed_start: true,
                ..Default::default()
            },
            data: Vec::new(),
            valid: true,
        }
    }

    pub fn floating(name: impl Into<String>) -> Section {
        Section {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            start: None,
            pc: 0,
            size: None,
            flags: SectionFlags::default(),
            data: Vec::new(),
            valid: true,
        }
    }

    pub fn with_parent(name: impl Into<String>, parent: impl Into<String>) -> Section {
        Section {
            name: name.into(),
            parent: Some(parent.into()),
            ..Section::floating("")
        }
    }

    pub fn add_byte(&mut self, b: u8) -> &mut Self {
        self.data.push(b);
        self.pc = self.pc.wrapping_add(1);
        self
    }

    pub fn set_pc(&mut self, pc: u32) {
        if self.start == Some(self.pc) {
            self.start = Some(pc);
        }
        self.pc = pc;
    }

    pub fn end(&self) -> u32 {
        self.start.unwrap_or(0) + self.size.unwrap_or(self.data.len() as u32)
    }
}

/// The ordered collection of sections, their nesting, and the
/// push/pop "current section" stack the `!section` directive drives.
pub struct SectionTable {
    sections: Vec<Section>,
    current: usize,
    stack: Vec<usize>,
    anon_counter: u32,
}

impl SectionTable {
    pub fn new() -> SectionTable {
        let mut sections = Vec::new();
        sections.push(Section::new("default", 0));
        SectionTable {
            sections,
            current: 0,
            stack: Vec::new(),
            anon_counter: 0,
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    pub fn add_section(&mut self, section: Section) -> Result<(), Error> {
        if self.index_of(&section.name).is_some() {
            return Err(Error::Section(format!("section '{}' already exists", section.name)));
        }
        if let Some(parent) = section.parent.clone() {
            let parent_idx = self
                .index_of(&parent)
                .ok_or_else(|| Error::Section(format!("no such parent section '{parent}'")))?;
            let name = section.name.clone();
            self.sections.push(section);
            self.sections[parent_idx].children.push(name);
        } else {
            self.sections.push(section);
        }
        Ok(())
    }

    /// Creates and switches into an anonymous child of the current section,
    /// used for `!section { ... }` blocks with no name.
    pub fn push_anonymous(&mut self) -> Result<(), Error> {
        self.anon_counter += 1;
        let name = format!("__anon_{}", self.anon_counter);
        let parent = self.sections[self.current].name.clone();
        self.add_section(Section::with_parent(name.clone(), parent))?;
        self.push_section(&name)
    }

    pub fn push_section(&mut self, name: &str) -> Result<(), Error> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::Section(format!("no such section '{name}'")))?;
        self.stack.push(self.current);
        self.current = idx;
        Ok(())
    }

    pub fn pop_section(&mut self) -> Result<(), Error> {
        self.current = self
            .stack
            .pop()
            .ok_or_else(|| Error::Section("section stack underflow".into()))?;
        Ok(())
    }

    pub fn set_section(&mut self, name: &str) -> Result<(), Error> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::Section(format!("no such section '{name}'")))?;
        self.current = idx;
        Ok(())
    }

    pub fn remove_section(&mut self, name: &str) -> Result<(), Error> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::Section(format!("no such section '{name}'")))?;
        self.sections.remove(idx);
        if self.current >= self.sections.len() {
            self.current = 0;
        }
        Ok(())
    }

    pub fn current_section(&self) -> &Section {
        &self.sections[self.current]
    }

    pub fn current_section_mut(&mut self) -> &mut Section {
        &mut self.sections[self.current]
    }

    pub fn get_section(&self, name: &str) -> Option<&Section> {
        self.index_of(name).map(|i| &self.sections[i])
    }

    pub fn get_pc(&self) -> u32 {
        self.sections[self.current].pc
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn is_ancestor(&self, maybe_ancestor: &str, name: &str) -> bool {
        let mut cur = name.to_string();
        while let Some(section) = self.index_of(&cur).map(|i| &self.sections[i]) {
            match &section.parent {
                Some(p) if p == maybe_ancestor => return true,
                Some(p) => cur = p.clone(),
                None => return false,
            }
        }
        false
    }

    fn layout_section(&mut self, start: u32, idx: usize) -> Result<u32, Error> {
        let flags = self.sections[idx].flags;
        let children = self.sections[idx].children.clone();
        let cursor = if flags.fixed_start {
            self.sections[idx].start.unwrap_or(start)
        } else {
            start
        };
        self.sections[idx].start = Some(cursor);

        let end = if children.is_empty() {
            let len = self.sections[idx].data.len() as u32;
            let size = if flags.fixed_size {
                let declared = self.sections[idx].size.unwrap_or(len);
                if len > declared {
                    return Err(Error::Section(format!(
                        "section '{}' overflows its fixed size ({len} > {declared})",
                        self.sections[idx].name
                    )));
                }
                declared
            } else {
                len
            };
            self.sections[idx].size = Some(size);
            cursor + size
        } else {
            let mut child_cursor = cursor;
            for name in &children {
                let child_idx = self.index_of(name).expect("child recorded at add_section time");
                child_cursor = self.layout_section(child_cursor, child_idx)?;
            }
            let size = child_cursor - cursor;
            self.sections[idx].size = Some(size);
            child_cursor
        };

        self.sections[idx].pc = end;
        Ok(end)
    }

    /// Assigns final addresses to every section, floating ones packed after
    /// whatever came before them in declaration order.
    pub fn layout_sections(&mut self) -> Result<(), Error> {
        let roots: Vec<usize> = (0..self.sections.len())
            .filter(|&i| self.sections[i].parent.is_none())
            .collect();
        let mut cursor = 0u32;
        for idx in roots {
            cursor = self.layout_section(cursor, idx)?;
        }
        self.check_overlap()
    }

    /// Sibling (non-ancestor-related) sections may not occupy the same
    /// addresses.
    pub fn check_overlap(&self) -> Result<(), Error> {
        for i in 0..self.sections.len() {
            for j in (i + 1)..self.sections.len() {
                let a = &self.sections[i];
                let b = &self.sections[j];
                if self.is_ancestor(&a.name, &b.name) || self.is_ancestor(&b.name, &a.name) {
                    continue;
                }
                let (a_start, a_end) = (a.start.unwrap_or(0), a.end());
                let (b_start, b_end) = (b.start.unwrap_or(0), b.end());
                if a_start < b_end && b_start < a_end {
                    return Err(Error::Section(format!(
                        "sections '{}' and '{}' overlap (${a_start:04x}-${a_end:04x} vs ${b_start:04x}-${b_end:04x})",
                        a.name, b.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for SectionTable {
    fn default() -> Self {
        SectionTable::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn floating_sections_pack_after_each_other() {
        let mut t = SectionTable::new();
        t.current_section_mut().add_byte(1).add_byte(2);
        t.add_section(Section::floating("b")).unwrap();
        t.push_section("b").unwrap();
        t.current_section_mut().add_byte(3);
        t.layout_sections().unwrap();
        assert_eq!(t.get_section("default").unwrap().start, Some(0));
        assert_eq!(t.get_section("b").unwrap().start, Some(2));
    }

    #[test]
    fn overlapping_fixed_sections_are_rejected() {
        let mut t = SectionTable::new();
        t.current_section_mut().add_byte(1);
        t.add_section(Section::new("b", 0)).unwrap();
        t.push_section("b").unwrap();
        t.current_section_mut().add_byte(1);
        assert!(t.layout_sections().is_err());
    }

    #[test]
    fn child_sections_nest_inside_parent() {
        let mut t = SectionTable::new();
        t.add_section(Section::with_parent("child", "default")).unwrap();
        t.push_section("child").unwrap();
        t.current_section_mut().add_byte(0xAA);
        t.pop_section().unwrap();
        t.layout_sections().unwrap();
        let parent = t.get_section("default").unwrap();
        let child = t.get_section("child").unwrap();
        assert_eq!(child.start, parent.start);
        assert_eq!(parent.size, Some(1));
    }

    #[test]
    fn fixed_size_overflow_is_an_error() {
        let mut t = SectionTable::new();
        t.current_section_mut().flags.fixed_size = true;
        t.current_section_mut().size = Some(1);
        t.current_section_mut().add_byte(1).add_byte(2);
        assert!(t.layout_sections().is_err());
    }
}
