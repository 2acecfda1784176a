//! A memory-mapped tile/color-grid text device for the emulator's
//! `--run` mode.
//!
//! Grounded on `original_source/src/text_emu.h`/`.cpp`'s `TextEmu`: one
//! register page plus two further pages acting as the character and color
//! planes, driven through `sixfive`'s [`PageHandler`] the same way the
//! original drives it through callback-mapped memory. Actually drawing to a
//! terminal is left to a host-supplied [`Display`] implementor — terminal
//! rendering is out of scope here, only the memory-mapped state machine is.

pub mod encoding;
pub mod reg;

pub use reg::Reg;

use sixfive::memory::{CallbackMemory, PageHandler};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

const PALETTE_LEN: usize = 128;

/// A C64-style RGB palette, two 16-colour banks back to back so bit 7 of a
/// screen code can flip foreground/background by indexing the other half.
const DEFAULT_PALETTE: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0xFF, 0xFF, 0xFF),
    (0x68, 0x37, 0x2B),
    (0x70, 0xA4, 0xB2),
    (0x6F, 0x3D, 0x86),
    (0x58, 0x8D, 0x43),
    (0x35, 0x28, 0x79),
    (0xB8, 0xC7, 0x6F),
    (0x6F, 0x4F, 0x25),
    (0x43, 0x39, 0x00),
    (0x9A, 0x67, 0x59),
    (0x44, 0x44, 0x44),
    (0x6C, 0x6C, 0x6C),
    (0x9A, 0xD2, 0x84),
    (0x6C, 0x5E, 0xB5),
    (0x95, 0x95, 0x95),
];

/// A host-supplied terminal surface. `badass-text` only computes what
/// should appear where; drawing it is the caller's concern.
pub trait Display {
    fn put(&mut self, x: u16, y: u16, ch: char, fg: (u8, u8, u8), bg: (u8, u8, u8));
    /// Current terminal size, polled once per [`TextDevice::tick`].
    fn size(&self) -> (u16, u16);
}

/// No-op display used by tests and headless runs (`--run` without a
/// terminal attached).
#[derive(Default)]
pub struct NullDisplay {
    pub puts: Vec<(u16, u16, char)>,
}

impl Display for NullDisplay {
    fn put(&mut self, x: u16, y: u16, ch: char, _fg: (u8, u8, u8), _bg: (u8, u8, u8)) {
        self.puts.push((x, y, ch));
    }

    fn size(&self) -> (u16, u16) {
        (80, 25)
    }
}

pub struct TextDevice<D: Display> {
    regs: [u8; Reg::COUNT],
    palette: [u8; PALETTE_LEN],
    text_ram: Vec<u8>,
    color_ram: Vec<u8>,
    keys: VecDeque<u8>,
    start: Instant,
    display: D,
}

impl<D: Display> TextDevice<D> {
    pub fn new(display: D) -> TextDevice<D> {
        let (rw, rh) = display.size();
        let mut regs = [0u8; Reg::COUNT];
        regs[Reg::WinW as usize] = 40;
        regs[Reg::WinH as usize] = 25;
        regs[Reg::WinX as usize] = ((rw.saturating_sub(40)) / 2) as u8;
        regs[Reg::WinY as usize] = ((rh.saturating_sub(25)) / 2) as u8;
        regs[Reg::RealW as usize] = rw.min(255) as u8;
        regs[Reg::RealH as usize] = rh.min(255) as u8;
        regs[Reg::TextPtr as usize] = 0x04;
        regs[Reg::ColorPtr as usize] = 0xd8;
        regs[Reg::Freq as usize] = 50;

        // Filled twice: `rgb((col >> 4) + 16)` reads the foreground half
        // starting at colour 16, mirroring the background half below it.
        let mut palette = [0u8; PALETTE_LEN];
        for (i, &(r, g, b)) in DEFAULT_PALETTE.iter().enumerate() {
            palette[i * 3] = r;
            palette[i * 3 + 1] = g;
            palette[i * 3 + 2] = b;
            palette[(i + 16) * 3] = r;
            palette[(i + 16) * 3 + 1] = g;
            palette[(i + 16) * 3 + 2] = b;
        }

        let mut device = TextDevice {
            regs,
            palette,
            text_ram: Vec::new(),
            color_ram: Vec::new(),
            keys: VecDeque::new(),
            start: Instant::now(),
            display,
        };
        device.resize();
        device.text_ram.iter_mut().for_each(|c| *c = 0x20);
        device.color_ram.iter_mut().for_each(|c| *c = 0x01);
        device
    }

    /// Wraps this device for sharing between the three memory-mapped
    /// pages [`install`] wires up.
    pub fn shared(self) -> Rc<RefCell<TextDevice<D>>> {
        Rc::new(RefCell::new(self))
    }

    fn resize(&mut self) {
        let w = self.regs[Reg::WinW as usize] as usize;
        let h = self.regs[Reg::WinH as usize] as usize;
        let size = (w * h + 255) & !0xff;
        self.text_ram.resize(size, 0x20);
        self.color_ram.resize(size, 0x01);
    }

    fn rgb(&self, index: u8) -> (u8, u8, u8) {
        let i = index as usize * 3;
        (self.palette[i], self.palette[i + 1], self.palette[i + 2])
    }

    fn colors(&self, col: u8) -> ((u8, u8, u8), (u8, u8, u8)) {
        let bg = self.rgb(col & 0xf);
        let fg = self.rgb((col >> 4) + 16);
        (fg, bg)
    }

    fn draw(&mut self, offset: usize) {
        let w = self.regs[Reg::WinW as usize] as usize;
        if w == 0 || offset >= self.text_ram.len() {
            return;
        }
        let x = self.regs[Reg::WinX as usize] as u16 + (offset % w) as u16;
        let y = self.regs[Reg::WinY as usize] as u16 + (offset / w) as u16;
        let t = self.text_ram[offset];
        let mut c = self.color_ram[offset];
        if t & 0x80 != 0 {
            c = ((c << 4) & 0xf0) | (c >> 4);
        }
        let (fg, bg) = self.colors(c);
        self.display.put(x, y, encoding::screencode_to_char(t), fg, bg);
    }

    fn write_char(&mut self, offset: usize, value: u8) {
        if offset >= self.text_ram.len() {
            return;
        }
        self.text_ram[offset] = value;
        self.draw(offset);
    }

    fn write_color(&mut self, offset: usize, value: u8) {
        if offset >= self.color_ram.len() {
            return;
        }
        self.color_ram[offset] = value;
        self.draw(offset);
    }

    fn fill_outside(&mut self) {
        let (rw, rh) = self.display.size();
        let (wx, wy, ww, wh) = (
            self.regs[Reg::WinX as usize] as u16,
            self.regs[Reg::WinY as usize] as u16,
            self.regs[Reg::WinW as usize] as u16,
            self.regs[Reg::WinH as usize] as u16,
        );
        let col = self.regs[Reg::CFillOut as usize];
        let (fg, bg) = self.colors(col);
        for y in 0..rh {
            for x in 0..rw {
                if x < wx || x >= wx + ww || y < wy || y >= wy + wh {
                    self.display.put(x, y, ' ', fg, bg);
                }
            }
        }
    }

    fn set_reg(&mut self, offset: u8, value: u8) {
        let Some(reg) = Reg::from_offset(offset) else { return };
        self.regs[offset as usize] = value;
        match reg {
            Reg::CFillOut => self.fill_outside(),
            Reg::WinW | Reg::WinH | Reg::TextPtr | Reg::ColorPtr => self.resize(),
            _ => {}
        }
    }

    fn read_reg(&mut self, offset: u8) -> u8 {
        match Reg::from_offset(offset) {
            Some(Reg::Keys) => self.keys.pop_front().unwrap_or(0),
            Some(_) => self.regs[offset as usize],
            None => 0,
        }
    }

    pub fn push_key(&mut self, key: u8) {
        self.keys.push_back(key);
    }

    /// Advances the monotonic tick counter (`TimerLo`/`TimerHi`) from wall
    /// clock time and refreshes the read-only real-terminal-size registers.
    pub fn tick(&mut self) {
        let div = self.regs[Reg::Freq as usize].max(1) as u128;
        let frames = self.start.elapsed().as_millis() / div;
        self.regs[Reg::TimerLo as usize] = (frames & 0xff) as u8;
        self.regs[Reg::TimerHi as usize] = ((frames >> 8) & 0xff) as u8;

        let (rw, rh) = self.display.size();
        self.regs[Reg::RealW as usize] = rw.min(255) as u8;
        self.regs[Reg::RealH as usize] = rh.min(255) as u8;
    }

    pub fn should_stop(&self) -> bool {
        self.regs[Reg::Control as usize] & reg::control::STOP != 0
    }

    pub fn should_block_for_flush(&self) -> bool {
        self.regs[Reg::Control as usize] & reg::control::BLOCK_FOR_FLUSH != 0
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

/// Which of the three memory-mapped pages this handler answers for.
enum Role {
    Regs,
    Text,
    Color,
}

struct DevicePage<D: Display> {
    device: Rc<RefCell<TextDevice<D>>>,
    base: u8,
    role: Role,
}

impl<D: Display> PageHandler for DevicePage<D> {
    fn read(&mut self, offset: u8) -> u8 {
        let mut device = self.device.borrow_mut();
        match self.role {
            Role::Regs if offset >= 0x80 => device.palette[offset as usize - 0x80],
            Role::Regs => device.read_reg(offset),
            Role::Text => device.text_ram.get(offset as usize + self.base as usize * 256).copied().unwrap_or(0),
            Role::Color => device.color_ram.get(offset as usize + self.base as usize * 256).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, offset: u8, value: u8) {
        let mut device = self.device.borrow_mut();
        match self.role {
            Role::Regs if offset >= 0x80 => device.palette[offset as usize - 0x80] = value,
            Role::Regs => device.set_reg(offset, value),
            Role::Text => device.write_char(offset as usize + self.base as usize * 256, value),
            Role::Color => device.write_color(offset as usize + self.base as usize * 256, value),
        }
    }
}

/// Maps the register page at `$d700` plus the character/color planes
/// (wherever `TextPtr`/`ColorPtr` currently point) onto `mem`. Re-call after
/// changing `TextPtr`/`ColorPtr` to move the mapped planes.
pub fn install<D: Display + 'static>(device: &Rc<RefCell<TextDevice<D>>>, mem: &mut CallbackMemory) {
    let (text_ptr, color_ptr, banks) = {
        let d = device.borrow();
        let banks = (d.text_ram.len() / 256).max(1) as u8;
        (d.regs[Reg::TextPtr as usize], d.regs[Reg::ColorPtr as usize], banks)
    };

    mem.map(0xd7, Box::new(DevicePage { device: device.clone(), base: 0, role: Role::Regs }));
    for b in 0..banks {
        mem.map(
            text_ptr.wrapping_add(b),
            Box::new(DevicePage { device: device.clone(), base: b, role: Role::Text }),
        );
        mem.map(
            color_ptr.wrapping_add(b),
            Box::new(DevicePage { device: device.clone(), base: b, role: Role::Color }),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_device_centers_the_window_in_the_display() {
        let device = TextDevice::new(NullDisplay::default());
        assert_eq!(device.regs[Reg::WinX as usize], 20);
        assert_eq!(device.regs[Reg::WinY as usize], 0);
    }

    #[test]
    fn writing_a_key_is_readable_once_through_the_fifo() {
        let mut device = TextDevice::new(NullDisplay::default());
        device.push_key(b'A');
        assert_eq!(device.read_reg(Reg::Keys as u8), b'A');
        assert_eq!(device.read_reg(Reg::Keys as u8), 0);
    }

    #[test]
    fn writing_text_ram_draws_through_the_display() {
        let mut device = TextDevice::new(NullDisplay::default());
        device.write_char(0, 0x01); // screen code 'A'
        assert_eq!(device.display().puts.last().unwrap().2, 'A');
    }

    #[test]
    fn control_register_bits_are_independent() {
        let mut device = TextDevice::new(NullDisplay::default());
        device.set_reg(Reg::Control as u8, reg::control::STOP);
        assert!(device.should_stop());
        assert!(!device.should_block_for_flush());
    }

    #[test]
    fn install_maps_register_and_plane_pages() {
        let device = TextDevice::new(NullDisplay::default()).shared();
        let mut mem = CallbackMemory::new();
        install(&device, &mut mem);
        // register page write round-trips through the shared device
        use sixfive::memory::Memory;
        mem.write(0xd700 + Reg::CFillOut as u16, 5);
        assert_eq!(device.borrow().regs[Reg::CFillOut as usize], 5);
    }
}
