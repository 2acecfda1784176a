use crate::register::Registers;
use crate::constants::MEM_SIZE;

/// A per-address hook consulted after every executed opcode whose PC lands
/// on a mapped address. Returns `true` to stop emulation.
pub type InterceptFn = Box<dyn FnMut(&Registers) -> bool>;

/// Direct-indexed 64K table of intercepts.
///
/// Checking "is there an intercept at this PC" is a single array index, and
/// costs nothing extra when the table is empty for that address.
pub struct Intercepts {
    slots: Vec<Option<InterceptFn>>,
    any: bool,
}

impl Intercepts {
    pub fn new() -> Intercepts {
        let mut slots = Vec::with_capacity(MEM_SIZE);
        slots.resize_with(MEM_SIZE, || None);
        Intercepts { slots, any: false }
    }

    pub fn set(&mut self, addr: u16, f: InterceptFn) {
        self.slots[addr as usize] = Some(f);
        self.any = true;
    }

    pub fn clear(&mut self, addr: u16) {
        self.slots[addr as usize] = None;
        self.any = self.slots.iter().any(Option::is_some);
    }

    /// Runs the intercept at `addr`, if any. Returns `true` if it fired and
    /// requested a stop.
    pub fn fire(&mut self, addr: u16, regs: &Registers) -> bool {
        if !self.any {
            return false;
        }
        match &mut self.slots[addr as usize] {
            Some(f) => f(regs),
            None => false,
        }
    }
}

impl Default for Intercepts {
    fn default() -> Self {
        Intercepts::new()
    }
}
