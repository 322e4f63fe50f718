/// Per-frame allowance for starting new work (e.g. network fetches).
///
/// Budgets are abstract units, not wall-clock time, so the number of fetches
/// started in a frame only depends on what was queued.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameBudget {
    remaining_units: u32,
}

impl FrameBudget {
    pub fn new(units: u32) -> Self {
        Self {
            remaining_units: units,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            remaining_units: u32::MAX,
        }
    }

    pub fn remaining_units(&self) -> u32 {
        self.remaining_units
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_units == 0
    }

    /// Takes `units` if the budget covers them; otherwise leaves it untouched.
    pub fn try_consume(&mut self, units: u32) -> bool {
        match self.remaining_units.checked_sub(units) {
            Some(rest) => {
                self.remaining_units = rest;
                true
            }
            None => false,
        }
    }
}
