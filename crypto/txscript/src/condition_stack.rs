/// Tracks nested IF/NOTIF/ELSE branches without materializing the stack of booleans.
///
/// Only emptiness and "every branch is taken" are observable, so storing the size of
/// the implied stack and the position of its first false value is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConditionStack {
    size: u32,
    first_false_pos: u32,
}

impl ConditionStack {
    const NO_FALSE: u32 = u32::MAX;

    pub fn new() -> Self {
        Self { size: 0, first_false_pos: Self::NO_FALSE }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn all_true(&self) -> bool {
        self.first_false_pos == Self::NO_FALSE
    }

    pub fn push_back(&mut self, value: bool) {
        if self.first_false_pos == Self::NO_FALSE && !value {
            self.first_false_pos = self.size;
        }
        self.size += 1;
    }

    /// Callers check [`Self::is_empty`] first.
    pub fn pop_back(&mut self) {
        self.size -= 1;
        if self.first_false_pos == self.size {
            self.first_false_pos = Self::NO_FALSE;
        }
    }

    /// Callers check [`Self::is_empty`] first.
    pub fn toggle_top(&mut self) {
        if self.first_false_pos == Self::NO_FALSE {
            self.first_false_pos = self.size - 1;
        } else if self.first_false_pos == self.size - 1 {
            self.first_false_pos = Self::NO_FALSE;
        }
        // Toggling a value above the first false one is unobservable
    }
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self::new()
    }
}
