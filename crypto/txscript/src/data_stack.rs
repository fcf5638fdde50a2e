use crate::script_num::ScriptNum;
use radiant_txscript_errors::ScriptError;

pub(crate) type Stack = Vec<Vec<u8>>;

/// Bounds-checked access to the main and alt stacks. Every underflow is reported as
/// [`ScriptError::InvalidStackOperation`].
pub(crate) trait DataStack {
    /// Element at `offset` from the end; `-1` is the top.
    fn top(&self, offset: isize) -> Result<&Vec<u8>, ScriptError>;
    fn top_mut(&mut self, offset: isize) -> Result<&mut Vec<u8>, ScriptError>;
    fn pop_item(&mut self) -> Result<Vec<u8>, ScriptError>;
    fn pop_raw<const SIZE: usize>(&mut self) -> Result<[Vec<u8>; SIZE], ScriptError>;
    fn peek_raw<const SIZE: usize>(&self) -> Result<[Vec<u8>; SIZE], ScriptError>;
    fn push_num(&mut self, num: ScriptNum);
    fn push_bool(&mut self, value: bool);
    fn drop_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn dup_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn over_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn rot_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
    fn swap_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError>;
}

/// Any non zero byte makes an element true, except a lone sign bit in the last byte
/// (negative zero).
pub fn cast_to_bool(v: &[u8]) -> bool {
    match v.split_last() {
        None => false,
        Some((&last, rest)) => last & 0x7f != 0 || rest.iter().any(|&b| b != 0),
    }
}

#[inline]
fn index_of(len: usize, offset: isize) -> Result<usize, ScriptError> {
    match len.checked_add_signed(offset) {
        Some(idx) if offset < 0 && idx < len => Ok(idx),
        _ => Err(ScriptError::InvalidStackOperation),
    }
}

impl DataStack for Stack {
    #[inline]
    fn top(&self, offset: isize) -> Result<&Vec<u8>, ScriptError> {
        let idx = index_of(self.len(), offset)?;
        Ok(&self[idx])
    }

    #[inline]
    fn top_mut(&mut self, offset: isize) -> Result<&mut Vec<u8>, ScriptError> {
        let idx = index_of(self.len(), offset)?;
        Ok(&mut self[idx])
    }

    #[inline]
    fn pop_item(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.pop().ok_or(ScriptError::InvalidStackOperation)
    }

    #[inline]
    fn pop_raw<const SIZE: usize>(&mut self) -> Result<[Vec<u8>; SIZE], ScriptError> {
        if self.len() < SIZE {
            return Err(ScriptError::InvalidStackOperation);
        }
        <[Vec<u8>; SIZE]>::try_from(self.split_off(self.len() - SIZE)).map_err(|_| ScriptError::InvalidStackOperation)
    }

    #[inline]
    fn peek_raw<const SIZE: usize>(&self) -> Result<[Vec<u8>; SIZE], ScriptError> {
        if self.len() < SIZE {
            return Err(ScriptError::InvalidStackOperation);
        }
        <[Vec<u8>; SIZE]>::try_from(self[self.len() - SIZE..].to_vec()).map_err(|_| ScriptError::InvalidStackOperation)
    }

    #[inline]
    fn push_num(&mut self, num: ScriptNum) {
        self.push(num.serialize());
    }

    #[inline]
    fn push_bool(&mut self, value: bool) {
        self.push(if value { vec![1] } else { vec![] });
    }

    #[inline]
    fn drop_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= SIZE {
            true => {
                self.truncate(self.len() - SIZE);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation),
        }
    }

    #[inline]
    fn dup_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= SIZE {
            true => {
                self.extend_from_within(self.len() - SIZE..);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation),
        }
    }

    #[inline]
    fn over_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= 2 * SIZE {
            true => {
                self.extend_from_within(self.len() - 2 * SIZE..self.len() - SIZE);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation),
        }
    }

    #[inline]
    fn rot_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= 3 * SIZE {
            true => {
                let drained = self.drain(self.len() - 3 * SIZE..self.len() - 2 * SIZE).collect::<Vec<Vec<u8>>>();
                self.extend(drained);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation),
        }
    }

    #[inline]
    fn swap_items<const SIZE: usize>(&mut self) -> Result<(), ScriptError> {
        match self.len() >= 2 * SIZE {
            true => {
                let drained = self.drain(self.len() - 2 * SIZE..self.len() - SIZE).collect::<Vec<Vec<u8>>>();
                self.extend(drained);
                Ok(())
            }
            false => Err(ScriptError::InvalidStackOperation),
        }
    }
}
