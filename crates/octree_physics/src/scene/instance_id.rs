//! Instance id allocation
//!
//! Ids are eight lowercase letters counted in base 26. The allocator is an
//! explicit object owned by the scene; two scenes never share a counter.

const ID_LEN: usize = 8;

/// Hands out unique eight-letter instance ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    current: [u8; ID_LEN],
}

impl IdAllocator {
    /// Start from `"aaaaaaaa"`; the first id handed out is `"aaaaaaab"`
    pub fn new() -> Self {
        Self {
            current: [b'a'; ID_LEN],
        }
    }

    /// The most recently handed out id
    pub fn current(&self) -> &str {
        // Only ever holds ASCII lowercase letters
        std::str::from_utf8(&self.current).unwrap_or_default()
    }

    /// Advance the counter and return the new id
    ///
    /// `"zzzzzzzz"` wraps around to `"aaaaaaaa"`.
    pub fn next_id(&mut self) -> String {
        for digit in self.current.iter_mut().rev() {
            if *digit == b'z' {
                *digit = b'a';
            } else {
                *digit += 1;
                break;
            }
        }
        self.current().to_string()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
