//! Sliding word-window chunker.
//!
//! Splits one page of text into fixed-size windows of whitespace-separated
//! words. Consecutive windows share `overlap` words. Windows never cross
//! a page boundary; the caller windows each page separately.

/// Default window size in words.
pub const DEFAULT_WINDOW_SIZE: usize = 300;
/// Default number of words shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 50;

/// Window size and overlap, in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub size: usize,
    pub overlap: usize,
}

impl WindowParams {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }

    /// Distance in words between the starts of consecutive windows.
    ///
    /// Clamped to 1 when `overlap >= size` so iteration always advances.
    pub fn step(&self) -> usize {
        self.size.saturating_sub(self.overlap).max(1)
    }
}

impl Default for WindowParams {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_OVERLAP)
    }
}

/// Split `text` into overlapping word windows.
///
/// Each window holds up to `params.size` words joined by single spaces.
/// Window starts advance by [`WindowParams::step`] until they reach the
/// end of the word sequence, so the last window may be shorter than
/// `size`; it is kept as-is. A `size` of zero produces no windows.
pub fn window(text: &str, params: WindowParams) -> Vec<String> {
    if params.size == 0 {
        return Vec::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let step = params.step();

    (0..words.len())
        .step_by(step)
        .map(|start| {
            let end = (start + params.size).min(words.len());
            words[start..end].join(" ")
        })
        .filter(|w| !w.is_empty())
        .collect()
}
