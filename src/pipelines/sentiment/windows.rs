/// Half-open token range `[start, end)` covered by one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenWindow {
    /// First token index in the window.
    pub start: usize,
    /// One past the last token index in the window.
    pub end: usize,
}

impl TokenWindow {
    /// Number of tokens in the window.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the window covers no tokens.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Sliding windows over `len` tokens.
///
/// Windows hold at most `max_len` tokens and start at `0, max_len - stride,
/// 2 * (max_len - stride), ...`; the last one ends exactly at `len`. Always
/// returns at least one window, so an empty sequence maps to `[0, 0)`.
///
/// Callers must keep `stride < max_len`; the builders reject anything else.
pub fn token_windows(len: usize, max_len: usize, stride: usize) -> Vec<TokenWindow> {
    let step = max_len.saturating_sub(stride).max(1);
    let mut windows = Vec::with_capacity(window_count(len, max_len, stride));
    let mut start = 0usize;

    loop {
        let end = (start + max_len).min(len);
        windows.push(TokenWindow { start, end });
        if end == len {
            break;
        }
        start += step;
    }

    windows
}

/// Number of windows [`token_windows`] produces for `len` tokens.
pub fn window_count(len: usize, max_len: usize, stride: usize) -> usize {
    if len <= max_len {
        return 1;
    }
    let step = max_len.saturating_sub(stride).max(1);
    (len - max_len).div_ceil(step) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sequence_is_one_window() {
        assert_eq!(
            token_windows(10, 512, 128),
            vec![TokenWindow { start: 0, end: 10 }]
        );
    }

    #[test]
    fn empty_sequence_still_has_one_window() {
        let windows = token_windows(0, 8, 2);
        assert_eq!(windows.len(), 1);
        assert!(windows[0].is_empty());
    }

    #[test]
    fn windows_overlap_by_stride() {
        let windows = token_windows(20, 8, 2);
        assert_eq!(
            windows,
            vec![
                TokenWindow { start: 0, end: 8 },
                TokenWindow { start: 6, end: 14 },
                TokenWindow { start: 12, end: 20 },
            ]
        );
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, 2);
        }
    }

    #[test]
    fn last_window_may_be_short() {
        let windows = token_windows(15, 8, 2);
        assert_eq!(windows.last(), Some(&TokenWindow { start: 12, end: 15 }));
        assert_eq!(windows.last().map(TokenWindow::len), Some(3));
    }

    #[test]
    fn count_matches_closed_form_and_covers_range() {
        for &(max_len, stride) in &[(8usize, 2usize), (512, 128), (5, 4), (3, 0)] {
            for len in 0..200 {
                let windows = token_windows(len, max_len, stride);

                let expected = if len <= max_len {
                    1
                } else {
                    (len - max_len).div_ceil(max_len - stride) + 1
                };
                assert_eq!(windows.len(), expected, "len={len} L={max_len} S={stride}");
                assert_eq!(window_count(len, max_len, stride), expected);

                assert_eq!(windows[0].start, 0);
                assert_eq!(windows.last().map(|w| w.end), Some(len));
                for w in &windows {
                    assert!(w.len() <= max_len);
                }
                for pair in windows.windows(2) {
                    // no gaps
                    assert!(pair[1].start <= pair[0].end);
                    assert_eq!(pair[0].end - pair[1].start, stride);
                }
            }
        }
    }
}
