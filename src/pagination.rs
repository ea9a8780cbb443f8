use serde::{Deserialize, Serialize};

/// How many pages the viewer shows at once. In spread mode the left page of
/// the pair always sits on an even index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Single,
    Spread,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Single => Self::Spread,
            Self::Spread => Self::Single,
        }
    }
}

/// Spread mode degenerates to a single page (plus an end-of-document
/// placeholder) when there is at most one page, so navigation steps by 1.
pub fn spread_active(mode: DisplayMode, total: usize) -> bool {
    mode == DisplayMode::Spread && total > 1
}

fn step(mode: DisplayMode, total: usize) -> usize {
    if spread_active(mode, total) { 2 } else { 1 }
}

/// Advance one turn. Spread mode steps by 2 while a full pair remains, then
/// by 1 onto the forced terminal single page of an even-length tail.
pub fn next(current: usize, total: usize, mode: DisplayMode) -> usize {
    match mode {
        DisplayMode::Single => {
            if current + 1 < total {
                current + 1
            } else {
                current
            }
        }
        DisplayMode::Spread => {
            if current + 2 < total {
                current + 2
            } else if current + 1 < total {
                current + 1
            } else {
                current
            }
        }
    }
}

/// Retreat one turn. Spread mode steps by 2, collapsing to 0 from index 1
/// (the only odd index reachable below 2 is the terminal re-snap case).
pub fn prev(current: usize, total: usize, mode: DisplayMode) -> usize {
    let _ = total;
    match mode {
        DisplayMode::Single => current.saturating_sub(1),
        DisplayMode::Spread => {
            if current >= 2 {
                current - 2
            } else {
                0
            }
        }
    }
}

/// Clamp into `[0, total - 1]` (0 when the document is empty) and, in spread
/// mode, snap odd targets down so the displayed pair starts on an even index.
pub fn jump_to(target: usize, total: usize, mode: DisplayMode) -> usize {
    if total == 0 {
        return 0;
    }
    let clamped = target.min(total - 1);
    if spread_active(mode, total) && clamped % 2 == 1 {
        clamped - 1
    } else {
        clamped
    }
}

/// Whether a forward affordance should be offered. This is deliberately
/// stricter than `next` in spread mode: the terminal odd single page is
/// reachable only through `jump_to`, never through the next button or
/// autoplay.
pub fn can_go_next(current: usize, total: usize, mode: DisplayMode) -> bool {
    current + step(mode, total) < total
}

pub fn can_go_prev(current: usize) -> bool {
    current > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_walks_one_page_at_a_time() {
        assert_eq!(next(0, 3, DisplayMode::Single), 1);
        assert_eq!(next(2, 3, DisplayMode::Single), 2);
        assert_eq!(prev(2, 3, DisplayMode::Single), 1);
        assert_eq!(prev(0, 3, DisplayMode::Single), 0);
    }

    #[test]
    fn spread_mode_walks_five_pages_as_specified() {
        // 5 pages: 0 -> 2 -> 4 -> stay.
        let mut idx = 0;
        idx = next(idx, 5, DisplayMode::Spread);
        assert_eq!(idx, 2);
        idx = next(idx, 5, DisplayMode::Spread);
        assert_eq!(idx, 4);
        idx = next(idx, 5, DisplayMode::Spread);
        assert_eq!(idx, 4);
    }

    #[test]
    fn spread_mode_enters_terminal_single_page_on_even_totals() {
        // 4 pages: 0 -> 2 -> 3 (page 4 alone) -> stay.
        assert_eq!(next(2, 4, DisplayMode::Spread), 3);
        assert_eq!(next(3, 4, DisplayMode::Spread), 3);
    }

    #[test]
    fn spread_prev_collapses_to_zero_from_low_indices() {
        assert_eq!(prev(4, 5, DisplayMode::Spread), 2);
        assert_eq!(prev(1, 4, DisplayMode::Spread), 0);
        assert_eq!(prev(0, 4, DisplayMode::Spread), 0);
    }

    #[test]
    fn jump_to_clamps_and_snaps_even() {
        assert_eq!(jump_to(99, 5, DisplayMode::Single), 4);
        assert_eq!(jump_to(3, 5, DisplayMode::Spread), 2);
        assert_eq!(jump_to(4, 5, DisplayMode::Spread), 4);
        assert_eq!(jump_to(7, 0, DisplayMode::Spread), 0);
        // total == 1: spread is not active, no snapping needed.
        assert_eq!(jump_to(5, 1, DisplayMode::Spread), 0);
    }

    #[test]
    fn can_go_next_uses_the_effective_step() {
        assert!(can_go_next(0, 2, DisplayMode::Single));
        assert!(!can_go_next(1, 2, DisplayMode::Single));
        assert!(can_go_next(0, 3, DisplayMode::Spread));
        assert!(!can_go_next(2, 4, DisplayMode::Spread));
        assert!(!can_go_next(0, 1, DisplayMode::Spread));
        assert!(!can_go_next(0, 0, DisplayMode::Single));
    }

    #[test]
    fn index_stays_in_bounds_under_arbitrary_walks() {
        for total in 0usize..8 {
            for mode in [DisplayMode::Single, DisplayMode::Spread] {
                let mut idx = 0usize;
                // A fixed pseudo-random walk is enough to exercise every edge.
                for step_no in 0..64 {
                    idx = match step_no % 3 {
                        0 => next(idx, total, mode),
                        1 => prev(idx, total, mode),
                        _ => jump_to(step_no, total, mode),
                    };
                    if total == 0 {
                        assert_eq!(idx, 0);
                    } else {
                        assert!(idx < total, "idx={idx} total={total} mode={mode:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn spread_index_is_even_except_forced_terminal() {
        for total in 2usize..9 {
            let mut idx = 0usize;
            for _ in 0..32 {
                idx = next(idx, total, DisplayMode::Spread);
                let terminal_single = idx == total - 1 && total % 2 == 0;
                assert!(
                    idx % 2 == 0 || terminal_single,
                    "idx={idx} total={total}"
                );
            }
        }
    }
}
