//! Per-frame NoChange / Diff / Full decision.
//!
//! Kept free of I/O so the outbound channel's policy can be exercised on
//! its own. One frame goes through three steps:
//!
//! 1. [`begin_frame`](FrameScheduler::begin_frame) decides whether a full
//!    send is forced before any diffing happens.
//! 2. [`plan`](FrameScheduler::plan) applies the decision table to the
//!    diff result.
//! 3. [`choose`](FrameScheduler::choose) compares encoded sizes, and
//!    [`commit`](FrameScheduler::commit) records what was actually sent.
//!
//! | Diff outcome                     | Plan                  |
//! |----------------------------------|-----------------------|
//! | forced                           | Full                  |
//! | no reference                     | Full                  |
//! | changed > total / divisor        | Full                  |
//! | changed == 0                     | NoChange              |
//! | otherwise                        | Compare sizes         |

use crate::config::FramePolicy;
use crate::stream::diff::DiffOutcome;
use crate::stream::protocol::FrameTypeTag;
use crate::stream::types::Parity;

/// Outcome of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Send the current checkerboard half.
    Full,
    /// Send only the NoChange tag.
    NoChange,
    /// Encode both the diff and the full half; send the smaller.
    Compare { changed_count: usize },
}

/// Staleness counter, checkerboard parity and the full-frame latch.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    policy: FramePolicy,
    force_frame: u32,
    last_frame_was_full: bool,
    parity: Parity,
    full_requested: bool,
}

impl FrameScheduler {
    pub fn new(policy: FramePolicy) -> Self {
        Self {
            policy,
            force_frame: 0,
            last_frame_was_full: false,
            parity: Parity::Even,
            full_requested: false,
        }
    }

    pub fn policy(&self) -> &FramePolicy {
        &self.policy
    }

    /// Staleness accumulated since the last complete full frame.
    pub fn force_frame(&self) -> u32 {
        self.force_frame
    }

    pub fn last_frame_was_full(&self) -> bool {
        self.last_frame_was_full
    }

    /// Half carried by the next full frame.
    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Force the next frame to be full.
    pub fn request_full_frame(&mut self) {
        self.full_requested = true;
    }

    /// Back to the state of a fresh session.
    pub fn reset(&mut self) {
        self.force_frame = 0;
        self.last_frame_was_full = false;
        self.parity = Parity::Even;
        self.full_requested = false;
    }

    /// Start a frame. Returns `true` when it must be full regardless of
    /// what the diff engine would report.
    ///
    /// An odd parity means the even half went out last, so the odd half
    /// always follows immediately.
    pub fn begin_frame(&mut self) -> bool {
        let mut forced = false;
        if self.last_frame_was_full {
            self.force_frame = 0;
        } else if self.force_frame > self.policy.staleness_limit {
            forced = true;
        }
        if self.parity == Parity::Odd {
            forced = true;
        }
        forced | std::mem::take(&mut self.full_requested)
    }

    /// Apply the decision table. `diff` is `None` when no diff was run.
    pub fn plan(&self, forced: bool, diff: Option<&DiffOutcome<'_>>) -> Plan {
        let result = match diff {
            _ if forced => return Plan::Full,
            None | Some(DiffOutcome::NoReference) => return Plan::Full,
            Some(DiffOutcome::Diff(result)) => result,
        };
        let divisor = self.policy.max_diff_divisor.max(1) as usize;
        if result.changed_count > result.total_blocks / divisor {
            Plan::Full
        } else if result.changed_count == 0 {
            Plan::NoChange
        } else {
            Plan::Compare {
                changed_count: result.changed_count,
            }
        }
    }

    /// Pick the message for an encoded frame. A diff only wins when its
    /// payload plus bitmap is strictly smaller than the full half.
    pub fn choose(&self, diff_len: Option<usize>, bitmap_len: usize, full_len: usize) -> FrameTypeTag {
        match diff_len {
            Some(len) if len + bitmap_len < full_len => FrameTypeTag::Diff,
            _ => FrameTypeTag::full(self.parity),
        }
    }

    /// Record that `tag` was sent.
    pub fn commit(&mut self, tag: FrameTypeTag) {
        match tag {
            FrameTypeTag::NoChange => {
                self.force_frame = self.force_frame.saturating_add(self.policy.no_change_cost);
            }
            FrameTypeTag::Diff => {
                self.force_frame = self.force_frame.saturating_add(self.policy.diff_cost);
                self.last_frame_was_full = false;
            }
            FrameTypeTag::FullEven | FrameTypeTag::FullOdd => {
                if self.parity == Parity::Odd {
                    self.force_frame = 0;
                    self.last_frame_was_full = true;
                }
                self.parity = self.parity.flipped();
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::diff::{DiffBitmap, DiffResult};

    fn scheduler() -> FrameScheduler {
        FrameScheduler::new(FramePolicy::default())
    }

    fn diff_of<'a>(bitmap: &'a DiffBitmap, changed_count: usize) -> DiffOutcome<'a> {
        DiffOutcome::Diff(DiffResult {
            bitmap,
            packed_blocks: &[],
            changed_count,
            total_blocks: 1200,
        })
    }

    #[test]
    fn decision_table() {
        let s = scheduler();
        let bitmap = DiffBitmap::new(320, 240);

        assert_eq!(s.plan(true, Some(&diff_of(&bitmap, 1))), Plan::Full);
        assert_eq!(s.plan(false, None), Plan::Full);
        assert_eq!(s.plan(false, Some(&DiffOutcome::NoReference)), Plan::Full);
        assert_eq!(s.plan(false, Some(&diff_of(&bitmap, 0))), Plan::NoChange);
        assert_eq!(
            s.plan(false, Some(&diff_of(&bitmap, 400))),
            Plan::Compare { changed_count: 400 }
        );
        assert_eq!(s.plan(false, Some(&diff_of(&bitmap, 401))), Plan::Full);
    }

    #[test]
    fn diff_must_be_strictly_smaller() {
        let s = scheduler();
        assert_eq!(s.choose(Some(100), 150, 251), FrameTypeTag::Diff);
        assert_eq!(s.choose(Some(100), 150, 250), FrameTypeTag::FullEven);
        assert_eq!(s.choose(None, 150, 10), FrameTypeTag::FullEven);
    }

    #[test]
    fn full_halves_alternate_and_latch() {
        let mut s = scheduler();
        assert!(!s.begin_frame());
        s.commit(FrameTypeTag::FullEven);
        assert_eq!(s.parity(), Parity::Odd);
        assert!(!s.last_frame_was_full());

        // The odd half is always forced right after the even one.
        assert!(s.begin_frame());
        assert_eq!(s.choose(None, 0, 1000), FrameTypeTag::FullOdd);
        s.commit(FrameTypeTag::FullOdd);
        assert_eq!(s.parity(), Parity::Even);
        assert!(s.last_frame_was_full());
        assert_eq!(s.force_frame(), 0);
    }

    #[test]
    fn costs_accumulate() {
        let mut s = scheduler();
        s.commit(FrameTypeTag::NoChange);
        s.commit(FrameTypeTag::Diff);
        assert_eq!(s.force_frame(), 7);
    }

    #[test]
    fn last_full_clears_staleness_on_begin() {
        let mut s = scheduler();
        s.commit(FrameTypeTag::FullEven);
        s.commit(FrameTypeTag::FullOdd);
        s.commit(FrameTypeTag::NoChange);
        assert_eq!(s.force_frame(), 2);
        assert!(!s.begin_frame());
        assert_eq!(s.force_frame(), 0);
    }

    #[test]
    fn staleness_forces_full_once_over_limit() {
        let mut s = scheduler();
        let limit = s.policy().staleness_limit;
        let mut forced_full = 0;

        for _ in 0..500 {
            let before = s.force_frame();
            let was_full = s.last_frame_was_full();
            let forced = s.begin_frame();
            if before > limit && !was_full {
                assert!(forced, "staleness {before} did not force a full frame");
            }
            if forced {
                forced_full += 1;
                let tag = FrameTypeTag::full(s.parity());
                s.commit(tag);
            } else {
                s.commit(FrameTypeTag::Diff);
            }
            assert!(s.force_frame() <= limit + s.policy().diff_cost);
        }
        assert!(forced_full > 0);
    }

    #[test]
    fn external_request_is_one_shot() {
        let mut s = scheduler();
        s.request_full_frame();
        assert!(s.begin_frame());
        assert!(!s.begin_frame());
    }

    #[test]
    fn reset_returns_to_even_parity() {
        let mut s = scheduler();
        s.commit(FrameTypeTag::FullEven);
        s.commit(FrameTypeTag::Diff);
        s.reset();
        assert_eq!(s.parity(), Parity::Even);
        assert_eq!(s.force_frame(), 0);
        assert!(!s.begin_frame());
    }
}
