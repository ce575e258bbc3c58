//! Debug-only invariant assertions for the channel protocol documented in `SPEC_FULL.md`.
//!
//! Active only under `#[cfg(debug_assertions)]`, so there is zero overhead in release
//! builds.

/// INV-SLOT-01: a pending message's length never exceeds the slot's capacity.
macro_rules! debug_assert_slot_len_in_bounds {
    ($slot_len:expr, $buffer_size:expr) => {
        debug_assert!(
            $slot_len <= $buffer_size,
            "INV-SLOT-01 violated: slot_len {} exceeds buffer_size {}",
            $slot_len,
            $buffer_size
        )
    };
}

/// INV-CNT-01: producers_done never exceeds producer_count, which never exceeds max_producers.
macro_rules! debug_assert_producer_counts {
    ($producers_done:expr, $producer_count:expr, $max_producers:expr) => {
        debug_assert!(
            $producers_done <= $producer_count && $producer_count <= $max_producers,
            "INV-CNT-01 violated: producers_done {} producer_count {} max_producers {}",
            $producers_done,
            $producer_count,
            $max_producers
        )
    };
}

/// INV-HS-01: whenever an election is active, it names the head of the wait queue.
macro_rules! debug_assert_handoff_matches_queue_head {
    ($next_handoff:expr, $queue_head:expr) => {
        debug_assert!(
            $next_handoff.is_none() || $next_handoff == $queue_head,
            "INV-HS-01 violated: next_handoff {:?} does not match wait_queue head {:?}",
            $next_handoff,
            $queue_head
        )
    };
}

/// INV-WQ-01: the wait queue never holds the same producer id twice.
macro_rules! debug_assert_wait_queue_distinct {
    ($queue:expr, $id:expr) => {
        debug_assert!(
            !$queue.contains(&$id),
            "INV-WQ-01 violated: producer {} already present in wait_queue",
            $id
        )
    };
}

pub(crate) use debug_assert_handoff_matches_queue_head;
pub(crate) use debug_assert_producer_counts;
pub(crate) use debug_assert_slot_len_in_bounds;
pub(crate) use debug_assert_wait_queue_distinct;
