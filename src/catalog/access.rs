//! Read-time access decision for course and library resources.
//!
//! A resource is open when it sits in the free preview window of its listing,
//! when its stored `is_free` flag is set, or when the viewer bought it. The
//! preview override only affects what is reported; it is never written back.

use serde::Serialize;

/// How many resources at the head of a listing are open to everyone.
pub const FREE_PREVIEW_COUNT: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Free,
    Purchased,
    Denied,
}

impl Access {
    pub fn granted(self) -> bool {
        !matches!(self, Access::Denied)
    }
}

/// `position` is zero-based in display order (`created_at`, then `id`).
pub fn in_free_preview(position: i64) -> bool {
    (0..FREE_PREVIEW_COUNT).contains(&position)
}

pub fn effectively_free(position: i64, is_free: bool) -> bool {
    is_free || in_free_preview(position)
}

/// `owned` must be false for anonymous viewers.
pub fn evaluate(position: i64, is_free: bool, owned: bool) -> Access {
    if effectively_free(position, is_free) {
        Access::Free
    } else if owned {
        Access::Purchased
    } else {
        Access::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_three_are_free_regardless_of_flag() {
        for pos in 0..3 {
            assert_eq!(evaluate(pos, false, false), Access::Free);
        }
        assert_eq!(evaluate(3, false, false), Access::Denied);
    }

    #[test]
    fn stored_flag_and_purchase_open_later_positions() {
        assert_eq!(evaluate(7, true, false), Access::Free);
        assert_eq!(evaluate(7, false, true), Access::Purchased);
        assert_eq!(evaluate(7, false, false), Access::Denied);
    }

    #[test]
    fn free_wins_over_purchase() {
        assert_eq!(evaluate(0, false, true), Access::Free);
        assert_eq!(evaluate(9, true, true), Access::Free);
    }

    #[test]
    fn access_is_exactly_the_union_of_the_three_rules() {
        for pos in 0..8 {
            for is_free in [false, true] {
                for owned in [false, true] {
                    let expected = pos < FREE_PREVIEW_COUNT || is_free || owned;
                    assert_eq!(
                        evaluate(pos, is_free, owned).granted(),
                        expected,
                        "pos={pos} is_free={is_free} owned={owned}"
                    );
                }
            }
        }
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Access::Purchased).unwrap(), "\"purchased\"");
    }
}
