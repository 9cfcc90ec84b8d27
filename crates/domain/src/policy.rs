//! Age cutoff policy applied before publishing

use time::{Date, Duration};

/// Decides which registration date, if any, a run treats as too old
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffPolicy {
    /// On an empty store, skip anything registered before yesterday
    #[default]
    YesterdayIfEmpty,
    /// Always skip anything registered before a fixed date
    Fixed(Date),
    /// Never skip by age
    None,
}

impl CutoffPolicy {
    /// Resolve the cutoff date for one run.
    ///
    /// `store_is_empty` is only consulted by `YesterdayIfEmpty`.
    pub fn resolve(&self, today: Date, store_is_empty: bool) -> Option<Date> {
        match self {
            CutoffPolicy::YesterdayIfEmpty if store_is_empty => {
                today.checked_sub(Duration::days(1))
            }
            CutoffPolicy::YesterdayIfEmpty => None,
            CutoffPolicy::Fixed(date) => Some(*date),
            CutoffPolicy::None => None,
        }
    }

    /// Whether resolving needs to know if the store is empty
    pub fn needs_store_state(&self) -> bool {
        matches!(self, CutoffPolicy::YesterdayIfEmpty)
    }
}

/// A record is too old when registered strictly before the cutoff
pub fn is_too_old(registered: Date, cutoff: Option<Date>) -> bool {
    cutoff.is_some_and(|cutoff| registered < cutoff)
}
