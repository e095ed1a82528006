use super::error::{ErrorKind, Result};
use crate::remote::SearchQuery;
use mosaic_store::{DateWindow, Item, Predicate};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

/// How far back a forward poll looks.
pub const FORWARD_SPAN: Duration = Duration::days(30);
pub const FORWARD_LIMIT: usize = 1000;

/// The earliest representable capture date; "no lower bound".
pub fn distant_past() -> OffsetDateTime {
    datetime!(0001-01-01 0:00 UTC)
}

/// One rung of the backward pagination ladder.
///
/// Each rung searches further back from the oldest item held locally. The
/// ladder only moves forward, through [`next`](Self::next).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    Month,
    Quarter,
    HalfYear,
    /// Everything older, still capped.
    Everything,
    /// Everything older, uncapped.
    Unlimited,
}

impl WindowStep {
    pub const FIRST: Self = Self::Month;

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Month => Some(Self::Quarter),
            Self::Quarter => Some(Self::HalfYear),
            Self::HalfYear => Some(Self::Everything),
            Self::Everything => Some(Self::Unlimited),
            Self::Unlimited => None,
        }
    }

    /// The whole ladder, first rung first.
    pub fn ladder() -> impl Iterator<Item = Self> {
        std::iter::successors(Some(Self::FIRST), |step| step.next())
    }

    /// How far back from the oldest local item to search; `None` reaches
    /// the distant past.
    pub fn span(self) -> Option<Duration> {
        match self {
            Self::Month => Some(Duration::days(30)),
            Self::Quarter => Some(Duration::days(90)),
            Self::HalfYear => Some(Duration::days(180)),
            Self::Everything | Self::Unlimited => None,
        }
    }

    /// Maximum records per search; `0` means no cap.
    pub fn limit(self) -> usize {
        match self {
            Self::Unlimited => 0,
            _ => 300,
        }
    }

    pub fn lower_bound(self, less: OffsetDateTime) -> OffsetDateTime {
        match self.span().and_then(|span| less.checked_sub(span)) {
            Some(greater) => greater.max(distant_past()),
            None => distant_past(),
        }
    }
}

/// One search window: `(lower, upper)` on capture date, both exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWindow {
    lower: OffsetDateTime,
    upper: OffsetDateTime,
    limit: usize,
    predicate: Predicate,
}

impl SyncWindow {
    /// Fails unless `lower < upper`.
    pub fn new(lower: OffsetDateTime, upper: OffsetDateTime, limit: usize, predicate: Predicate) -> Result<Self> {
        if lower >= upper {
            exn::bail!(ErrorKind::EmptyWindow);
        }
        Ok(Self { lower, upper, limit, predicate })
    }

    /// The recent past up to just after `now`.
    pub fn forward(now: OffsetDateTime, predicate: Predicate) -> Result<Self> {
        Self::new(now - FORWARD_SPAN, now + Duration::seconds(1), FORWARD_LIMIT, predicate)
    }

    /// The rung `step` below `less`, the date of the oldest local item.
    pub fn backward(step: WindowStep, less: OffsetDateTime, predicate: Predicate) -> Result<Self> {
        Self::new(step.lower_bound(less), less, step.limit(), predicate)
    }

    pub fn lower(&self) -> OffsetDateTime {
        self.lower
    }

    pub fn upper(&self) -> OffsetDateTime {
        self.upper
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn query(&self, include_hidden: bool) -> SearchQuery {
        SearchQuery {
            path: self.predicate.path_prefix.clone(),
            lower: self.lower,
            upper: self.upper,
            limit: self.limit,
            include_hidden,
        }
    }

    /// The local items this window covers.
    pub fn local_predicate(&self) -> Predicate {
        self.predicate.clone().within(DateWindow { after: self.lower, before: self.upper })
    }

    /// Whether a response of `count` records may have been cut short.
    pub fn is_truncated(&self, count: usize) -> bool {
        self.limit > 0 && count >= self.limit
    }

    /// Shrinks the window to what a truncated response actually covered.
    ///
    /// A search that hit its limit says nothing about items older than the
    /// oldest record it returned, so those must not be treated as deleted.
    pub fn covering(&self, items: &[Item]) -> Self {
        let oldest = items.iter().map(|item| item.date).min();
        match oldest {
            Some(oldest) if self.is_truncated(items.len()) => {
                let lower = (oldest - Duration::seconds(1)).max(self.lower);
                Self { lower, ..self.clone() }
            },
            _ => self.clone(),
        }
    }
}
