//! Choosing which existing order a confirmed payment belongs to.
//!
//! When a storefront creates the order before the customer pays, nothing ties that order to the payment request
//! except the amount and the timing. The heuristic that picks the order is deliberately isolated behind
//! [`MatchStrategy`] so that it can be tested on its own and replaced.
//!
//! Be aware that any amount-and-time heuristic can attribute a payment to the wrong order when two customers check out
//! the same amount at nearly the same moment.
use crate::db_types::{Order, PaymentRequest};

pub trait MatchStrategy {
    /// Picks at most one order from `candidates` for `request`. Every candidate has already been filtered to be
    /// unpaid, unreferenced and of the same amount, currency and payment method.
    fn select<'a>(&self, request: &PaymentRequest, candidates: &'a [Order]) -> Option<&'a Order>;
}

/// Picks the candidate whose creation time is closest to the payment request's. Ties go to the older order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosestInTime;

impl MatchStrategy for ClosestInTime {
    fn select<'a>(&self, request: &PaymentRequest, candidates: &'a [Order]) -> Option<&'a Order> {
        candidates.iter().min_by_key(|o| ((o.created_at - request.created_at).num_milliseconds().abs(), o.created_at, o.id))
    }
}

/// Never adopts an existing order. Every confirmed payment gets its own synthesized order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverMatch;

impl MatchStrategy for NeverMatch {
    fn select<'a>(&self, _request: &PaymentRequest, _candidates: &'a [Order]) -> Option<&'a Order> {
        None
    }
}
