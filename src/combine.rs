//! Merging two aggregate series into one map series.

use crate::relation::Operation;
use crate::series::AggregateSeries;

/// Every key of `a` or `b`, summing values present on both sides.
pub fn union_sum(a: &AggregateSeries, b: &AggregateSeries) -> AggregateSeries {
    let mut out = a.clone();
    for (key, value) in b.iter() {
        out.accumulate(key, value);
    }
    out
}

/// Quotient `a / b` per key.
///
/// Keys of `a` are emitted only when `b` holds a non-zero partner; a zero or
/// missing denominator drops the key. Keys found only in `b` are emitted as 0.
pub fn divide(a: &AggregateSeries, b: &AggregateSeries) -> AggregateSeries {
    let mut out = AggregateSeries::new();
    for (key, numerator) in a.iter() {
        match b.get(key) {
            Some(denominator) if denominator != 0.0 => out.insert(key, numerator / denominator),
            _ => {}
        }
    }
    append_missing(&mut out, a, b);
    out
}

/// Difference `a - b` per key, clamped at zero.
///
/// A key missing from `b` keeps its `a` value; keys found only in `b` are
/// emitted as 0.
pub fn subtract(a: &AggregateSeries, b: &AggregateSeries) -> AggregateSeries {
    let mut out = AggregateSeries::new();
    for (key, minuend) in a.iter() {
        let value = minuend - b.get(key).unwrap_or(0.0);
        out.insert(key, value.max(0.0));
    }
    append_missing(&mut out, a, b);
    out
}

/// Apply the relation's operation with `primary` on the left.
pub fn combine(op: Operation, primary: &AggregateSeries, sub: &AggregateSeries) -> AggregateSeries {
    match op {
        Operation::Divide => divide(primary, sub),
        Operation::Subtract => subtract(primary, sub),
    }
}

fn append_missing(out: &mut AggregateSeries, a: &AggregateSeries, b: &AggregateSeries) {
    for key in b.keys() {
        if !a.contains_key(key) {
            out.insert(key, 0.0);
        }
    }
}
