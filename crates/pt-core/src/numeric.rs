use crate::PtError;

/// Floating point type used throughout the engine
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, PtError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PtError::NonFinite { what, value: v })
    }
}

/// Linear interpolation of `x` onto sorted breakpoints, clamped at the ends.
///
/// `xs` must be strictly increasing and the same length as `ys`; callers
/// validate this at construction time.
pub fn interp_clamped(xs: &[Real], ys: &[Real], x: Real) -> Real {
    debug_assert_eq!(xs.len(), ys.len());
    debug_assert!(!xs.is_empty());

    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }

    // Index of the first breakpoint >= x; x is strictly inside the range here.
    let hi = xs.partition_point(|&v| v < x);
    let lo = hi - 1;
    let frac = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + frac * (ys[hi] - ys[lo])
}
