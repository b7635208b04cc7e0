//! Integer helpers shared by pricing and allocation.
//!
//! All pool arithmetic is integer arithmetic in the deposit asset's smallest
//! unit. Division truncates, so every rounding remainder stays in the pool.

/// Computes `floor(a * b / denominator)` without overflowing on the product
/// when the result itself fits.
///
/// Returns `None` if `denominator` is zero or the result does not fit in `u128`.
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    if let Some(product) = a.checked_mul(b) {
        return Some(product / denominator);
    }

    // a * b / d == (a / d) * b + (a % d) * b / d
    let quotient = a / denominator;
    let remainder = a % denominator;
    let whole = quotient.checked_mul(b)?;
    let partial = remainder.checked_mul(b)? / denominator;
    whole.checked_add(partial)
}

/// Sums values with overflow checking. `None` on overflow.
pub fn checked_sum<I>(values: I) -> Option<u128>
where
    I: IntoIterator<Item = u128>,
{
    values
        .into_iter()
        .try_fold(0u128, |acc, v| acc.checked_add(v))
}
