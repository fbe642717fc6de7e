/*
Quantizer / Approximator
========================

Two standalone numeric algorithms used by the frequency mappers:

  nearest_in_table   snap a value to the closest entry of a small ascending
                     table (chord-degree quantization).

  closest_rational   best rational approximation of a ratio with a bounded
                     denominator (rational tuning). A Stern-Brocot mediant
                     walk keeps the two tightest bounding fractions; when the
                     next mediant would exceed the denominator bound, the
                     closer bound is the answer. Any fraction strictly between
                     two adjacent bounds has a denominator of at least the sum
                     of theirs, so nothing with a legal denominator can beat
                     the bounds.

Both run at control rate only, with loop counts bounded by the table size and
the denominator ceiling respectively.
*/

/// Returns the entry of an ascending `table` closest to `x`.
///
/// A binary search finds the insertion point, then the two neighboring
/// candidates are compared; exact ties go to the lower index (the upper
/// neighbor wins only when strictly closer).
pub fn nearest_in_table(x: f32, table: &[f32]) -> f32 {
    debug_assert!(!table.is_empty());
    let mut low = 0usize;
    let mut high = table.len();
    while low < high {
        let mid = (low + high) / 2;
        if table[mid] < x {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    if low == 0 {
        return table[0];
    }
    if low == table.len() {
        return table[table.len() - 1];
    }
    let below = table[low - 1];
    let above = table[low];
    if (above - x) < (x - below) {
        above
    } else {
        below
    }
}

/// Returns the closest value to `x` expressible as a fraction with
/// denominator at most `max_denominator`.
///
/// `x` is first reduced into (1, 2] by repeated halving/doubling, the mediant
/// search runs on `x - 1` in [0, 1], then the power-of-two factor is undone.
/// Exact rationals within the bound come back exactly. Ratios outside the
/// positive finite domain pass through unchanged; the reduction loops need a
/// positive finite input to terminate.
pub fn closest_rational(x: f32, max_denominator: u32) -> f32 {
    debug_assert!(max_denominator >= 1);
    if !(x > 0.0) || !x.is_finite() {
        return x;
    }
    let mut x = x;
    let mut scale = 1.0f32;
    while x > 2.0 {
        x *= 0.5;
        scale *= 2.0;
    }
    while x <= 1.0 {
        x *= 2.0;
        scale *= 0.5;
    }
    (closest_fraction(x - 1.0, max_denominator as f32) + 1.0) * scale
}

/// Best rational approximation of `x` in [0, 1] with denominator <= `n`.
///
/// Maintains bounding fractions a/b < x < c/d that stay adjacent (mediant
/// children) throughout, stepping toward `x` one mediant at a time. Runs at
/// most 2n steps.
fn closest_fraction(x: f32, n: f32) -> f32 {
    let (mut a, mut b) = (0.0f32, 1.0f32);
    let (mut c, mut d) = (1.0f32, 1.0f32);

    while b + d <= n {
        let mediant = (a + c) / (b + d);
        if x == mediant {
            return mediant;
        } else if x > mediant {
            a += c;
            b += d;
        } else {
            c += a;
            d += b;
        }
    }

    let below = a / b;
    let above = c / d;
    if (above - x) < (x - below) {
        above
    } else {
        below
    }
}
