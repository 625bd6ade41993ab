use num_bigint::{BigInt, BigUint};
use num_integer::{Integer, Roots};
use num_traits::{One, Signed, Zero};

/// Jacobi symbol (x/y), extended to negative arguments the way GMP's
/// Kronecker symbol is. `y` must be odd.
///
/// Binary algorithm: reduce the numerator, pull its even part out
/// through the second supplement (2/y), then swap the pair under
/// quadratic reciprocity until the denominator collapses to one.
pub(crate) fn jacobi(x: &BigInt, y: &BigInt) -> isize {
    debug_assert!(y.is_odd(), "jacobi: y must be odd");

    let mut num = x.clone();
    let mut den = y.clone();
    let mut sign = 1;

    if den.is_negative() {
        if num.is_negative() {
            sign = -1;
        }
        den = -den;
    }

    while !den.is_one() {
        num = num.mod_floor(&den);
        if num.is_zero() {
            // A shared factor kills the symbol.
            return 0;
        }

        let twos = num.trailing_zeros().unwrap_or(0);
        if twos > 0 {
            num = &num >> twos;
            // (2/den) = -1 exactly when den = ±3 (mod 8), felt once per
            // odd power of two.
            if twos & 1 == 1 {
                let den_mod_8 = den.get_limb(0) & 7;
                if den_mod_8 == 3 || den_mod_8 == 5 {
                    sign = -sign;
                }
            }
        }

        // Reciprocity: flipping the pair costs a sign when both sides
        // are 3 (mod 4).
        if num.get_limb(0) & 3 == 3 && den.get_limb(0) & 3 == 3 {
            sign = -sign;
        }
        core::mem::swap(&mut num, &mut den);
    }

    sign
}

/// Whether `n` is a perfect square.
pub(crate) fn is_perfect_square(n: &BigUint) -> bool {
    let root = n.sqrt();
    &root * &root == *n
}
