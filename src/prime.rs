//! Prime generation tuned for RSA factor selection.
//!
//! The engine owns a table of the small primes below 2^16, machine-word
//! sized products of those primes used to batch trial divisions, and the
//! random generator feeding the probabilistic tests. Primality is decided
//! by sieve + Miller-Rabin + Lucas; candidates for RSA factors are
//! additionally screened so that p-1, p+1 and (p-1)/2 ± 1 all keep a
//! large rough part.

use num_bigint::Sign::Plus;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::math::{is_perfect_square, jacobi};
use crate::prng::Prng;

/// Number of precomputed primes: all primes below 2^16. The same table
/// bounds the sieve fast path and the smoothness trial division.
const TABLE_PRIMES: usize = 6542;

/// A number is declared non-smooth when, after the trial division, the
/// remaining cofactor has lost fewer than this many bits.
const SMOOTH_PART_SIZE_LIMIT: usize = 128;

/// 3 x 5 x 7 x 11 x ... x 53, the largest primorial tail fitting one
/// 64-bit word. Primes from [`FIRST_GROUPED_PRIME`] on are covered by the
/// grouped products instead.
const SMALL_ODD_PRODUCT: u64 = 0xE221_F97C_30E9_4E1D;
const FIRST_GROUPED_PRIME: u64 = 59;

/// Window parameter of the uniform sampler: offsets are drawn with this
/// many bits of slack, one machine word.
const FT_WINDOW_BITS: usize = 64;

/// The engine generator is reseeded with 256 bits on every (re)build.
const ENGINE_SEED_BYTES: usize = 32;

/// Below this size the smoothness rejection (bits - 128) degenerates and
/// the factor searches could not terminate.
const FACTOR_MIN_BITS: usize = 160;

/// Sufficient Miller-Rabin iteration counts, per bit length, for an error
/// probability of 2^-128 on random inputs. An entry {k, t} means t rounds
/// suffice for integers of k bits or more (Damgard, Landrock, Pomerance;
/// the same estimate NIST builds on in FIPS 186-4 appendix C).
#[rustfmt::skip]
const MR_ROUNDS_TABLE: [(usize, usize); 60] = [
    (0, 200),   (50, 60),   (54, 59),   (61, 58),   (67, 57),   (74, 56),
    (80, 55),   (86, 54),   (93, 53),   (99, 52),   (105, 51),  (111, 50),
    (118, 49),  (124, 48),  (130, 47),  (136, 46),  (142, 45),  (149, 44),
    (155, 43),  (161, 42),  (167, 41),  (173, 40),  (179, 39),  (186, 38),
    (192, 37),  (198, 36),  (204, 35),  (210, 34),  (216, 33),  (222, 32),
    (229, 31),  (235, 30),  (241, 29),  (247, 28),  (253, 27),  (259, 26),
    (266, 25),  (273, 24),  (281, 23),  (291, 22),  (302, 21),  (314, 20),
    (327, 19),  (341, 18),  (357, 17),  (375, 16),  (396, 15),  (419, 14),
    (447, 13),  (479, 12),  (517, 11),  (563, 10),  (620, 9),   (691, 8),
    (782, 7),   (906, 6),   (1080, 5),  (1345, 4),  (1794, 3),  (2719, 2),
];

/// Sufficient number of Miller-Rabin rounds for a `bits`-bit input.
fn mr_rounds(bits: usize) -> usize {
    let mut a = 0;
    let mut b = MR_ROUNDS_TABLE.len();
    while b - a > 1 {
        let i = (a + b) / 2;
        if bits < MR_ROUNDS_TABLE[i].0 {
            b = i;
        } else {
            a = i;
        }
    }
    MR_ROUNDS_TABLE[a].1
}

/// A run of consecutive table primes whose product fits one word.
struct PrimeGroup {
    product: u64,
    start: usize,
    end: usize,
}

pub struct PrimeEngine {
    primes: Vec<u64>,
    groups: Vec<PrimeGroup>,
    /// Non-sensitive generator feeding Miller-Rabin witnesses.
    rng: ChaCha20Rng,
}

/// True primality of a small integer by trial division against the primes
/// collected so far. Assumes the table certifies every t below the square
/// of its last entry.
fn small_prime_by_table(primes: &[u64], t: u64) -> bool {
    if t < 3 || t & 1 == 0 {
        return t == 2;
    }
    for &d in &primes[1..] {
        let q = t / d;
        if t - q * d == 0 {
            return false;
        }
        if q < d {
            return true;
        }
    }
    // Unreachable while the table is grown in order.
    true
}

fn build_prime_table() -> Vec<u64> {
    let mut primes = Vec::with_capacity(TABLE_PRIMES);
    primes.push(2);
    primes.push(3);

    let mut candidate: u64 = 5;
    // Alternating increments of 2 and 4 skip the multiples of 3.
    let mut delta: u64 = 2;
    while primes.len() < TABLE_PRIMES {
        if small_prime_by_table(&primes, candidate) {
            primes.push(candidate);
        }
        candidate += delta;
        delta = 6 - delta;
    }
    primes
}

fn build_products(primes: &[u64]) -> Vec<PrimeGroup> {
    let mut groups = Vec::new();
    let mut i = match primes.iter().position(|&p| p >= FIRST_GROUPED_PRIME) {
        Some(i) => i,
        None => return groups,
    };

    while i < primes.len() {
        let start = i;
        let mut product: u64 = 1;
        while i < primes.len() {
            match product.checked_mul(primes[i]) {
                Some(grown) => {
                    product = grown;
                    i += 1;
                }
                None => break,
            }
        }
        groups.push(PrimeGroup {
            product,
            start,
            end: i,
        });
    }
    groups
}

fn mod_word(n: &BigUint, word: u64) -> u64 {
    // The remainder of a division by a word always fits a word.
    (n % word).to_u64().unwrap()
}

impl PrimeEngine {
    /// Builds the tables and seeds the witness generator from `prng`.
    pub fn new(prng: &mut dyn Prng) -> Result<Self> {
        let primes = build_prime_table();
        let groups = build_products(&primes);
        let mut engine = PrimeEngine {
            primes,
            groups,
            rng: ChaCha20Rng::from_seed([0u8; ENGINE_SEED_BYTES]),
        };
        engine.reseed(prng)?;
        Ok(engine)
    }

    /// Replaces the witness generator seed. The tables are immutable.
    pub fn reseed(&mut self, prng: &mut dyn Prng) -> Result<()> {
        let mut seed = [0u8; ENGINE_SEED_BYTES];
        prng.fill_bytes(&mut seed)?;
        self.rng = ChaCha20Rng::from_seed(seed);
        seed.zeroize();
        Ok(())
    }

    /// Largest prime covered by the tables.
    pub fn table_bound(&self) -> u64 {
        self.primes[self.primes.len() - 1]
    }

    /// Composite screen by trial division, batched through the word-sized
    /// prime products. `None` selects the whole table as bound. Assumes a
    /// large odd candidate: even inputs are simply reported composite.
    pub fn is_prime_sieve(&self, n: &BigUint, bound: Option<u64>) -> Result<bool> {
        if n.is_even() {
            return Ok(false);
        }

        let r = mod_word(n, SMALL_ODD_PRODUCT);
        if r % 3 == 0
            || r % 5 == 0
            || r % 7 == 0
            || r % 11 == 0
            || r % 13 == 0
            || r % 17 == 0
            || r % 19 == 0
            || r % 23 == 0
            || r % 29 == 0
            || r % 31 == 0
            || r % 37 == 0
            || r % 41 == 0
            || r % 43 == 0
            || r % 47 == 0
            || r % 53 == 0
        {
            return Ok(false);
        }

        let bound = bound.unwrap_or_else(|| self.table_bound());
        if bound > self.table_bound() {
            return Err(Error::bad_parameter("not enough precomputed primes"));
        }

        let mut j = self.groups[0].start;
        for group in &self.groups {
            if self.primes[j - 1] >= bound {
                break;
            }
            let r = mod_word(n, group.product);
            while j < group.end {
                if r % self.primes[j] == 0 {
                    return Ok(false);
                }
                j += 1;
            }
        }

        Ok(true)
    }

    /// Miller-Rabin with witnesses drawn uniformly in [2, n-2] from the
    /// engine generator. `iterations == 0` selects the compiled schedule
    /// for the bit length of `n`.
    pub fn is_prime_miller_rabin(&mut self, n: &BigUint, iterations: usize) -> bool {
        let five = BigUint::from(5u32);
        if n < &five {
            let small = n.to_u64().unwrap();
            return small == 2 || small == 3;
        }
        if n.is_even() {
            return false;
        }

        let iterations = if iterations == 0 {
            mr_rounds(n.bits())
        } else {
            iterations
        };

        let n_minus_1 = n - 1u32;
        let n_minus_3 = n - 3u32;

        // n-1 = 2^s * r with r odd
        let s = n_minus_1.trailing_zeros().unwrap_or(0);
        let r = &n_minus_1 >> s;

        for _ in 0..iterations {
            let a = self.rng.gen_biguint_below(&n_minus_3) + 2u32;
            let mut y = a.modpow(&r, n);

            if !y.is_one() {
                let mut j = 1;
                while y != n_minus_1 {
                    y = (&y * &y) % n;
                    if j == s || y.is_one() {
                        return false;
                    }
                    j += 1;
                }
            }
        }

        true
    }

    /// Lucas probable prime test (FIPS 186-4 C.3.3): Selfridge parameter
    /// search D = 5, -7, 9, -11, ... through the Jacobi symbol, then the
    /// U sequence checked for U_{n+1} = 0 (mod n). Perfect squares are
    /// rejected up front. Assumes an odd candidate.
    pub fn is_prime_lucas(&self, n: &BigUint) -> bool {
        if n.is_zero() || n.is_one() {
            return false;
        }
        if n.is_even() {
            return *n == BigUint::from(2u32);
        }
        if is_perfect_square(n) {
            return false;
        }

        let n_int = BigInt::from_biguint(Plus, n.clone());

        let mut d: i64 = 5;
        loop {
            match jacobi(&BigInt::from(d), &n_int) {
                -1 => break,
                // 0 or 1: move to the next candidate. A square would make
                // every symbol non-negative, and squares are gone already.
                _ => {
                    if d.abs() > 10_001 {
                        panic!("internal error: cannot find (D/n) = -1 for {}", n);
                    }
                    d = if d > 0 { -(d + 2) } else { -(d - 2) };
                }
            }
        }

        let d_positive = d > 0;
        let d_abs = BigInt::from(d.abs());

        let m = n + 1u32;
        let m_bytes = m.to_bytes_be();
        let bit = |i: usize| (m_bytes[m_bytes.len() - 1 - i / 8] >> (i % 8)) & 1 == 1;

        // Binary ladder over scaled Lucas sequences: powers of two picked
        // up by the recurrences are harmless modulo an odd n, since only
        // U_{n+1} == 0 is tested.
        let mut u = BigInt::one();
        let mut v = BigInt::one();
        let top = m.bits() - 1;
        for i in (1..=top).rev() {
            let u1 = (&u * &v) << 1;
            let x = &u * &u;
            let mut v1 = &v * &v;
            if d_positive {
                v1 += &x * &d_abs;
            } else {
                v1 -= &x * &d_abs;
            }

            if bit(i - 1) {
                u = &u1 + &v1;
                if d_positive {
                    v1 += &u1 * &d_abs;
                } else {
                    v1 -= &u1 * &d_abs;
                }
            } else {
                u = u1;
            }
            v = v1;

            u = u.mod_floor(&n_int);
            v = v.mod_floor(&n_int);
        }

        u.is_zero()
    }

    /// Full compositeness screen.
    pub fn is_prime(&mut self, n: &BigUint) -> Result<bool> {
        Ok(self.is_prime_sieve(n, None)?
            && self.is_prime_miller_rabin(n, 0)
            && self.is_prime_lucas(n))
    }

    /// Candidates from the uniform sampler are constructed coprime to the
    /// small primes, so the sieve would never fire on them.
    fn is_prime_sampled(&mut self, n: &BigUint) -> bool {
        self.is_prime_miller_rabin(n, 0) && self.is_prime_lucas(n)
    }

    /// Whether `n` is (almost) entirely made of primes from the table:
    /// after dividing out every table prime with multiplicity, the
    /// cofactor retains fewer than [`SMOOTH_PART_SIZE_LIMIT`] bits less
    /// than `n` itself.
    pub fn is_smooth(&self, n: &BigUint) -> bool {
        let s = n.trailing_zeros().unwrap_or(0);
        let mut cofactor = n >> s;

        {
            let r = mod_word(&cofactor, SMALL_ODD_PRODUCT);
            for j in 1..self.groups[0].start {
                if r % self.primes[j] == 0 {
                    while (&cofactor % self.primes[j]).is_zero() {
                        cofactor = cofactor / self.primes[j];
                    }
                }
            }
        }

        for group in &self.groups {
            let r = mod_word(&cofactor, group.product);
            for j in group.start..group.end {
                if r % self.primes[j] == 0 {
                    while (&cofactor % self.primes[j]).is_zero() {
                        cofactor = cofactor / self.primes[j];
                    }
                }
            }
        }

        if cofactor.is_one() {
            return true;
        }

        match n.bits().checked_sub(SMOOTH_PART_SIZE_LIMIT) {
            // The trial division stripped less than the limit: the number
            // keeps a large rough part.
            Some(threshold) => cofactor.bits() <= threshold,
            // Inputs below the limit cannot have one.
            None => true,
        }
    }

    /// Searches a strong prime n of exactly `bits` bits by rejection:
    /// draw m, force the two leading bits, align on m = 5 (mod 6) so that
    /// both m and n = 2m+1 can be prime, then screen n, m = (n-1)/2 and
    /// the smoothness of m-1, m+1, n+1.
    pub fn find_rsa_factor(&mut self, bits: usize, prng: &mut dyn Prng) -> Result<BigUint> {
        if bits < FACTOR_MIN_BITS {
            return Err(Error::bad_parameter("factor size too small"));
        }

        loop {
            let mut m = prng.gen_uint(bits - 1)?;
            // Both leading bits at one: the product of two such factors
            // has exactly the requested modulus size.
            m |= BigUint::one() << (bits - 3);

            let m_mod_6 = mod_word(&m, 6) as u32;
            m += BigUint::from(5u32 - m_mod_6);

            if !self.is_prime_sieve(&m, None)? {
                continue;
            }

            let n = (&m << 1) + 1u32;
            if !self.is_prime_sieve(&n, None)? {
                continue;
            }

            if !self.is_prime_miller_rabin(&m, 0) {
                continue;
            }
            if !self.is_prime_miller_rabin(&n, 0) {
                continue;
            }
            if !self.is_prime_lucas(&m) {
                continue;
            }
            if !self.is_prime_lucas(&n) {
                continue;
            }

            if self.is_smooth(&(&m - 1u32)) {
                continue;
            }
            if self.is_smooth(&(&m + 1u32)) {
                continue;
            }
            if self.is_smooth(&(&n + 1u32)) {
                continue;
            }

            return Ok(n);
        }
    }

    /// Product m of the initial table primes with bits(m) + window <=
    /// `target_bits`, and lambda = lcm(p - 1) over the same primes.
    fn ft_params(&self, target_bits: usize) -> Result<(BigUint, BigUint)> {
        let mut m = BigUint::one();
        let mut lambda = BigUint::one();

        for &p in &self.primes {
            match target_bits.checked_sub(m.bits()) {
                Some(slack) if slack >= FT_WINDOW_BITS => {
                    m = m * p;
                    lambda = lambda.lcm(&BigUint::from(p - 1));
                }
                _ => break,
            }
        }

        if m.is_one() {
            return Err(Error::bad_parameter(
                "bit size too small for uniform sampling",
            ));
        }
        Ok((m, lambda))
    }

    /// Drives b into the group of units modulo m: while u = 1 - b^lambda
    /// is non-zero modulo m, shift b by a random multiple of u. On exit b
    /// is coprime to m. With `strong`, both b and 2b+1 are driven at once
    /// through u = 1 - (b(2b+1))^lambda.
    fn ft_unit(
        &self,
        m: &BigUint,
        lambda: &BigUint,
        strong: bool,
        prng: &mut dyn Prng,
    ) -> Result<BigUint> {
        let l = m - 1u32;
        let mut b = prng.gen_uint_below(&l)? + 1u32;

        loop {
            let base = if strong {
                (&b * ((&b << 1) + 1u32)) % m
            } else {
                b.clone()
            };
            let power = base.modpow(lambda, m);
            let u = ((m + 1u32) - power) % m;
            if u.is_zero() {
                return Ok(b);
            }

            let r = prng.gen_uint_below(&l)? + 1u32;
            b = (b + r * u) % m;
        }
    }

    /// Uniformly samples a prime of exactly `bits` bits: pick b coprime
    /// to the sieve product m, then draw the offset a uniformly so that
    /// p = b + a*m lands in [2^(bits-1), 2^bits), retrying a until p is
    /// prime.
    pub fn gen_prime_ft(&mut self, bits: usize, prng: &mut dyn Prng) -> Result<BigUint> {
        let (m, lambda) = self.ft_params(bits - 1)?;
        let b = self.ft_unit(&m, &lambda, false, prng)?;

        let window_low = BigUint::one() << (bits - 1);
        let window_high = BigUint::one() << bits;
        let a_low = (&window_low - &b + &m - 1u32) / &m;
        let a_high = (&window_high - &b) / &m;
        let span = &a_high - &a_low;

        loop {
            let a = prng.gen_uint_below(&span)? + &a_low;
            let p = &b + a * &m;
            if self.is_prime_sampled(&p) {
                return Ok(p);
            }
        }
    }

    /// Strong-prime variant of the uniform sampler: (p-1)/2 = b + a*m is
    /// drawn with its two leading bits set, p = 2(b + a*m) + 1 must also
    /// be prime, and the usual smoothness screens apply.
    pub fn find_rsa_factor_ft(&mut self, bits: usize, prng: &mut dyn Prng) -> Result<BigUint> {
        if bits < FACTOR_MIN_BITS {
            return Err(Error::bad_parameter("factor size too small"));
        }

        let (m, lambda) = self.ft_params(bits - 1)?;
        let b = self.ft_unit(&m, &lambda, true, prng)?;

        // Window for (p-1)/2: [3 * 2^(bits-3), 2^(bits-1)), which pins
        // its two leading bits to one.
        let window_low = BigUint::from(3u32) << (bits - 3);
        let window_high = BigUint::one() << (bits - 1);
        let a_low = (&window_low - &b + &m - 1u32) / &m;
        let a_high = (&window_high - &b) / &m;
        let span = &a_high - &a_low;

        loop {
            let a = prng.gen_uint_below(&span)? + &a_low;
            let half = &b + a * &m;
            if !self.is_prime_sampled(&half) {
                continue;
            }

            let p = (&half << 1) + 1u32;
            if !self.is_prime_sampled(&p) {
                continue;
            }

            if self.is_smooth(&(&half - 1u32)) {
                continue;
            }
            if self.is_smooth(&(&half + 1u32)) {
                continue;
            }
            if self.is_smooth(&(&p + 1u32)) {
                continue;
            }

            return Ok(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::BarakHalevi;

    fn test_prng() -> BarakHalevi {
        let mut prng = BarakHalevi::new();
        prng.refresh(b"prime engine test seed").unwrap();
        prng
    }

    fn engine() -> PrimeEngine {
        PrimeEngine::new(&mut test_prng()).unwrap()
    }

    // Primes of 64 bits and more, where the sieve semantics apply.
    const PRIMES: &[&str] = &[
        "13756265695458089029",
        "13496181268022124907",
        "10953742525620032441",
        "17908251027575790097",
        "18699199384836356663",
        "98920366548084643601728869055592650835572950932266967461790948584315647051443",
        "94560208308847015747498523884063394671606671904944666360068158221458669711639",
        // 2^251-9 and 2^255-19
        "3618502788666131106986593281521497120414687020801267626233049500247285301239",
        "57896044618658097711785492504343953926634992332820282019728792003956564819949",
    ];

    const COMPOSITES: &[&str] = &[
        "21284175091214687912771199898307297748211672914763848041968395774954376176754",
        "6084766654921918907427900243509372380954290099172559290432744450051395395951",
        "84594350493221918389213352992032324280367711247940675652888030554255915464401",
        "82793403787388584738507275144194252681",
        // Strong pseudoprime to every prime base up to 29.
        "1195068768795265792518361315725116351898245581",
    ];

    #[test]
    fn table_holds_the_primes_below_2_16() {
        let engine = engine();
        assert_eq!(engine.primes.len(), TABLE_PRIMES);
        assert_eq!(&engine.primes[..10], &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(engine.table_bound(), 65521);
    }

    #[test]
    fn products_are_maximal_word_runs() {
        let engine = engine();

        let first = &engine.groups[0];
        assert_eq!(engine.primes[first.start], FIRST_GROUPED_PRIME);

        let mut expected_next = first.start;
        for group in &engine.groups {
            assert_eq!(group.start, expected_next);
            let mut product: u128 = 1;
            for &p in &engine.primes[group.start..group.end] {
                product *= p as u128;
            }
            assert_eq!(product, group.product as u128);
            // Maximality: one more prime would overflow the word.
            if group.end < engine.primes.len() {
                assert!(product * engine.primes[group.end] as u128 > u64::MAX as u128);
            }
            expected_next = group.end;
        }
        assert_eq!(expected_next, engine.primes.len());
    }

    #[test]
    fn round_schedule_follows_the_table() {
        assert_eq!(mr_rounds(40), 200);
        assert_eq!(mr_rounds(256), 27);
        assert_eq!(mr_rounds(512), 12);
        assert_eq!(mr_rounds(1024), 6);
        assert_eq!(mr_rounds(2048), 3);
        assert_eq!(mr_rounds(4096), 2);
    }

    #[test]
    fn known_primes_pass() {
        let mut engine = engine();
        for text in PRIMES {
            let p = BigUint::parse_bytes(text.as_bytes(), 10).unwrap();
            assert!(engine.is_prime(&p).unwrap(), "{} is prime", text);
        }
    }

    #[test]
    fn known_composites_fail() {
        let mut engine = engine();
        for text in COMPOSITES {
            let n = BigUint::parse_bytes(text.as_bytes(), 10).unwrap();
            assert!(!engine.is_prime(&n).unwrap(), "{} is composite", text);
        }
    }

    #[test]
    fn lucas_accepts_the_prime_corpus() {
        let engine = engine();
        for text in PRIMES {
            let p = BigUint::parse_bytes(text.as_bytes(), 10).unwrap();
            assert!(engine.is_prime_lucas(&p), "{} is prime", text);
        }
    }

    #[test]
    fn lucas_rejects_plain_composites() {
        let engine = engine();
        for n in [15u32, 21, 33, 91, 119, 561] {
            assert!(!engine.is_prime_lucas(&BigUint::from(n)), "{}", n);
        }
    }

    #[test]
    fn miller_rabin_small_grid() {
        let mut engine = engine();
        // Exhaustive check against naive primality on odd 5..2000.
        let mut t = 5u64;
        while t < 2000 {
            let naive = (2..t).take_while(|d| d * d <= t).all(|d| t % d != 0);
            assert_eq!(
                engine.is_prime_miller_rabin(&BigUint::from(t), 20),
                naive,
                "{}",
                t
            );
            t += 2;
        }
    }

    #[test]
    fn sieve_respects_its_bound() {
        let engine = engine();
        let p = BigUint::parse_bytes(PRIMES[0].as_bytes(), 10).unwrap();
        assert!(engine.is_prime_sieve(&p, Some(1000)).unwrap());
        assert!(engine.is_prime_sieve(&p, None).unwrap());
        assert!(engine.is_prime_sieve(&p, Some(100_000)).is_err());
    }

    #[test]
    fn smoothness_definition() {
        let engine = engine();

        // Entirely made of table primes.
        let smooth = (0..100).fold(BigUint::one(), |acc, _| acc * 3u32);
        assert!(engine.is_smooth(&smooth));
        assert!(engine.is_smooth(&(BigUint::one() << 200)));

        // A large prime keeps all of its bits after the trial division.
        let p = BigUint::parse_bytes(PRIMES[5].as_bytes(), 10).unwrap();
        assert!(!engine.is_smooth(&p));

        // A large prime times a smooth part is still rough.
        let padded = &p << 30;
        assert!(!engine.is_smooth(&padded));
    }

    fn assert_factor_properties(engine: &mut PrimeEngine, p: &BigUint, bits: usize) {
        assert_eq!(p.bits(), bits);
        // Top two bits set.
        assert!(((p >> (bits - 2)) & BigUint::from(3u32)) == BigUint::from(3u32));

        let half = (p - 1u32) >> 1;
        assert!(engine.is_prime(p).unwrap());
        assert!(engine.is_prime(&half).unwrap());

        assert!(!engine.is_smooth(&(&half - 1u32)));
        assert!(!engine.is_smooth(&(&half + 1u32)));
        assert!(!engine.is_smooth(&(p + 1u32)));
    }

    #[test]
    fn rsa_factor_search() {
        let mut engine = engine();
        let mut prng = test_prng();
        let p = engine.find_rsa_factor(192, &mut prng).unwrap();
        assert_factor_properties(&mut engine, &p, 192);
    }

    #[test]
    fn rsa_factor_uniform_search() {
        let mut engine = engine();
        let mut prng = test_prng();
        let p = engine.find_rsa_factor_ft(192, &mut prng).unwrap();
        assert_factor_properties(&mut engine, &p, 192);
    }

    #[test]
    fn uniform_prime_has_exact_size() {
        let mut engine = engine();
        let mut prng = test_prng();
        for _ in 0..4 {
            let p = engine.gen_prime_ft(192, &mut prng).unwrap();
            assert_eq!(p.bits(), 192);
            assert!(engine.is_prime_miller_rabin(&p, 0));
            assert!(engine.is_prime_lucas(&p));
        }
    }

    #[test]
    #[ignore = "expensive: full-size searches"]
    fn full_size_factor_and_uniform_prime() {
        let mut engine = engine();
        let mut prng = test_prng();

        let p = engine.find_rsa_factor(512, &mut prng).unwrap();
        assert_factor_properties(&mut engine, &p, 512);

        let p = engine.gen_prime_ft(1024, &mut prng).unwrap();
        assert_eq!(p.bits(), 1024);
        assert!(engine.is_prime_miller_rabin(&p, 0));
        assert!(engine.is_prime_lucas(&p));
    }

    #[test]
    fn tiny_factor_requests_are_refused() {
        let mut engine = engine();
        let mut prng = test_prng();
        assert!(engine.find_rsa_factor(64, &mut prng).is_err());
        assert!(engine.find_rsa_factor_ft(64, &mut prng).is_err());
    }
}
