#![allow(missing_docs)] // test only
use series_mul::{
    multiply, multiply_truncated,
    poly::{DegreeTruncator, Monomial},
    Coefficient, Error, Key, MulConfig, Series, SymbolSet, Term,
};
use term_table::hash::DefaultBuildHasher;

type RefMap<K, V> = hashbrown::HashMap<K, V, DefaultBuildHasher>;

fn config_with(workers: usize) -> MulConfig {
    MulConfig {
        max_workers: workers,
        // Force the configured worker count (and the estimation pass) even
        // for small operands.
        min_work_per_worker: 1,
        ..Default::default()
    }
}

fn poly_series(
    symbols: &SymbolSet,
    terms: &[(i64, &[u32])],
) -> Series<i64, Monomial> {
    Series::from_terms(
        symbols.clone(),
        terms
            .iter()
            .map(|(c, exps)| Term::new(*c, Monomial::new(*exps))),
    )
    .unwrap()
}

/// Reference product computed with a plain hash map.
fn reference_product(
    lhs: &Series<i64, Monomial>,
    rhs: &Series<i64, Monomial>,
) -> RefMap<Vec<u32>, i64> {
    let mut expected: RefMap<Vec<u32>, i64> = RefMap::default();
    for t1 in lhs.iter() {
        for t2 in rhs.iter() {
            let exponents: Vec<u32> = t1
                .key
                .exponents()
                .iter()
                .zip(t2.key.exponents())
                .map(|(a, b)| a + b)
                .collect();
            *expected.entry(exponents).or_insert(0) += t1.coefficient * t2.coefficient;
        }
    }
    expected.retain(|_, coefficient| *coefficient != 0);
    expected
}

fn assert_matches_reference(
    product: &Series<i64, Monomial>,
    expected: &RefMap<Vec<u32>, i64>,
) {
    assert_eq!(product.len(), expected.len());
    for term in product.iter() {
        assert_eq!(
            expected.get(&term.key.exponents().to_vec()),
            Some(&term.coefficient),
            "wrong coefficient for {:?}",
            term.key
        );
    }
}

#[test]
fn single_terms_multiply_to_a_single_term() {
    let symbols = SymbolSet::new(["x", "y"]);
    let a = poly_series(&symbols, &[(1, &[1, 0])]);
    let b = poly_series(&symbols, &[(1, &[0, 1])]);
    for workers in [1, 4] {
        let product = multiply(&a, &b, &config_with(workers)).unwrap();
        assert_eq!(product.len(), 1);
        let term = product.find(&Monomial::new([1, 1])).unwrap();
        assert_eq!(term.coefficient, 1);
    }
}

#[test]
fn binomial_square_has_the_cross_term() {
    let symbols = SymbolSet::new(["x", "y"]);
    let a = poly_series(&symbols, &[(1, &[1, 0]), (1, &[0, 1])]);
    for workers in [1, 2] {
        let square = multiply(&a, &a, &config_with(workers)).unwrap();
        assert_eq!(square.len(), 3);
        assert_eq!(square.find(&Monomial::new([2, 0])).unwrap().coefficient, 1);
        assert_eq!(square.find(&Monomial::new([1, 1])).unwrap().coefficient, 2);
        assert_eq!(square.find(&Monomial::new([0, 2])).unwrap().coefficient, 1);
    }
}

#[test]
fn empty_operands_yield_the_empty_series() {
    let symbols = SymbolSet::new(["x"]);
    let empty: Series<i64, Monomial> = Series::new(symbols.clone());
    let a = poly_series(&symbols, &[(7, &[2])]);
    for workers in [1, 4] {
        let config = config_with(workers);
        assert!(multiply(&a, &empty, &config).unwrap().is_empty());
        assert!(multiply(&empty, &a, &config).unwrap().is_empty());
        assert!(multiply(&empty, &empty, &config).unwrap().is_empty());
    }
}

#[test]
fn mismatched_symbol_sets_are_rejected() {
    let a = poly_series(&SymbolSet::new(["x"]), &[(1, &[1])]);
    let b = poly_series(&SymbolSet::new(["y"]), &[(1, &[1])]);
    assert_eq!(
        multiply(&a, &b, &MulConfig::default()).err(),
        Some(Error::SymbolSetMismatch)
    );
}

/// Deterministically generated operands with plenty of key collisions and
/// sign mixing, so products accumulate and sometimes cancel.
fn collision_heavy_series(len: usize, salt: u64) -> Series<i64, Monomial> {
    let symbols = SymbolSet::new(["x", "y", "z"]);
    let terms = (0..len).map(|i| {
        let mixed = (i as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ salt;
        let coefficient = (mixed % 19) as i64 - 9;
        let coefficient = if coefficient == 0 { 1 } else { coefficient };
        Term::new(
            coefficient,
            Monomial::new([
                (mixed % 9) as u32,
                ((mixed >> 8) % 7) as u32,
                ((mixed >> 16) % 5) as u32,
            ]),
        )
    });
    Series::from_terms(symbols, terms).unwrap()
}

#[test]
fn product_is_identical_for_every_worker_count() {
    let a = collision_heavy_series(120, 1);
    let b = collision_heavy_series(90, 2);
    let expected = reference_product(&a, &b);
    let serial = multiply(&a, &b, &config_with(1)).unwrap();
    assert_matches_reference(&serial, &expected);
    for workers in 2..5 {
        let parallel = multiply(&a, &b, &config_with(workers)).unwrap();
        assert_eq!(parallel, serial);
        assert_matches_reference(&parallel, &expected);
    }
}

#[test]
fn large_product_matches_the_reference() {
    let a = collision_heavy_series(700, 3);
    let b = collision_heavy_series(650, 4);
    let expected = reference_product(&a, &b);
    for workers in [1, 4] {
        let product = multiply(&a, &b, &config_with(workers)).unwrap();
        assert_matches_reference(&product, &expected);
    }
}

#[test]
fn operands_are_left_untouched() {
    let a = collision_heavy_series(50, 5);
    let b = collision_heavy_series(40, 6);
    let a_before = a.clone();
    let b_before = b.clone();
    multiply(&a, &b, &config_with(4)).unwrap();
    assert_eq!(a, a_before);
    assert_eq!(b, b_before);
}

#[test]
fn degree_truncation_equals_the_filtered_product() {
    let a = collision_heavy_series(80, 7);
    let b = collision_heavy_series(70, 8);
    let full = multiply(&a, &b, &config_with(1)).unwrap();
    for limit in [0u64, 2, 4, 8] {
        let truncator = DegreeTruncator::new(limit);
        for workers in [1, 3] {
            let truncated =
                multiply_truncated(&a, &b, &truncator, &config_with(workers)).unwrap();
            let expected = Series::from_terms(
                full.symbols().clone(),
                full.iter()
                    .filter(|term| term.key.total_degree() <= limit)
                    .cloned(),
            )
            .unwrap();
            assert_eq!(truncated, expected);
        }
    }
}

/// A key with multiply arity two: the product of two "frequencies" yields
/// both their sum and their absolute difference, as in product-to-sum
/// identities.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Wave(u32);

impl Key for Wave {
    const ARITY: usize = 2;

    type Product<C: Coefficient> = [Term<C, Wave>; 2];

    fn multiply<C: Coefficient>(
        lhs: &Term<C, Self>,
        rhs: &Term<C, Self>,
        _symbols: &SymbolSet,
    ) -> [Term<C, Wave>; 2] {
        let coefficient = lhs.coefficient.mul(&rhs.coefficient);
        [
            Term::new(coefficient.clone(), Wave(lhs.key.0 + rhs.key.0)),
            Term::new(coefficient, Wave(lhs.key.0.abs_diff(rhs.key.0))),
        ]
    }

    fn is_compatible(&self, _symbols: &SymbolSet) -> bool {
        true
    }
}

fn wave_series(frequencies: &[(i64, u32)]) -> Series<i64, Wave> {
    Series::from_terms(
        SymbolSet::empty(),
        frequencies.iter().map(|(c, f)| Term::new(*c, Wave(*f))),
    )
    .unwrap()
}

#[test]
fn arity_two_products_yield_both_terms() {
    let a = wave_series(&[(2, 1)]);
    let b = wave_series(&[(3, 2)]);
    let product = multiply(&a, &b, &config_with(1)).unwrap();
    assert_eq!(product.len(), 2);
    assert_eq!(product.find(&Wave(3)).unwrap().coefficient, 6);
    assert_eq!(product.find(&Wave(1)).unwrap().coefficient, 6);
}

#[test]
fn arity_two_products_accumulate_across_result_terms() {
    // 1 * 1 produces the keys 2 and 0; squaring a single wave therefore
    // yields exactly two terms with equal coefficients.
    let a = wave_series(&[(5, 1)]);
    let square = multiply(&a, &a, &config_with(1)).unwrap();
    assert_eq!(square.len(), 2);
    assert_eq!(square.find(&Wave(2)).unwrap().coefficient, 25);
    assert_eq!(square.find(&Wave(0)).unwrap().coefficient, 25);
}

#[test]
fn arity_two_products_match_the_reference() {
    let a = wave_series(&[(2, 1), (-3, 4), (1, 7), (4, 2), (-1, 3), (2, 9)]);
    let b = wave_series(&[(1, 2), (5, 3), (-2, 5), (3, 1), (1, 8)]);
    let mut expected: RefMap<u32, i64> = RefMap::default();
    for t1 in a.iter() {
        for t2 in b.iter() {
            let c = t1.coefficient * t2.coefficient;
            *expected.entry(t1.key.0 + t2.key.0).or_insert(0) += c;
            *expected.entry(t1.key.0.abs_diff(t2.key.0)).or_insert(0) += c;
        }
    }
    expected.retain(|_, c| *c != 0);
    for workers in [1, 4] {
        let product = multiply(&a, &b, &config_with(workers)).unwrap();
        assert_eq!(product.len(), expected.len());
        for term in product.iter() {
            assert_eq!(expected.get(&term.key.0), Some(&term.coefficient));
        }
    }
}

/// Coefficient whose multiplication panics on a poisoned operand pair,
/// standing in for an arbitrary collaborator failure.
#[derive(Clone, PartialEq, Eq, Debug)]
struct Fragile(i64);

const POISON: i64 = i64::MIN;

impl Coefficient for Fragile {
    fn add_assign(&mut self, rhs: &Self) {
        self.0 += rhs.0;
    }

    fn mul(&self, rhs: &Self) -> Self {
        if self.0 == POISON || rhs.0 == POISON {
            panic!("poisoned coefficient");
        }
        Fragile(self.0 * rhs.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[test]
fn collaborator_panics_surface_and_leave_operands_unchanged() {
    let symbols = SymbolSet::new(["x", "y"]);
    for workers in [1, 4] {
        let a: Series<Fragile, Monomial> = Series::from_terms(
            symbols.clone(),
            (0..40u32).map(|i| {
                let coefficient = if i == 23 { POISON } else { i as i64 + 1 };
                Term::new(Fragile(coefficient), Monomial::new([i, 0]))
            }),
        )
        .unwrap();
        let b: Series<Fragile, Monomial> = Series::from_terms(
            symbols.clone(),
            (0..30u32).map(|i| Term::new(Fragile(1), Monomial::new([0, i]))),
        )
        .unwrap();
        let a_before = a.clone();
        let b_before = b.clone();
        let config = config_with(workers);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            multiply(&a, &b, &config)
        }));
        assert!(outcome.is_err());
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }
}
