//! Case-insensitive, numeric-aware string ordering
//!
//! Mirrors the `natural_ci` ICU collation created by the migrations
//! (`en-US-u-kn-true` over `lower(name)`) so the memory store orders names
//! exactly like PostgreSQL does: digit runs compare by value, so `img2`
//! sorts before `img10`, and letters follow locale rules.

use icu_collator::{Collator, CollatorOptions, Numeric, Strength};
use std::cmp::Ordering;

fn collator() -> Collator {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Tertiary);
    options.numeric = Some(Numeric::On);
    // root collation data is compiled in; English has no tailoring on top of it
    Collator::try_new(&Default::default(), options).expect("compiled collation data is present")
}

thread_local! {
    static NATURAL: Collator = collator();
}

/// Compare two names ignoring case, with digit runs compared numerically
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    NATURAL.with(|collator| collator.compare(&a, &b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    #[test]
    fn test_numeric_runs_sort_by_value() {
        assert_eq!(sorted(vec!["img2", "img10", "img1"]), vec!["img1", "img2", "img10"]);
        assert_eq!(
            sorted(vec!["IMG_0100.jpg", "IMG_0020.jpg", "IMG_3.jpg"]),
            vec!["IMG_3.jpg", "IMG_0020.jpg", "IMG_0100.jpg"]
        );
        assert_eq!(natural_cmp("v01", "v2"), Ordering::Less);
    }

    #[test]
    fn test_case_is_ignored() {
        assert_eq!(natural_cmp("Beach", "beach"), Ordering::Equal);
        assert_eq!(sorted(vec!["banana", "Apple", "cherry"]), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("trip", "trip 2"), Ordering::Less);
        assert_eq!(natural_cmp("a9b", "a9"), Ordering::Greater);
    }

    #[test]
    fn test_letters_follow_locale_rules() {
        let cases = [
            ("Ångström", "Zebra", Ordering::Less),
            ("élan", "fjord", Ordering::Less),
            ("Éclair", "eclairs", Ordering::Less),
            ("a_b", "a1", Ordering::Less),
            ("a-b", "ab", Ordering::Less),
            ("Zürich", "zurich", Ordering::Greater),
        ];
        for (left, right, expected) in cases {
            assert_eq!(natural_cmp(left, right), expected, "{left} vs {right}");
        }

        assert_eq!(
            sorted(vec!["Zoo", "Öl", "Ende", "Äpfel", "apple"]),
            vec!["Äpfel", "apple", "Ende", "Öl", "Zoo"]
        );
    }
}
