//! Regular expressions over streams of arbitrary symbols.
//!
//! Instead of matching characters in a string, patterns here match any
//! symbols the caller chooses, and the atomic test is a caller-supplied
//! predicate. Patterns compile to a small instruction graph executed by
//! a Thompson-style virtual machine that advances every viable
//! alternative in lock step, so the pathological patterns that blow up
//! backtracking engines run in polynomial time here.
//!
//! ```
//! use symre::Pattern;
//!
//! // Symbols are whatever the caller chooses; here, integers.
//! let even: Pattern<i32> = Pattern::pred(|n| n % 2 == 0);
//! let odd: Pattern<i32> = Pattern::pred(|n| n % 2 != 0);
//!
//! // Two or more even numbers followed by an odd one.
//! let p = even.repeat(2, None).unwrap() + odd;
//! let m = p.search(vec![1, 2, 4, 6, 7, 8]).unwrap();
//! assert_eq!(m.span(), (1, 5));
//! ```
//!
//! Capture groups record sub-spans under caller-chosen keys, and
//! value-producing predicates can additionally report what they saw
//! along the winning path, see [`Pattern::pred_map`] and
//! [`Match::path`].

use std::hash::Hash;

use thiserror::Error;

mod find;
mod pattern;
mod program;
mod vm;

pub use crate::find::FindIter;
pub use crate::pattern::{Pattern, PatternError};

use crate::program::GroupKey;
use crate::vm::Captures;

/// Error from operations on a [`Match`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum MatchError {
    /// [`Match::shift`] on a match that records a path. Path entries are
    /// positionless, so a shifted path-bearing match would lie about
    /// where its entries came from.
    #[error("cannot shift a match that records a path")]
    ShiftWithPath,
}

/// The result of a successful match: the whole-match span, the spans of
/// every capture group that participated, and optionally the path of
/// predicate values collected along the winning thread.
///
/// Spans are `(start, end)` pairs of symbol indices, end exclusive. The
/// engine never holds the input, so a span is the whole answer; slicing
/// is up to the caller.
#[derive(Clone, Debug)]
pub struct Match<K, V = ()> {
    whole: (usize, usize),
    captures: Captures<K>,
    path: Option<Vec<V>>,
}

impl<K: Clone + Eq + Hash, V> Match<K, V> {
    pub(crate) fn from_parts(captures: Captures<K>, path: Option<Vec<V>>) -> Option<Self> {
        let whole = captures.get(&GroupKey::Whole)?;
        Some(Match { whole, captures, path })
    }

    /// The span of the whole match.
    #[inline]
    pub fn span(&self) -> (usize, usize) {
        self.whole
    }

    /// The starting position of the match.
    #[inline]
    pub fn start(&self) -> usize {
        self.whole.0
    }

    /// The ending position of the match, exclusive.
    #[inline]
    pub fn end(&self) -> usize {
        self.whole.1
    }

    /// True if and only if the match consumed no symbols.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.whole.0 == self.whole.1
    }

    /// The span captured under `key`, or `None` if that group did not
    /// participate in the match.
    pub fn group(&self, key: &K) -> Option<(usize, usize)> {
        self.captures.get(&GroupKey::User(key.clone()))
    }

    /// The starting position of the group captured under `key`.
    pub fn group_start(&self, key: &K) -> Option<usize> {
        self.group(key).map(|(start, _)| start)
    }

    /// The ending position of the group captured under `key`, exclusive.
    pub fn group_end(&self, key: &K) -> Option<usize> {
        self.group(key).map(|(_, end)| end)
    }

    /// Whether the group under `key` participated in the match.
    pub fn has_group(&self, key: &K) -> bool {
        self.captures.contains(&GroupKey::User(key.clone()))
    }

    /// Every user key that participated, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &K> {
        self.captures.user_keys()
    }

    /// Move every recorded index `delta` positions to the right,
    /// returning the shifted match. This is how matches found on a tail
    /// of a sequence are reported in the coordinates of the whole
    /// sequence. Fails on a path-bearing match.
    pub fn shift(self, delta: usize) -> Result<Self, MatchError> {
        if self.path.is_some() {
            return Err(MatchError::ShiftWithPath);
        }
        Ok(self.shifted(delta))
    }

    pub(crate) fn shifted(mut self, delta: usize) -> Self {
        self.whole.0 += delta;
        self.whole.1 += delta;
        self.captures.shift(delta);
        self
    }

    /// The values the predicates returned along the winning thread, one
    /// per consumed symbol. `None` unless the match was produced with
    /// path tracking enabled.
    pub fn path(&self) -> Option<&[V]> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isprime(n: u32) -> bool {
        if n < 2 {
            return false;
        }
        let mut i = 2;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    /// The numbers 0..10000 spelled in the prime/composite alphabet, so
    /// results can be checked against a conventional string regex.
    fn primes_string() -> String {
        (0..10000).map(|n| if isprime(n) { 'a' } else { 'b' }).collect()
    }

    fn prime() -> Pattern<u32> {
        Pattern::pred(|&n| isprime(n))
    }

    fn composite() -> Pattern<u32> {
        Pattern::pred(|&n| !isprime(n))
    }

    fn reference_find(re: &str) -> Option<(usize, usize)> {
        let s = primes_string();
        regex::Regex::new(re).unwrap().find(&s).map(|m| (m.start(), m.end()))
    }

    #[test]
    fn match_agrees_with_the_reference_engine() {
        let p = composite() + composite() + prime() + prime() + composite();
        let m = p.match_prefix(0..10000).expect("0 1 are composite, 2 3 prime, 4 composite");
        assert_eq!(m.span(), (0, 5));
        assert_eq!(Some(m.span()), reference_find("^bbaab"));
    }

    #[test]
    fn search_agrees_with_the_reference_engine() {
        let p = prime() + composite() + composite() + composite() + prime();
        let m = p.search(0..10000).unwrap();
        assert_eq!(Some(m.span()), reference_find("abbba"));
    }

    #[test]
    fn search_with_counted_repetition() {
        let tab = prime() + composite() + prime();
        let p = tab.clone() + composite() * 3 + tab;
        let m = p.search(0..10000).unwrap();
        assert_eq!(Some(m.span()), reference_find("ababbbaba"));
    }

    #[test]
    fn search_with_greedy_plus() {
        let tab = prime() + composite();
        let p = tab.clone() + tab + composite().plus();
        let m = p.search(0..10000).unwrap();
        assert_eq!(Some(m.span()), reference_find("ababb+"));
    }

    #[test]
    fn search_with_lazy_plus() {
        let tab = prime() + composite();
        let p = tab * 2 + composite().plus_lazy();
        let m = p.search(0..10000).unwrap();
        assert_eq!(Some(m.span()), reference_find("ababb+?"));
    }

    #[test]
    fn search_with_bounded_repetition() {
        let tab = prime() + composite();
        let p = tab * (2, Some(5));
        let m = p.search(0..10000).unwrap();
        assert_eq!(Some(m.span()), reference_find("(?:ab){2,5}"));
    }

    #[test]
    fn find_iter_agrees_with_the_reference_engine() {
        let seq: Vec<u32> = (0..10000).collect();
        let tab = prime() + composite();
        let p = tab * (2, None);
        let spans: Vec<_> = p.find_iter(&seq).map(|m| m.span()).collect();
        let s = primes_string();
        let expected: Vec<_> = regex::Regex::new("(?:ab){2,}")
            .unwrap()
            .find_iter(&s)
            .map(|m| (m.start(), m.end()))
            .collect();
        assert_eq!(spans, expected);
    }

    #[test]
    fn find_iter_reports_groups_in_sequence_coordinates() {
        let seq: Vec<u32> = (0..10000).collect();
        let tab = prime() + composite();
        let p = tab * (2, None) + composite().plus().group("tail");
        let groups: Vec<_> = p.find_iter(&seq).map(|m| m.group(&"tail").unwrap()).collect();
        let s = primes_string();
        let expected: Vec<_> = regex::Regex::new("(?:ab){2,}(b+)")
            .unwrap()
            .captures_iter(&s)
            .map(|c| {
                let g = c.get(1).unwrap();
                (g.start(), g.end())
            })
            .collect();
        assert_eq!(groups, expected);
    }

    #[test]
    fn pathological_pattern_finishes_quickly() {
        // The classic killer of backtracking engines: a?{n} a{n} on a^n.
        const N: usize = 100;
        let a = || Pattern::<char>::lit('a');
        let p = a().opt() * N + a() * N;
        let input = vec!['a'; N];
        let started = std::time::Instant::now();
        let m = p.match_prefix(input);
        assert!(m.is_some());
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn greediness_decides_the_match_length() {
        let greedy = Pattern::<char>::lit('a').star();
        assert_eq!(greedy.match_prefix("aaa".chars()).unwrap().span(), (0, 3));
        let lazy = Pattern::<char>::lit('a').star_lazy();
        assert_eq!(lazy.match_prefix("aaa".chars()).unwrap().span(), (0, 0));
    }

    #[test]
    fn alternation_is_leftmost_first() {
        // The first arm wins even though the second would match more.
        let a = || Pattern::<char>::lit('a');
        let b = || Pattern::<char>::lit('b');
        let p = a() | (a() + b());
        assert_eq!(p.match_prefix("ab".chars()).unwrap().span(), (0, 1));
    }

    #[test]
    fn repetition_bounds_are_enforced() {
        let ab = || Pattern::<char>::lit('a') + Pattern::<char>::lit('b');
        let p = ab() * (2, Some(4));
        // Five copies available, the greedy bound stops at four.
        assert_eq!(p.match_prefix("ababababab".chars()).unwrap().span(), (0, 8));
        // One copy is below the lower bound.
        assert!(p.match_prefix("abba".chars()).is_none());
    }

    #[test]
    fn group_wrapping_the_whole_pattern_spans_the_whole_match() {
        let p = (prime() + composite().plus()).group("all");
        let m = p.search(0..10000).unwrap();
        assert_eq!(m.group(&"all"), Some(m.span()));
        assert!(m.has_group(&"all"));
        assert_eq!(m.groups().collect::<Vec<_>>(), vec![&"all"]);
        assert!(!m.has_group(&"other"));
        assert_eq!(m.group(&"other"), None);
    }

    fn sees(k: i32) -> Pattern<Vec<i32>, &'static str, i32> {
        Pattern::pred_map(move |xs: &Vec<i32>| if xs.contains(&k) { Some(k * k) } else { None })
    }

    #[test]
    fn path_records_the_winning_thread() {
        let x = || sees(1);
        let y = || sees(2);
        let z = || sees(3);
        let p = y().star() + (x() + z()).plus();
        let seq = vec![
            vec![1, 2],
            vec![1],
            vec![1, 2, 3],
            vec![1, 2],
            vec![2, 3],
            vec![0, 4, 5],
            vec![],
        ];
        let m = p.match_prefix_with_path(seq.clone()).expect("the prefix matches");
        assert_eq!(m.span(), (0, 5));
        assert_eq!(m.path(), Some(&[4, 1, 9, 1, 9][..]));
        // Without path tracking the same match carries no path.
        let m = p.match_prefix(seq).unwrap();
        assert_eq!(m.path(), None);
    }

    #[test]
    fn shift_moves_every_recorded_index() {
        let p = Pattern::<char>::lit('a').group("g");
        let m = p.match_prefix("a".chars()).unwrap().shift(10).unwrap();
        assert_eq!(m.span(), (10, 11));
        assert_eq!(m.group(&"g"), Some((10, 11)));
    }

    #[test]
    fn shift_refuses_a_path_bearing_match() {
        let p: Pattern<char> = Pattern::pred(|&c| c == 'a');
        let m = p.match_prefix_with_path("a".chars()).unwrap();
        assert_eq!(m.shift(1).unwrap_err(), MatchError::ShiftWithPath);
    }

    #[test]
    fn random_streams_agree_with_the_reference_engine() {
        use rand::prelude::*;

        let a = || Pattern::<char>::lit('a');
        let b = || Pattern::<char>::lit('b');
        let p = (a() + b()).plus() + b().opt() + a();
        let re = regex::Regex::new("(?:ab)+b?a").unwrap();
        let mut rng = SmallRng::from_seed([7; 16]);
        for _ in 0..200 {
            let len = rng.gen_range(0, 40);
            let s: String = (0..len).map(|_| if rng.gen::<bool>() { 'a' } else { 'b' }).collect();
            let ours = p.search(s.chars()).map(|m| m.span());
            let theirs = re.find(&s).map(|m| (m.start(), m.end()));
            assert_eq!(ours, theirs, "diverged on {:?}", s);
        }
    }
}
