use std::hash::Hash;

use crate::pattern::Pattern;
use crate::program::Program;
use crate::vm::{Captures, Vm};
use crate::Match;

impl<S, K, V> Pattern<S, K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Match the pattern against the beginning of the stream.
    ///
    /// Returns the highest-priority match anchored at the first symbol,
    /// or `None`. The stream is consumed only as far as needed to rule
    /// out a longer match.
    pub fn match_prefix<I>(&self, symbols: I) -> Option<Match<K, V>>
    where
        I: IntoIterator<Item = S>,
    {
        run(&Program::compile(&self.node), symbols, false)
    }

    /// Like [`match_prefix`](Self::match_prefix), additionally recording
    /// the value each predicate produced along the winning thread. The
    /// result answers [`Match::path`].
    pub fn match_prefix_with_path<I>(&self, symbols: I) -> Option<Match<K, V>>
    where
        I: IntoIterator<Item = S>,
    {
        run(&Program::compile(&self.node), symbols, true)
    }

    /// Find the first match anywhere in the stream.
    ///
    /// Earlier starting positions beat later ones, and at equal start the
    /// pattern's own priorities decide, so this agrees with leftmost-first
    /// engines.
    pub fn search<I>(&self, symbols: I) -> Option<Match<K, V>>
    where
        I: IntoIterator<Item = S>,
        S: 'static,
        V: Default + 'static,
    {
        run(&Program::compile_unanchored(&self.node), symbols, false)
    }

    /// Iterate over all non-overlapping matches in the sequence, leftmost
    /// first. An empty match advances the scan by one position, so the
    /// iterator terminates on any finite sequence.
    pub fn find_iter<'s>(&self, haystack: &'s [S]) -> FindIter<'s, S, K, V>
    where
        S: Clone + 'static,
        V: Default + 'static,
    {
        FindIter { program: Program::compile_unanchored(&self.node), haystack, at: 0 }
    }
}

/// Drive one machine over a symbol stream and return the best match.
///
/// A snapshot taken later always replaces an earlier one: with more
/// symbols consumed, any newly accepting thread had priority over the
/// previously accepting one at the moment that one was cut off.
fn run<S, K, V, I>(program: &Program<S, K, V>, symbols: I, keep_path: bool) -> Option<Match<K, V>>
where
    K: Clone + Eq + Hash,
    V: Clone,
    I: IntoIterator<Item = S>,
{
    let mut vm = Vm::new(program, keep_path);
    vm.take_epsilon_transitions();
    let mut best = snapshot(&vm);
    vm.cutoff();
    for x in symbols {
        if !vm.is_alive() {
            break;
        }
        vm.feed(&x);
        vm.take_epsilon_transitions();
        if let Some(snap) = snapshot(&vm) {
            best = Some(snap);
        }
        vm.cutoff();
    }
    let (captures, path) = best?;
    Match::from_parts(captures, path)
}

fn snapshot<S, K, V>(vm: &Vm<'_, S, K, V>) -> Option<(Captures<K>, Option<Vec<V>>)>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    vm.accepting().map(|(captures, path)| (captures.clone(), path.map(<[V]>::to_vec)))
}

/// Iterator over non-overlapping matches, returned by
/// [`Pattern::find_iter`]. The pattern is compiled once; each step
/// re-runs the machine on the unsearched tail and shifts the resulting
/// spans back into sequence coordinates.
pub struct FindIter<'s, S, K = &'static str, V = ()> {
    program: Program<S, K, V>,
    haystack: &'s [S],
    at: usize,
}

impl<'s, S, K, V> Iterator for FindIter<'s, S, K, V>
where
    S: Clone,
    K: Clone + Eq + Hash,
    V: Clone,
{
    type Item = Match<K, V>;

    fn next(&mut self) -> Option<Match<K, V>> {
        if self.at > self.haystack.len() {
            return None;
        }
        let tail = self.haystack[self.at..].iter().cloned();
        let m = match run(&self.program, tail, false) {
            Some(m) => m.shifted(self.at),
            None => {
                self.at = self.haystack.len() + 1;
                return None;
            }
        };
        let (start, end) = m.span();
        self.at = if start == end { end + 1 } else { end };
        Some(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Pattern<char> {
        Pattern::lit('a')
    }

    fn b() -> Pattern<char> {
        Pattern::lit('b')
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn match_prefix_is_anchored() {
        assert_eq!(a().match_prefix("ab".chars()).map(|m| m.span()), Some((0, 1)));
        assert!(a().match_prefix("ba".chars()).is_none());
    }

    #[test]
    fn search_finds_the_earliest_position() {
        let m = b().search("aaab".chars()).expect("a b is present");
        assert_eq!(m.span(), (3, 4));
    }

    #[test]
    fn search_prefers_the_earliest_over_the_longest() {
        // At position 0 only a single a matches; a longer run starts at 2.
        let p = a().plus();
        let m = p.search("abaa".chars()).expect("an a is present");
        assert_eq!(m.span(), (0, 1));
    }

    #[test]
    fn search_misses_cleanly() {
        assert!(a().search("bbb".chars()).is_none());
    }

    #[test]
    fn find_iter_collects_disjoint_matches() {
        let spans: Vec<_> = a().find_iter(&chars("aba")).map(|m| m.span()).collect();
        assert_eq!(spans, vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn find_iter_advances_past_empty_matches() {
        let spans: Vec<_> = a().star().find_iter(&chars("bbb")).map(|m| m.span()).collect();
        assert_eq!(spans, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn find_iter_on_an_empty_sequence() {
        let spans: Vec<_> = a().star().find_iter(&[]).map(|m| m.span()).collect();
        assert_eq!(spans, vec![(0, 0)]);
    }

    #[test]
    fn find_iter_shifts_group_spans() {
        let p = a() + b().plus().group("run");
        let haystack = chars("bbabba");
        let groups: Vec<_> = p.find_iter(&haystack).map(|m| m.group(&"run").unwrap()).collect();
        assert_eq!(groups, vec![(3, 5)]);
    }
}
