use std::fmt;
use std::ops;
use std::rc::Rc;

use thiserror::Error;

/// The atomic test of a pattern. Returning `None` rejects the symbol;
/// returning `Some(v)` accepts it, and `v` is what path tracking records
/// for the step.
pub(crate) type Pred<S, V> = Rc<dyn Fn(&S) -> Option<V>>;

/// Error produced when a pattern is built with impossible bounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum PatternError {
    /// A repetition with both bounds finite was given `min > max`.
    #[error("repetition lower bound {min} exceeds upper bound {max}")]
    RepetitionBounds { min: usize, max: usize },
}

/// A regular expression over symbols of type `S`.
///
/// Symbols are opaque to the engine: the only way a pattern inspects one
/// is through the predicates supplied by the caller. `K` is the type of
/// capture group keys and `V` the type of values recorded on the match
/// path by value-producing predicates.
///
/// Patterns are built by composition. `a + b` is concatenation, `a | b`
/// is alternation (the left arm wins ambiguities), `p * n` and
/// `p * (min, max)` are repetition shorthands.
pub struct Pattern<S, K = &'static str, V = ()> {
    pub(crate) node: Node<S, K, V>,
}

/// The closed variant set patterns are made of.
pub(crate) enum Node<S, K, V> {
    Pred(Pred<S, V>),
    Alt(Box<Node<S, K, V>>, Box<Node<S, K, V>>),
    Seq(Vec<Node<S, K, V>>),
    Star { body: Box<Node<S, K, V>>, greedy: bool },
    Plus { body: Box<Node<S, K, V>>, greedy: bool },
    Opt { body: Box<Node<S, K, V>>, greedy: bool },
    Group { body: Box<Node<S, K, V>>, key: K },
    Repeat { body: Box<Node<S, K, V>>, min: usize, max: Option<usize>, greedy: bool },
}

impl<S, K, V> Pattern<S, K, V> {
    /// A pattern matching one symbol accepted by `f`. The value returned
    /// for an accepted symbol is recorded on the path when path tracking
    /// is enabled.
    pub fn pred_map(f: impl Fn(&S) -> Option<V> + 'static) -> Self {
        Pattern { node: Node::Pred(Rc::new(f)) }
    }

    /// A pattern matching one symbol for which `f` returns true.
    pub fn pred(f: impl Fn(&S) -> bool + 'static) -> Self
    where
        V: Default + 'static,
    {
        Self::pred_map(move |x| if f(x) { Some(V::default()) } else { None })
    }

    /// A pattern matching any one symbol.
    pub fn any() -> Self
    where
        V: Default + 'static,
    {
        Self::pred_map(|_| Some(V::default()))
    }

    /// A pattern matching one symbol equal to `x`.
    pub fn lit(x: S) -> Self
    where
        S: PartialEq + 'static,
        V: Default + 'static,
    {
        Self::pred_map(move |y| if *y == x { Some(V::default()) } else { None })
    }

    /// Alternation. `self` has priority: when both arms could match, the
    /// match of `self` wins regardless of length.
    pub fn or(self, other: Self) -> Self {
        Pattern { node: Node::Alt(Box::new(self.node), Box::new(other.node)) }
    }

    /// Concatenation. Adjacent concatenations flatten, so `a + b + c`
    /// builds one sequence of three, not a nested pair.
    pub fn then(self, other: Self) -> Self {
        let mut xs = match self.node {
            Node::Seq(xs) => xs,
            node => vec![node],
        };
        match other.node {
            Node::Seq(ys) => xs.extend(ys),
            node => xs.push(node),
        }
        Pattern { node: Node::Seq(xs) }
    }

    /// Zero or more repetitions, as many as possible.
    pub fn star(self) -> Self {
        Pattern { node: Node::Star { body: Box::new(self.node), greedy: true } }
    }

    /// Zero or more repetitions, as few as possible.
    pub fn star_lazy(self) -> Self {
        Pattern { node: Node::Star { body: Box::new(self.node), greedy: false } }
    }

    /// One or more repetitions, as many as possible.
    pub fn plus(self) -> Self {
        Pattern { node: Node::Plus { body: Box::new(self.node), greedy: true } }
    }

    /// One or more repetitions, as few as possible.
    pub fn plus_lazy(self) -> Self {
        Pattern { node: Node::Plus { body: Box::new(self.node), greedy: false } }
    }

    /// Zero or one occurrence, preferring one.
    pub fn opt(self) -> Self {
        Pattern { node: Node::Opt { body: Box::new(self.node), greedy: true } }
    }

    /// Zero or one occurrence, preferring zero.
    pub fn opt_lazy(self) -> Self {
        Pattern { node: Node::Opt { body: Box::new(self.node), greedy: false } }
    }

    /// Capture the span matched by this pattern under `key`.
    pub fn group(self, key: K) -> Self {
        Pattern { node: Node::Group { body: Box::new(self.node), key } }
    }

    /// Between `min` and `max` repetitions, as many as possible.
    /// `max` of `None` means unbounded.
    pub fn repeat(self, min: usize, max: Option<usize>) -> Result<Self, PatternError> {
        self.repeat_greedy(min, max, true)
    }

    /// Between `min` and `max` repetitions, as few as possible.
    pub fn repeat_lazy(self, min: usize, max: Option<usize>) -> Result<Self, PatternError> {
        self.repeat_greedy(min, max, false)
    }

    fn repeat_greedy(self, min: usize, max: Option<usize>, greedy: bool) -> Result<Self, PatternError> {
        if let Some(mx) = max {
            if min > mx {
                return Err(PatternError::RepetitionBounds { min, max: mx });
            }
        }
        Ok(Pattern { node: Node::Repeat { body: Box::new(self.node), min, max, greedy } })
    }
}

impl<S, K, V> ops::BitOr for Pattern<S, K, V> {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.or(rhs)
    }
}

impl<S, K, V> ops::Add for Pattern<S, K, V> {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.then(rhs)
    }
}

/// Exactly `n` repetitions.
impl<S, K, V> ops::Mul<usize> for Pattern<S, K, V> {
    type Output = Self;

    fn mul(self, n: usize) -> Self {
        Pattern { node: Node::Repeat { body: Box::new(self.node), min: n, max: Some(n), greedy: true } }
    }
}

/// Between `min` and `max` repetitions; a `max` of `None` is unbounded.
///
/// This is shorthand for [`Pattern::repeat`] and panics on impossible
/// bounds, the way `Index` panics where `get` returns `None`.
impl<S, K, V> ops::Mul<(usize, Option<usize>)> for Pattern<S, K, V> {
    type Output = Self;

    fn mul(self, (min, max): (usize, Option<usize>)) -> Self {
        match self.repeat(min, max) {
            Ok(p) => p,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<S, K: Clone, V> Clone for Node<S, K, V> {
    fn clone(&self) -> Self {
        match self {
            Node::Pred(f) => Node::Pred(Rc::clone(f)),
            Node::Alt(a, b) => Node::Alt(a.clone(), b.clone()),
            Node::Seq(xs) => Node::Seq(xs.clone()),
            Node::Star { body, greedy } => Node::Star { body: body.clone(), greedy: *greedy },
            Node::Plus { body, greedy } => Node::Plus { body: body.clone(), greedy: *greedy },
            Node::Opt { body, greedy } => Node::Opt { body: body.clone(), greedy: *greedy },
            Node::Group { body, key } => Node::Group { body: body.clone(), key: key.clone() },
            Node::Repeat { body, min, max, greedy } => {
                Node::Repeat { body: body.clone(), min: *min, max: *max, greedy: *greedy }
            }
        }
    }
}

impl<S, K: Clone, V> Clone for Pattern<S, K, V> {
    fn clone(&self) -> Self {
        Pattern { node: self.node.clone() }
    }
}

impl<S, K: fmt::Debug, V> fmt::Debug for Node<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Pred(_) => f.write_str("pred"),
            Node::Alt(a, b) => write!(f, "({:?} | {:?})", a, b),
            Node::Seq(xs) => {
                f.write_str("(")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write!(f, "{:?}", x)?;
                }
                f.write_str(")")
            }
            Node::Star { body, greedy } => write!(f, "{:?}*{}", body, lazy_mark(*greedy)),
            Node::Plus { body, greedy } => write!(f, "{:?}+{}", body, lazy_mark(*greedy)),
            Node::Opt { body, greedy } => write!(f, "{:?}?{}", body, lazy_mark(*greedy)),
            Node::Group { body, key } => write!(f, "group({:?}, {:?})", body, key),
            Node::Repeat { body, min, max, greedy } => {
                match max {
                    Some(mx) if *mx == *min => write!(f, "{:?}{{{}}}", body, min),
                    Some(mx) => write!(f, "{:?}{{{},{}}}{}", body, min, mx, lazy_mark(*greedy)),
                    None => write!(f, "{:?}{{{},}}{}", body, min, lazy_mark(*greedy)),
                }
            }
        }
    }
}

fn lazy_mark(greedy: bool) -> &'static str {
    if greedy {
        ""
    } else {
        "?"
    }
}

impl<S, K: fmt::Debug, V> fmt::Debug for Pattern<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)
    }
}
