use std::fmt;
use std::rc::Rc;

use crate::pattern::{Node, Pred};

/// Instructions live in one arena per program and point at each other by
/// index, which keeps cyclic graphs (star and plus loops) expressible and
/// makes instruction identity a plain index comparison.
pub(crate) type InstrId = usize;

/// The single `Accept` instruction; the compiler pushes it first.
const ACCEPT: InstrId = 0;

/// One instruction of a compiled pattern.
///
/// `succ` and `split` edges form a directed, possibly cyclic graph.
/// `Split` explores `succ` before `split`: every greediness and
/// alternation-order decision is encoded in that edge order alone, the
/// executing machine never consults a flag.
pub(crate) enum Instr<S, K, V> {
    /// Consume one symbol if the predicate accepts it, then go to `succ`.
    Atom { pred: Pred<S, V>, succ: InstrId },
    /// Fork without consuming input; `succ` is the higher-priority arm.
    Split { succ: InstrId, split: InstrId },
    /// Record the current input index under `slot`, without consuming.
    Save { slot: Slot<K>, succ: InstrId },
    /// A thread stopping here has matched.
    Accept,
}

/// A capture group identifier. `Whole` is reserved for the span of the
/// entire match and compares unequal to every user key by construction.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) enum GroupKey<K> {
    Whole,
    User(K),
}

/// One boundary of a capture group, the record tag a `Save` writes.
#[derive(Clone, Debug)]
pub(crate) enum Slot<K> {
    Start(GroupKey<K>),
    End(GroupKey<K>),
}

/// A compiled pattern: the instruction arena plus the entry point.
///
/// Programs are read-only after compilation and can back any number of
/// machine runs.
pub(crate) struct Program<S, K, V> {
    instrs: Vec<Instr<S, K, V>>,
    start: InstrId,
}

impl<S, K, V> Program<S, K, V> {
    #[inline]
    pub(crate) fn instr(&self, id: InstrId) -> &Instr<S, K, V> {
        &self.instrs[id]
    }

    #[inline]
    pub(crate) fn start(&self) -> InstrId {
        self.start
    }

    /// Number of instructions; also the ceiling on simultaneous threads.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.instrs.len()
    }
}

impl<S, K: Clone, V> Program<S, K, V> {
    /// Compile a pattern anchored at the start of the input.
    pub(crate) fn compile(node: &Node<S, K, V>) -> Self {
        let mut c = Compiler::new();
        let start = c.emit_whole_group(node);
        Program { instrs: c.instrs, start }
    }

    /// Compile a pattern that may begin anywhere.
    ///
    /// A lazy any-symbol loop in front of the whole-match group gives the
    /// pattern itself priority over advancing the starting position, so
    /// the accept at the earliest position wins.
    pub(crate) fn compile_unanchored(node: &Node<S, K, V>) -> Self
    where
        S: 'static,
        V: Default + 'static,
    {
        let mut c = Compiler::new();
        let entry = c.emit_whole_group(node);
        let skip = c.push(Instr::Split { succ: entry, split: ACCEPT });
        let any: Pred<S, V> = Rc::new(|_| Some(V::default()));
        let any = c.push(Instr::Atom { pred: any, succ: skip });
        c.patch_split(skip, entry, any);
        Program { instrs: c.instrs, start: skip }
    }
}

struct Compiler<S, K, V> {
    instrs: Vec<Instr<S, K, V>>,
}

impl<S, K: Clone, V> Compiler<S, K, V> {
    fn new() -> Self {
        Compiler { instrs: vec![Instr::Accept] }
    }

    fn push(&mut self, instr: Instr<S, K, V>) -> InstrId {
        self.instrs.push(instr);
        self.instrs.len() - 1
    }

    /// Loop heads are pushed before their body compiles, so both arms
    /// start out dangling and get patched here.
    fn patch_split(&mut self, id: InstrId, succ: InstrId, split: InstrId) {
        match &mut self.instrs[id] {
            Instr::Split { succ: s, split: t } => {
                *s = succ;
                *t = split;
            }
            _ => unreachable!("patched instruction is always a split"),
        }
    }

    /// Wrap the pattern in the reserved whole-match group and return the
    /// program entry.
    fn emit_whole_group(&mut self, node: &Node<S, K, V>) -> InstrId {
        let end = self.push(Instr::Save { slot: Slot::End(GroupKey::Whole), succ: ACCEPT });
        let entry = self.emit(node, end);
        self.push(Instr::Save { slot: Slot::Start(GroupKey::Whole), succ: entry })
    }

    /// Emit the subgraph for `node`, with every out-edge leading to
    /// `cont`, and return its entry instruction.
    fn emit(&mut self, node: &Node<S, K, V>, cont: InstrId) -> InstrId {
        match node {
            Node::Pred(pred) => self.push(Instr::Atom { pred: Rc::clone(pred), succ: cont }),
            Node::Alt(a, b) => {
                let a = self.emit(a, cont);
                let b = self.emit(b, cont);
                self.push(Instr::Split { succ: a, split: b })
            }
            Node::Seq(xs) => {
                let mut code = cont;
                for x in xs.iter().rev() {
                    code = self.emit(x, code);
                }
                code
            }
            Node::Star { body, greedy } => self.emit_loop(body, cont, *greedy).0,
            // Same loop as star, but entering through the body forces one
            // iteration before the first exit choice.
            Node::Plus { body, greedy } => self.emit_loop(body, cont, *greedy).1,
            Node::Opt { body, greedy } => self.emit_opt(body, cont, *greedy),
            Node::Group { body, key } => {
                let end = self.push(Instr::Save {
                    slot: Slot::End(GroupKey::User(key.clone())),
                    succ: cont,
                });
                let entry = self.emit(body, end);
                self.push(Instr::Save {
                    slot: Slot::Start(GroupKey::User(key.clone())),
                    succ: entry,
                })
            }
            Node::Repeat { body, min, max, greedy } => {
                let mut code = cont;
                match max {
                    // Optional copies sit innermost, each inheriting the
                    // repetition's greediness.
                    Some(mx) => {
                        for _ in *min..*mx {
                            code = self.emit_opt(body, code, *greedy);
                        }
                    }
                    None => {
                        code = self.emit_loop(body, code, *greedy).0;
                    }
                }
                // Mandatory copies wrap the optional part.
                for _ in 0..*min {
                    code = self.emit(body, code);
                }
                code
            }
        }
    }

    /// The shared star/plus loop: a split allocated before its body so
    /// the body can point back at it. Returns `(split, body entry)`.
    fn emit_loop(&mut self, body: &Node<S, K, V>, cont: InstrId, greedy: bool) -> (InstrId, InstrId) {
        let split = self.push(Instr::Split { succ: ACCEPT, split: ACCEPT });
        let entry = self.emit(body, split);
        if greedy {
            self.patch_split(split, entry, cont);
        } else {
            self.patch_split(split, cont, entry);
        }
        (split, entry)
    }

    fn emit_opt(&mut self, body: &Node<S, K, V>, cont: InstrId, greedy: bool) -> InstrId {
        let entry = self.emit(body, cont);
        if greedy {
            self.push(Instr::Split { succ: entry, split: cont })
        } else {
            self.push(Instr::Split { succ: cont, split: entry })
        }
    }
}

impl<S, K: fmt::Debug, V> fmt::Debug for Instr<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Atom { succ, .. } => write!(f, "Atom(-> {})", succ),
            Instr::Split { succ, split } => write!(f, "Split({}, {})", succ, split),
            Instr::Save { slot, succ } => write!(f, "Save({:?} -> {})", slot, succ),
            Instr::Accept => f.write_str("Accept"),
        }
    }
}

impl<S, K: fmt::Debug, V> fmt::Debug for Program<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start: {}", self.start)?;
        for (i, instr) in self.instrs.iter().enumerate() {
            writeln!(f, "{:4}: {:?}", i, instr)?;
        }
        Ok(())
    }
}
