use std::fmt;
use std::mem;

/// Longest run of characters a single leaf may hold.
const MAX_LEAF_LEN: usize = 8;

enum Node {
    Leaf(String),
    Internal {
        left: Box<Node>,
        right: Box<Node>,
        weight: usize,
    },
}

impl Default for Node {
    fn default() -> Self {
        Node::Leaf(String::new())
    }
}

/// Byte offset of the `i`-th character of `s`, or `s.len()` past the end.
fn byte_offset(s: &str, i: usize) -> usize {
    s.char_indices().nth(i).map_or(s.len(), |(at, _)| at)
}

impl Node {
    fn build(text: &str) -> Box<Self> {
        let count = text.chars().count();
        if count <= MAX_LEAF_LEN {
            return Box::new(Node::Leaf(text.to_string()));
        }

        let mid = (count - 1) / 2;
        let at = byte_offset(text, mid);
        Box::new(Node::Internal {
            left: Node::build(&text[..at]),
            right: Node::build(&text[at..]),
            weight: mid,
        })
    }

    fn len(&self) -> usize {
        match self {
            Node::Leaf(s) => s.chars().count(),
            Node::Internal { weight, right, .. } => weight + right.len(),
        }
    }

    // Character count recomputed from the leaves, ignoring cached weights.
    fn total_weight(&self) -> usize {
        match self {
            Node::Leaf(s) => s.chars().count(),
            Node::Internal { left, right, .. } => left.total_weight() + right.total_weight(),
        }
    }

    fn concat(left: Box<Self>, right: Box<Self>) -> Box<Self> {
        if left.len() == 0 {
            return right;
        }
        if right.len() == 0 {
            return left;
        }

        Box::new(Node::Internal {
            weight: left.total_weight(),
            left,
            right,
        })
    }

    fn index(&self, i: usize) -> Option<char> {
        match self {
            Node::Internal { left, right, weight } => {
                if i > *weight {
                    right.index(i - weight)
                } else {
                    left.index(i)
                }
            }
            Node::Leaf(s) => i.checked_sub(1).and_then(|i| s.chars().nth(i)),
        }
    }

    // Detaches everything past character `i` into `orphans`, kept in text
    // order. Weights along the descent path are refreshed on the way out.
    fn split(&mut self, i: usize, orphans: &mut Vec<Box<Node>>) {
        match self {
            Node::Leaf(s) => {
                if i == 0 {
                    if !s.is_empty() {
                        orphans.push(Box::new(Node::Leaf(mem::take(s))));
                    }
                } else if i < s.chars().count() {
                    let at = byte_offset(s, i);
                    orphans.push(Box::new(Node::Leaf(s.split_off(at))));
                }
            }
            Node::Internal { left, right, weight } => {
                if i > *weight {
                    right.split(i - *weight, orphans);
                } else {
                    left.split(i, orphans);
                    let detached = mem::take(right);
                    if detached.len() != 0 {
                        orphans.push(detached);
                    }
                    *weight = left.total_weight();
                }
            }
        }
    }

    // Collapses nodes left with exactly one non-empty child after a split.
    fn rebalance(&mut self) {
        if let Node::Internal { left, right, .. } = self {
            left.rebalance();
            right.rebalance();

            if left.len() == 0 {
                let kept = mem::take(right);
                *self = *kept;
            } else if right.len() == 0 {
                let kept = mem::take(left);
                *self = *kept;
            }
        }
    }

    fn search_char(&self, c: char, from: usize) -> Option<usize> {
        match self {
            Node::Leaf(s) => s
                .chars()
                .enumerate()
                .skip(from - 1)
                .find(|&(_, it)| it == c)
                .map(|(i, _)| i + 1),
            Node::Internal { left, right, weight } => {
                if from > *weight {
                    right.search_char(c, from - weight).map(|i| i + weight)
                } else {
                    // A miss in the left subtree falls through to the right one.
                    left.search_char(c, from)
                        .or_else(|| right.search_char(c, 1).map(|i| i + weight))
                }
            }
        }
    }

    fn search_char_rev(&self, c: char, from: usize) -> Option<usize> {
        match self {
            Node::Leaf(s) => s
                .chars()
                .enumerate()
                .take(from)
                .filter(|&(_, it)| it == c)
                .last()
                .map(|(i, _)| i + 1),
            Node::Internal { left, right, weight } => {
                if from > *weight {
                    right
                        .search_char_rev(c, from - weight)
                        .map(|i| i + weight)
                        .or_else(|| left.search_char_rev(c, *weight))
                } else {
                    left.search_char_rev(c, from)
                }
            }
        }
    }

    // Appends characters at positions [start, end) to `out`, clipped at leaves.
    fn report(&self, start: usize, end: usize, out: &mut String) {
        match self {
            Node::Leaf(s) => out.extend(s.chars().skip(start - 1).take(end - start)),
            Node::Internal { left, right, weight } => {
                if start <= *weight {
                    left.report(start, end.min(weight + 1), out);
                }
                if end > *weight + 1 {
                    right.report(start.saturating_sub(*weight).max(1), end - weight, out);
                }
            }
        }
    }

    fn collect(&self, out: &mut String) {
        match self {
            Node::Leaf(s) => out.push_str(s),
            Node::Internal { left, right, .. } => {
                left.collect(out);
                right.collect(out);
            }
        }
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Node::Leaf(s) => writeln!(f, "{:1$}leaf {s:?}", "", depth * 2),
            Node::Internal { left, right, weight } => {
                writeln!(f, "{:1$}node weight={weight}", "", depth * 2)?;
                left.dump(f, depth + 1)?;
                right.dump(f, depth + 1)
            }
        }
    }
}

/// A text buffer stored as a binary tree of chunks.
///
/// Character positions are 1-indexed for queries (`index`, `search_char`,
/// `report`); `split`, `insert` and `delete` take boundaries in `0..=len`.
/// Out-of-range access yields `None` or an empty string, never a panic.
pub struct Rope {
    root: Box<Node>,
}

impl Default for Rope {
    fn default() -> Self {
        Self { root: Box::default() }
    }
}

impl Rope {
    pub fn new(text: &str) -> Self {
        Self { root: Node::build(text) }
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Character at position `i`, or `None` out of range.
    pub fn index(&self, i: usize) -> Option<char> {
        self.root.index(i)
    }

    /// Keeps characters `1..=i` in `self` and returns the rest.
    pub fn split(&mut self, i: usize) -> Rope {
        let mut orphans = Vec::new();
        self.root.split(i, &mut orphans);

        let root = orphans.into_iter().fold(Box::default(), Node::concat);

        self.rebalance();
        let mut tail = Rope { root };
        tail.rebalance();
        tail
    }

    /// Joins two buffers; an empty side is the identity.
    pub fn concat(self, other: Rope) -> Rope {
        Rope {
            root: Node::concat(self.root, other.root),
        }
    }

    /// Inserts `text` at boundary `i`: 0 prepends, `len` appends.
    pub fn insert(&mut self, i: usize, text: &str) {
        if text.is_empty() {
            return;
        }

        let tail = self.split(i);
        let head = mem::take(&mut self.root);
        self.root = Node::concat(Node::concat(head, Node::build(text)), tail.root);
    }

    /// Removes `length` characters after boundary `start`, clipping at the
    /// end of the buffer. Zero-length deletes are a no-op.
    pub fn delete(&mut self, start: usize, length: usize) {
        if length == 0 {
            return;
        }

        let mut tail = self.split(start);
        let rest = tail.split(length);
        let head = mem::take(&mut self.root);
        self.root = Node::concat(head, rest.root);
    }

    /// Smallest position `>= from` holding `c`.
    pub fn search_char(&self, c: char, from: usize) -> Option<usize> {
        if from == 0 {
            return None;
        }
        self.root.search_char(c, from)
    }

    /// Largest position `<= from` holding `c`.
    pub fn search_char_rev(&self, c: char, from: usize) -> Option<usize> {
        if from == 0 {
            return None;
        }
        self.root.search_char_rev(c, from)
    }

    /// Substring covering positions `[start, start + length)`, clipped to the
    /// buffer on both ends.
    pub fn report(&self, start: usize, length: usize) -> String {
        let end = start + length;
        let start = start.max(1);
        if start >= end {
            return String::new();
        }

        let mut out = String::new();
        self.root.report(start, end, &mut out);
        out
    }

    pub fn get_content(&self) -> String {
        let mut out = String::new();
        self.root.collect(&mut out);
        out
    }

    fn rebalance(&mut self) {
        self.root.rebalance();
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_content())
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.dump(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights_valid(node: &Node) -> bool {
        match node {
            Node::Leaf(_) => true,
            Node::Internal { left, right, weight } => {
                *weight == left.total_weight() && weights_valid(left) && weights_valid(right)
            }
        }
    }

    // Rebalance promises no internal node keeps an empty child around.
    fn fully_collapsed(node: &Node) -> bool {
        match node {
            Node::Leaf(_) => true,
            Node::Internal { left, right, .. } => {
                left.len() > 0 && right.len() > 0 && fully_collapsed(left) && fully_collapsed(right)
            }
        }
    }

    #[test]
    fn new_round_trips() {
        let cases = [
            "",
            "Test",
            "Longer input",
            "Even longer input. Is this going to be a problem?",
            "newlines\nare\nplain\ncontent\n",
            "ünïcode — ropes cöunt chäracters, not bytes",
        ];
        for case in cases {
            let rope = Rope::new(case);
            assert_eq!(rope.get_content(), case);
            assert_eq!(rope.len(), case.chars().count());
            assert!(weights_valid(&rope.root));
        }
    }

    #[test]
    fn index_matches_linear_scan() {
        let text = "Test1! & some other text";
        let rope = Rope::new(text);

        for (i, c) in text.chars().enumerate() {
            assert_eq!(rope.index(i + 1), Some(c));
        }
        assert_eq!(rope.index(0), None);
        assert_eq!(rope.index(text.chars().count() + 1), None);
    }

    #[test]
    fn concat_joins_in_order() {
        let rope = Rope::new("left half, ").concat(Rope::new("right half"));
        assert_eq!(rope.get_content(), "left half, right half");
        assert!(weights_valid(&rope.root));

        assert_eq!(Rope::new("").concat(Rope::new("x")).get_content(), "x");
        assert_eq!(Rope::new("x").concat(Rope::new("")).get_content(), "x");
    }

    #[test]
    fn split_partitions_at_every_boundary() {
        let text = "hello_I_am_a_rope_data_structure";
        let total = text.chars().count();

        for i in 0..=total {
            let mut head = Rope::new(text);
            let tail = head.split(i);

            assert_eq!(head.len() + tail.len(), total);
            assert_eq!(head.get_content() + &tail.get_content(), text);
            assert_eq!(head.len(), i);
            assert!(weights_valid(&head.root), "stale weight in head, i={i}");
            assert!(weights_valid(&tail.root), "stale weight in tail, i={i}");
        }
    }

    #[test]
    fn split_at_zero_moves_everything() {
        let mut head = Rope::new("all of it");
        let tail = head.split(0);

        assert!(head.is_empty());
        assert_eq!(tail.get_content(), "all of it");
    }

    #[test]
    fn split_past_end_returns_empty_tail() {
        let mut head = Rope::new("short");
        let tail = head.split(99);

        assert_eq!(head.get_content(), "short");
        assert!(tail.is_empty());
    }

    #[test]
    fn split_leaves_no_dangling_chains() {
        let mut head = Rope::new("hello_I_am_a_rope_data_structure");
        let tail = head.split(9);

        assert!(fully_collapsed(&head.root));
        assert!(fully_collapsed(&tail.root));
    }

    #[test]
    fn insert_in_the_middle() {
        let mut rope = Rope::new("hello_I_am_a_rope_data_structure");
        rope.insert(13, "cool_");
        assert_eq!(rope.get_content(), "hello_I_am_a_cool_rope_data_structure");
        assert!(weights_valid(&rope.root));
    }

    #[test]
    fn insert_at_the_edges() {
        let mut rope = Rope::new("middle");
        rope.insert(0, "start_");
        assert_eq!(rope.get_content(), "start_middle");

        let at = rope.len();
        rope.insert(at, "_end");
        assert_eq!(rope.get_content(), "start_middle_end");
        assert!(weights_valid(&rope.root));
    }

    #[test]
    fn delete_a_span() {
        let mut rope = Rope::new("hello_I_am_a_rope_data_structure");
        rope.delete(14, 1);
        assert_eq!(rope.get_content(), "hello_I_am_a_rpe_data_structure");
        assert!(weights_valid(&rope.root));
    }

    #[test]
    fn delete_clips_at_the_end() {
        let mut rope = Rope::new("clipped");
        rope.delete(4, 100);
        assert_eq!(rope.get_content(), "clip");

        rope.delete(50, 3);
        assert_eq!(rope.get_content(), "clip");
    }

    #[test]
    fn delete_zero_length_is_a_noop() {
        let mut rope = Rope::new("untouched");
        rope.delete(3, 0);
        assert_eq!(rope.get_content(), "untouched");
    }

    #[test]
    fn search_char_forward() {
        let text = "Ahello_I_am_Aa_rope_AdaAAta_structurezA";
        let rope = Rope::new(text);

        assert_eq!(rope.search_char('A', 1), Some(1));
        assert_eq!(rope.search_char('a', 2), Some(10));
        assert_eq!(rope.search_char('A', 14), Some(21));
        assert_eq!(rope.search_char('A', text.chars().count() + 1), None);
        assert_eq!(rope.search_char('!', 1), None);
        assert_eq!(rope.search_char('A', 0), None);
    }

    #[test]
    fn search_char_reverse() {
        let text = "Ahello_I_am_Aa_rope_AdaAAta_structurezA";
        let rope = Rope::new(text);
        let total = text.chars().count();

        assert_eq!(rope.search_char_rev('A', total), Some(total));
        assert_eq!(rope.search_char_rev('A', total - 1), Some(25));
        assert_eq!(rope.search_char_rev('A', 12), Some(1));
        assert_eq!(rope.search_char_rev('h', 1), None);
        assert_eq!(rope.search_char_rev('!', total), None);
        assert_eq!(rope.search_char_rev('A', 0), None);
    }

    #[test]
    fn search_honors_leaf_seams() {
        // Two single-leaf ropes joined, so position 2 sits exactly on a seam.
        let rope = Rope::new("ab").concat(Rope::new("ba"));
        assert_eq!(rope.get_content(), "abba");

        assert_eq!(rope.search_char('a', 2), Some(4));
        assert_eq!(rope.search_char('b', 2), Some(2));
        assert_eq!(rope.search_char('b', 3), Some(3));
        assert_eq!(rope.search_char_rev('b', 2), Some(2));
        assert_eq!(rope.search_char_rev('a', 3), Some(1));
        assert_eq!(rope.search_char_rev('a', 4), Some(4));
    }

    #[test]
    fn report_extracts_a_range() {
        let rope = Rope::new("hello_I_am_a_rope_data_structure");

        assert_eq!(rope.report(13, 5), "_rope");
        assert_eq!(rope.report(1, 5), "hello");
        assert_eq!(rope.report(30, 100), "ure");
        assert_eq!(rope.report(5, 0), "");
        assert_eq!(rope.report(0, 6), "hello");
        assert_eq!(rope.report(200, 5), "");
    }

    #[test]
    fn newline_is_ordinary_content() {
        let rope = Rope::new("one\ntwo\nthree");

        assert_eq!(rope.search_char('\n', 1), Some(4));
        assert_eq!(rope.search_char('\n', 5), Some(8));
        assert_eq!(rope.search_char_rev('\n', 7), Some(4));
        assert_eq!(rope.report(5, 3), "two");
    }

    #[test]
    fn weights_stay_valid_across_edit_chains() {
        let mut rope = Rope::new("the quick brown fox jumps over the lazy dog");

        rope.insert(4, "very ");
        rope.delete(0, 4);
        rope.insert(0, "a ");
        let at = rope.len();
        rope.insert(at, " again");
        rope.delete(10, 6);
        let tail = rope.split(8);

        assert!(weights_valid(&rope.root));
        assert!(weights_valid(&tail.root));
        assert!(fully_collapsed(&rope.root));
        assert!(fully_collapsed(&tail.root));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip(s in ".{0,200}") {
                prop_assert_eq!(Rope::new(&s).get_content(), s);
            }

            #[test]
            fn split_partitions(s in ".{0,120}", at in 0usize..200) {
                let total = s.chars().count();
                let at = at.min(total);

                let mut head = Rope::new(&s);
                let tail = head.split(at);

                prop_assert_eq!(head.len(), at);
                prop_assert_eq!(head.len() + tail.len(), total);
                prop_assert_eq!(head.get_content() + &tail.get_content(), s);
                prop_assert!(weights_valid(&head.root));
                prop_assert!(weights_valid(&tail.root));
            }

            #[test]
            fn delete_undoes_insert(s in ".{0,120}", ins in ".{1,20}", at in 0usize..200) {
                let at = at.min(s.chars().count());

                let mut rope = Rope::new(&s);
                rope.insert(at, &ins);
                rope.delete(at, ins.chars().count());

                prop_assert_eq!(rope.get_content(), s);
                prop_assert!(weights_valid(&rope.root));
            }

            #[test]
            fn search_agrees_with_linear_scan(s in "[abc\\n]{0,80}", from in 1usize..100) {
                let rope = Rope::new(&s);

                let forward = s
                    .chars()
                    .enumerate()
                    .skip(from - 1)
                    .find(|&(_, c)| c == 'a')
                    .map(|(i, _)| i + 1);
                prop_assert_eq!(rope.search_char('a', from), forward);

                let backward = s
                    .chars()
                    .enumerate()
                    .take(from)
                    .filter(|&(_, c)| c == 'a')
                    .last()
                    .map(|(i, _)| i + 1);
                prop_assert_eq!(rope.search_char_rev('a', from), backward);
            }

            #[test]
            fn report_agrees_with_slicing(s in ".{0,120}", start in 0usize..140, len in 0usize..140) {
                let rope = Rope::new(&s);
                let expected: String = s
                    .chars()
                    .skip(start.max(1) - 1)
                    .take((start + len).saturating_sub(start.max(1)))
                    .collect();
                prop_assert_eq!(rope.report(start, len), expected);
            }
        }
    }
}
