// Alignment-based similarity between two extracted texts.
//
// ratio = 2 * M / T where M is the number of characters covered by recursively
// found longest common runs and T the combined length. Inputs are put in a
// canonical order first so the score does not depend on argument order.
//
// Each window's longest run comes from a suffix automaton over the `b` side,
// so one window costs O(len_a + len_b) whatever the vocabulary.

/// Similarity in `[0.0, 1.0]`. Two empty strings are identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_len(&a, &b) as f64 / total as f64
}

/// Total length of the matching blocks between `a` and `b`.
fn matched_len(a: &[char], b: &[char]) -> usize {
    let mut automaton = SuffixAutomaton::default();
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        automaton.rebuild(&b[blo..bhi]);
        let (i, j, k) = automaton.longest_match(&a[alo..ahi]);
        if k == 0 {
            continue;
        }
        let (i, j) = (alo + i, blo + j);
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

#[derive(Debug, Clone)]
struct State {
    len: usize,
    link: Option<usize>,
    /// End index in `b` of the first occurrence of this state's strings.
    first_end: usize,
    next: Vec<(char, usize)>,
}

impl State {
    fn root() -> Self {
        Self {
            len: 0,
            link: None,
            first_end: 0,
            next: Vec::new(),
        }
    }

    fn step(&self, c: char) -> Option<usize> {
        self.next.iter().find(|(label, _)| *label == c).map(|&(_, to)| to)
    }

    fn set(&mut self, c: char, to: usize) {
        match self.next.iter_mut().find(|(label, _)| *label == c) {
            Some(edge) => edge.1 = to,
            None => self.next.push((c, to)),
        }
    }
}

/// Suffix automaton of one `b` window. Buffers are reused across windows.
#[derive(Debug, Default)]
struct SuffixAutomaton {
    states: Vec<State>,
    last: usize,
}

impl SuffixAutomaton {
    fn rebuild(&mut self, b: &[char]) {
        self.states.clear();
        self.states.push(State::root());
        self.last = 0;
        for (pos, &c) in b.iter().enumerate() {
            self.extend(c, pos);
        }
    }

    fn extend(&mut self, c: char, pos: usize) {
        let cur = self.states.len();
        self.states.push(State {
            len: self.states[self.last].len + 1,
            link: None,
            first_end: pos,
            next: Vec::new(),
        });

        let mut p = Some(self.last);
        let mut hit = None;
        while let Some(pi) = p {
            if let Some(q) = self.states[pi].step(c) {
                hit = Some((pi, q));
                break;
            }
            self.states[pi].set(c, cur);
            p = self.states[pi].link;
        }

        let link = match hit {
            None => 0,
            Some((pi, q)) if self.states[pi].len + 1 == self.states[q].len => q,
            Some((pi, q)) => {
                let clone = self.states.len();
                let mut copy = self.states[q].clone();
                copy.len = self.states[pi].len + 1;
                self.states.push(copy);

                let mut p = Some(pi);
                while let Some(pp) = p {
                    if self.states[pp].step(c) != Some(q) {
                        break;
                    }
                    self.states[pp].set(c, clone);
                    p = self.states[pp].link;
                }
                self.states[q].link = Some(clone);
                clone
            }
        };
        self.states[cur].link = Some(link);
        self.last = cur;
    }

    /// Longest run shared by `a` and the automaton's window, as `(i, j, k)` offsets.
    /// Ties go to the earliest start in `a`, then in `b`.
    fn longest_match(&self, a: &[char]) -> (usize, usize, usize) {
        let (mut state, mut len) = (0, 0);
        let mut best = (0, 0, 0);
        for (i, &c) in a.iter().enumerate() {
            loop {
                if let Some(to) = self.states[state].step(c) {
                    state = to;
                    len += 1;
                    break;
                }
                match self.states[state].link {
                    Some(up) => {
                        state = up;
                        len = self.states[up].len;
                    }
                    None => {
                        len = 0;
                        break;
                    }
                }
            }
            if len > best.2 {
                let end = self.states[state].first_end;
                best = (i + 1 - len, end + 1 - len, len);
            }
        }
        best
    }
}
