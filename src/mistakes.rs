/// Per-position record of which characters have already been counted as a
/// mistake. A position is marked at most once per half.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MistakeLedger {
    marked: Vec<bool>,
    count: usize,
}

impl MistakeLedger {
    pub fn new(length: usize) -> Self {
        Self {
            marked: vec![false; length],
            count: 0,
        }
    }

    /// Sized for the number of characters (not bytes) in `reference`
    pub fn for_reference(reference: &str) -> Self {
        Self::new(reference.chars().count())
    }

    /// Compare `input` with `reference` position by position and mark every
    /// newly diverging position. Returns how many positions were newly marked.
    pub fn record_attempt(&mut self, reference: &str, input: &str) -> usize {
        let mut new_mistakes = 0;

        for (idx, (expected, typed)) in reference.chars().zip(input.chars()).enumerate() {
            let Some(seen) = self.marked.get_mut(idx) else {
                break;
            };
            if typed != expected && !*seen {
                *seen = true;
                new_mistakes += 1;
            }
        }

        self.count += new_mistakes;
        new_mistakes
    }

    pub fn is_marked(&self, idx: usize) -> bool {
        self.marked.get(idx).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ledger_is_unmarked() {
        let ledger = MistakeLedger::new(4);
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.count(), 0);
        assert!((0..4).all(|i| !ledger.is_marked(i)));
    }

    #[test]
    fn test_sequential_inputs_count_position_once() {
        let mut ledger = MistakeLedger::for_reference("abc");

        assert_eq!(ledger.record_attempt("abc", "a"), 0);
        assert_eq!(ledger.record_attempt("abc", "ab"), 0);
        assert_eq!(ledger.record_attempt("abc", "axc"), 1);
        assert_eq!(ledger.count(), 1);
        assert!(ledger.is_marked(1));

        // flip position 1 back and forth
        assert_eq!(ledger.record_attempt("abc", "abc"), 0);
        assert_eq!(ledger.record_attempt("abc", "ayc"), 0);
        assert_eq!(ledger.record_attempt("abc", "azc"), 0);
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn test_repeated_attempt_is_idempotent() {
        let mut ledger = MistakeLedger::for_reference("hello");
        let first = ledger.record_attempt("hello", "hxllq");
        assert_eq!(first, 2);
        for _ in 0..5 {
            assert_eq!(ledger.record_attempt("hello", "hxllq"), 0);
        }
        assert_eq!(ledger.count(), 2);
    }

    #[test]
    fn test_input_longer_than_reference_is_ignored_past_end() {
        let mut ledger = MistakeLedger::for_reference("ab");
        assert_eq!(ledger.record_attempt("ab", "xyzzy"), 2);
        assert_eq!(ledger.count(), 2);
        assert!(!ledger.is_marked(2));
    }

    #[test]
    fn test_count_never_exceeds_reference_length() {
        let reference = "typing";
        let mut ledger = MistakeLedger::for_reference(reference);
        for input in ["zzzzzz", "yyyyyy", "qqqqqqqqqq", "tzpzng"] {
            ledger.record_attempt(reference, input);
            assert!(ledger.count() <= reference.chars().count());
        }
        assert_eq!(ledger.count(), 6);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let reference = "héllo";
        let mut ledger = MistakeLedger::for_reference(reference);
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.record_attempt(reference, "hello"), 1);
        assert!(ledger.is_marked(1));
    }

    #[test]
    fn test_empty_reference() {
        let mut ledger = MistakeLedger::for_reference("");
        assert!(ledger.is_empty());
        assert_eq!(ledger.record_attempt("", "abc"), 0);
    }
}
