//! Selector index: the sorted, deduplicated table of keys to select.
//!
//! Each selection-list line contributes one selector. Its output position is
//! its rank among retained lines in list order; that rank, not the sorted
//! table slot, decides the emission order.

use std::collections::HashMap;
use std::io::BufRead;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::{DelimiterSet, DuplicatePolicy, SelectConfig};
use crate::error::{SelectError, Warning, show};
use crate::line::LineReader;

/// One key to look for in the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub key: Box<[u8]>,
    /// Group tag for fragment mode. Shared between selectors of one group.
    pub group: Option<Rc<[u8]>>,
    /// Place in the output order, dense over `0..len`.
    pub position: usize,
    pub matched: bool,
}

/// Split a selection-list line into key and optional group.
///
/// The key is the leading run of non-delimiters. The group is the next
/// such run after the delimiters that follow the key. Lines with an empty
/// key yield `None`.
pub fn parse_entry<'a>(line: &'a [u8], delims: &DelimiterSet) -> Option<(&'a [u8], Option<&'a [u8]>)> {
    let key_len = delims.span_until(line);
    if key_len == 0 {
        return None;
    }
    let (key, rest) = line.split_at(key_len);
    let rest = &rest[delims.span_while(rest)..];
    let group_len = delims.span_until(rest);
    let group = (group_len > 0).then(|| &rest[..group_len]);
    Some((key, group))
}

/// Accumulates selectors in list order.
struct Builder<'c> {
    config: &'c SelectConfig,
    entries: Vec<Selector>,
    groups: HashMap<Vec<u8>, Rc<[u8]>>,
}

impl<'c> Builder<'c> {
    fn new(config: &'c SelectConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            groups: HashMap::new(),
        }
    }

    fn push_line(&mut self, line: &[u8]) {
        let Some((key, group)) = parse_entry(line, &self.config.selector_delimiters) else {
            return;
        };
        let group = group.map(|g| {
            self.groups
                .entry(g.to_vec())
                .or_insert_with(|| Rc::from(g))
                .clone()
        });
        let position = self.entries.len();
        self.entries.push(Selector {
            key: key.into(),
            group,
            position,
            matched: false,
        });
    }

    fn finish(self) -> Result<SelectorIndex, SelectError> {
        let index = SelectorIndex::from_selectors(self.entries, self.config.duplicates)?;
        if index.is_empty() {
            return Err(SelectError::EmptySelection);
        }
        if self.config.fragment.is_active()
            && let Some(sel) = index.entries.iter().find(|s| s.group.is_none())
        {
            return Err(SelectError::MissingGroup {
                key: sel.key.to_vec(),
            });
        }
        debug!(
            selectors = index.len(),
            groups = self.groups.len(),
            "selector index built"
        );
        Ok(index)
    }
}

/// Sorted table of unique selectors with binary-search lookup.
#[derive(Debug, Clone)]
pub struct SelectorIndex {
    /// Sorted by key, keys unique.
    entries: Vec<Selector>,
    /// Output position -> slot in `entries`.
    by_position: Vec<usize>,
    warnings: Vec<Warning>,
}

impl SelectorIndex {
    /// Build from raw selection-list lines.
    pub fn build<I>(lines: I, config: &SelectConfig) -> Result<Self, SelectError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut builder = Builder::new(config);
        for line in lines {
            builder.push_line(line.as_ref());
        }
        builder.finish()
    }

    /// Build by streaming lines from a selection-list reader.
    pub fn read<R: BufRead>(
        reader: &mut LineReader<R>,
        config: &SelectConfig,
    ) -> Result<Self, SelectError> {
        let mut builder = Builder::new(config);
        let mut line = Vec::new();
        while reader.read_line(&mut line)? {
            builder.push_line(&line);
        }
        builder.finish()
    }

    /// Sort, deduplicate and renumber a set of selectors.
    ///
    /// Of several selectors sharing a key the one with the smallest position
    /// survives. Survivors are renumbered `0..len` keeping their relative
    /// order.
    pub fn from_selectors(
        mut selectors: Vec<Selector>,
        policy: DuplicatePolicy,
    ) -> Result<Self, SelectError> {
        selectors.sort_unstable_by(|a, b| a.key.cmp(&b.key).then(a.position.cmp(&b.position)));

        let mut warnings = Vec::new();
        let mut entries: Vec<Selector> = Vec::with_capacity(selectors.len());
        for sel in selectors {
            if let Some(last) = entries.last()
                && last.key == sel.key
            {
                match policy {
                    DuplicatePolicy::Fatal => {
                        return Err(SelectError::DuplicateSelector {
                            key: sel.key.to_vec(),
                        });
                    }
                    DuplicatePolicy::Warn => {
                        let warning = Warning::DuplicateSelector {
                            key: sel.key.to_vec(),
                        };
                        warn!("{warning}");
                        warnings.push(warning);
                        continue;
                    }
                }
            }
            entries.push(sel);
        }

        let mut by_position: Vec<usize> = (0..entries.len()).collect();
        by_position.sort_unstable_by_key(|&i| entries[i].position);
        for (position, &slot) in by_position.iter().enumerate() {
            entries[slot].position = position;
        }

        Ok(Self {
            entries,
            by_position,
            warnings,
        })
    }

    /// Table slot holding `key`, if any.
    pub fn lookup(&self, key: &[u8]) -> Option<usize> {
        self.entries
            .binary_search_by(|s| s.key.as_ref().cmp(key))
            .ok()
    }

    pub fn get(&self, slot: usize) -> &Selector {
        &self.entries[slot]
    }

    /// Selector at an output position.
    pub fn at_position(&self, position: usize) -> &Selector {
        &self.entries[self.by_position[position]]
    }

    /// Flag a slot as matched. Returns `false` if it already was.
    pub fn mark_matched(&mut self, slot: usize) -> bool {
        let sel = &mut self.entries[slot];
        !std::mem::replace(&mut sel.matched, true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selectors in key order.
    pub fn selectors(&self) -> &[Selector] {
        &self.entries
    }

    /// Selectors not yet matched, in output order.
    pub fn unmatched(&self) -> impl Iterator<Item = &Selector> {
        self.by_position
            .iter()
            .map(|&slot| &self.entries[slot])
            .filter(|s| !s.matched)
    }

    pub fn matched_count(&self) -> usize {
        self.entries.iter().filter(|s| s.matched).count()
    }

    /// Warnings raised while deduplicating.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group {
            Some(g) => write!(f, "{}@{} [{}]", show(&self.key), self.position, show(g)),
            None => write!(f, "{}@{}", show(&self.key), self.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FragmentMode;

    fn keys_by_position(index: &SelectorIndex) -> Vec<&[u8]> {
        (0..index.len())
            .map(|p| index.at_position(p).key.as_ref())
            .collect()
    }

    #[test]
    fn test_parse_entry_key_only() {
        let d = DelimiterSet::new(b"| :\t");
        assert_eq!(parse_entry(b"ABC", &d), Some((&b"ABC"[..], None)));
        assert_eq!(parse_entry(b"ABC def", &d), Some((&b"ABC"[..], Some(&b"def"[..]))));
    }

    #[test]
    fn test_parse_entry_skips_delimiter_run() {
        let d = DelimiterSet::new(b"| :\t");
        assert_eq!(
            parse_entry(b"k1 |: g1 extra", &d),
            Some((&b"k1"[..], Some(&b"g1"[..])))
        );
        assert_eq!(parse_entry(b"k1 | ", &d), Some((&b"k1"[..], None)));
    }

    #[test]
    fn test_parse_entry_empty_key() {
        let d = DelimiterSet::new(b" ");
        assert_eq!(parse_entry(b"", &d), None);
        assert_eq!(parse_entry(b" leading", &d), None);
    }

    #[test]
    fn test_build_positions_follow_list_order() {
        let config = SelectConfig::default();
        let index = SelectorIndex::build(["B", "A", "C"], &config).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(keys_by_position(&index), vec![&b"B"[..], b"A", b"C"]);
        // Table itself is key-sorted.
        let sorted: Vec<&[u8]> = index.selectors().iter().map(|s| s.key.as_ref()).collect();
        assert_eq!(sorted, vec![&b"A"[..], b"B", b"C"]);
    }

    #[test]
    fn test_build_skips_empty_lines() {
        let config = SelectConfig::default();
        let index = SelectorIndex::build(["", "A", " ", "B"], &config).unwrap();
        assert_eq!(keys_by_position(&index), vec![&b"A"[..], b"B"]);
    }

    #[test]
    fn test_lookup() {
        let config = SelectConfig::default();
        let index = SelectorIndex::build(["x3", "x1", "x2"], &config).unwrap();
        let slot = index.lookup(b"x1").unwrap();
        assert_eq!(index.get(slot).position, 1);
        assert!(index.lookup(b"x4").is_none());
        assert!(index.lookup(b"").is_none());
    }

    #[test]
    fn test_duplicates_fatal() {
        let config = SelectConfig::default();
        let err = SelectorIndex::build(["A", "B", "A"], &config).unwrap_err();
        match err {
            SelectError::DuplicateSelector { key } => assert_eq!(key, b"A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicates_warn_keeps_first_and_compacts() {
        let config = SelectConfig::default().with_continue_on_duplicates(true);
        let index =
            SelectorIndex::build(["C", "A", "C", "B", "A", "C", "D"], &config).unwrap();
        assert_eq!(
            keys_by_position(&index),
            vec![&b"C"[..], b"A", b"B", b"D"]
        );
        assert_eq!(index.warnings().len(), 3);
    }

    #[test]
    fn test_duplicates_keep_first_group() {
        let config = SelectConfig::default().with_continue_on_duplicates(true);
        let index = SelectorIndex::build(["A g2", "B g1", "A g1"], &config).unwrap();
        let a = index.get(index.lookup(b"A").unwrap());
        assert_eq!(a.position, 0);
        assert_eq!(a.group.as_deref(), Some(&b"g2"[..]));
    }

    #[test]
    fn test_dedup_idempotent() {
        let config = SelectConfig::default().with_continue_on_duplicates(true);
        let once = SelectorIndex::build(["q", "p", "q", "r", "p"], &config).unwrap();
        let twice =
            SelectorIndex::from_selectors(once.selectors().to_vec(), DuplicatePolicy::Fatal)
                .unwrap();
        assert_eq!(once.selectors(), twice.selectors());
        assert!(twice.warnings().is_empty());
    }

    #[test]
    fn test_empty_selection_is_fatal() {
        let config = SelectConfig::default();
        let err = SelectorIndex::build(["", " "], &config).unwrap_err();
        assert!(matches!(err, SelectError::EmptySelection));
    }

    #[test]
    fn test_groups_shared() {
        let config = SelectConfig::default().with_fragment(FragmentMode::Append);
        let index = SelectorIndex::build(["A g1", "B g2", "C g1"], &config).unwrap();
        let a = index.at_position(0).group.clone().unwrap();
        let c = index.at_position(2).group.clone().unwrap();
        assert!(Rc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_fragment_requires_groups() {
        let config = SelectConfig::default().with_fragment(FragmentMode::CreateExclusive);
        let err = SelectorIndex::build(["A g1", "B"], &config).unwrap_err();
        match err {
            SelectError::MissingGroup { key } => assert_eq!(key, b"B"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mark_matched_once() {
        let config = SelectConfig::default();
        let mut index = SelectorIndex::build(["A", "B"], &config).unwrap();
        let slot = index.lookup(b"B").unwrap();
        assert!(index.mark_matched(slot));
        assert!(!index.mark_matched(slot));
        assert_eq!(index.matched_count(), 1);
        let missing: Vec<&[u8]> = index.unmatched().map(|s| s.key.as_ref()).collect();
        assert_eq!(missing, vec![&b"A"[..]]);
    }

    #[test]
    fn test_selector_display() {
        let config = SelectConfig::default();
        let index = SelectorIndex::build(["b g", "a"], &config).unwrap();
        assert_eq!(index.at_position(0).to_string(), "b@0 [g]");
        assert_eq!(index.at_position(1).to_string(), "a@1");
    }

    #[test]
    fn test_read_from_line_reader() {
        use crate::error::InputKind;
        use std::io::Cursor;

        let config = SelectConfig::default();
        let mut reader = LineReader::new(
            Cursor::new(&b"seq2|x\r\nseq1\n\nseq3"[..]),
            InputKind::Selection,
            config.max_line_length,
        );
        let index = SelectorIndex::read(&mut reader, &config).unwrap();
        assert_eq!(keys_by_position(&index), vec![&b"seq2"[..], b"seq1", b"seq3"]);
        assert!(reader.warning().is_some());
    }
}
