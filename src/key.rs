/// Length of the default key, in bytes
pub const DEFAULT_KEY_LENGTH: usize = 10;

/// Sort key extracted from a line. Keys compare as byte strings, which for UTF-8 text is code
/// point order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Box<[u8]>);

impl Key {
    /// Create a key from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Key {
        Key(bytes.into().into_boxed_slice())
    }

    /// The key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Derives the [Key] of a line. The same extractor must be used to build and to merge the
/// runs of a sort.
///
/// # Examples
/// ```
/// use external_text_sort::key::{Key, KeyExtractor};
///
/// // order lines by their last 4 bytes
/// struct SuffixKey;
///
/// impl KeyExtractor for SuffixKey {
///     fn extract(&self, line: &[u8]) -> Option<Key> {
///         line.len().checked_sub(4).map(|start| Key::new(&line[start..]))
///     }
///
///     fn describe(&self) -> String {
///         "a suffix of 4 bytes".to_string()
///     }
/// }
///
/// assert_eq!(SuffixKey.extract(b"line-0001"), Some(Key::new("0001")));
/// assert_eq!(SuffixKey.extract(b"ab"), None);
/// ```
pub trait KeyExtractor: Send + Sync {
    /// Extract the key, or `None` when the line does not carry one.
    fn extract(&self, line: &[u8]) -> Option<Key>;

    /// Human readable description of the expected key, used in error messages.
    fn describe(&self) -> String;
}

/// Uses a fixed length prefix of the line as the key.
///
/// # Examples
/// ```
/// use external_text_sort::key::{Key, KeyExtractor, PrefixKey};
///
/// let key = PrefixKey::new(5).with_ignore_case(true);
/// assert_eq!(key.extract(b"Alpha-001"), Some(Key::new("ALPHA")));
/// assert_eq!(key.extract(b"abc"), None);
/// ```
#[derive(Clone, Debug)]
pub struct PrefixKey {
    length: usize,
    ignore_case: bool,
    ignore_blanks: bool,
}

impl PrefixKey {
    /// Create a prefix key of `length` bytes
    pub fn new(length: usize) -> PrefixKey {
        PrefixKey {
            length,
            ignore_case: false,
            ignore_blanks: false,
        }
    }

    /// Get the key length in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    /// Compare ASCII letters case insensitively
    pub fn with_ignore_case(mut self, ignore_case: bool) -> PrefixKey {
        self.ignore_case = ignore_case;
        self
    }

    /// Skip leading blanks (spaces and tabs) before taking the prefix
    pub fn with_ignore_blanks(mut self, ignore_blanks: bool) -> PrefixKey {
        self.ignore_blanks = ignore_blanks;
        self
    }
}

impl Default for PrefixKey {
    fn default() -> Self {
        PrefixKey::new(DEFAULT_KEY_LENGTH)
    }
}

impl KeyExtractor for PrefixKey {
    fn extract(&self, line: &[u8]) -> Option<Key> {
        let mut line = line;
        if self.ignore_blanks {
            let start = line.iter()
                .position(|b| *b != b' ' && *b != b'\t')
                .unwrap_or(line.len());
            line = &line[start..];
        }

        let prefix = line.get(..self.length)?;
        if self.ignore_case {
            Some(Key::new(prefix.to_ascii_uppercase()))
        } else {
            Some(Key::new(prefix))
        }
    }

    fn describe(&self) -> String {
        format!("a prefix of {} bytes", self.length)
    }
}

#[cfg(test)]
mod tests {
    use crate::key::{Key, KeyExtractor, PrefixKey};

    #[test]
    fn test_default_prefix() {
        let key = PrefixKey::default();
        assert_eq!(key.length(), 10);
        assert_eq!(key.extract(b"charlie003-tail"), Some(Key::new("charlie003")));
        assert_eq!(key.extract(b"charlie003"), Some(Key::new("charlie003")));
        assert_eq!(key.extract(b"bravo-001"), None);
        assert_eq!(key.extract(b""), None);
    }

    #[test]
    fn test_ignore_blanks() {
        let key = PrefixKey::new(3).with_ignore_blanks(true);
        assert_eq!(key.extract(b" \t abcdef"), Some(Key::new("abc")));
        assert_eq!(key.extract(b"    ab"), None);
    }

    #[test]
    fn test_ignore_case() {
        let key = PrefixKey::new(4).with_ignore_case(true);
        assert_eq!(key.extract(b"aBcD-1"), key.extract(b"AbCd-2"));
    }

    #[test]
    fn test_key_order() {
        assert!(Key::new("alpha-002") < Key::new("bravo-001"));
        assert!(Key::new("ab") < Key::new("abc"));
        assert_eq!(Key::new("xyz").as_bytes(), b"xyz");
    }
}
