//! Filename conventions: the sequence token ordering questionnaire fragments and the
//! association key binding an evidence image to a worksheet row.
use crate::error::EvidenceSheetError;
use crate::helpers::reader::base_name;
use regex::Regex;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::debug;
use tracing::warn;

/// Order token of a fragment whose name carries no sequence number; sorts last
pub const UNORDERED: u32 = u32::MAX;

/// Item inside a section: a letter (`"3_D"`) or a sub-number (`"3.3"`)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyItem {
    Letter(char),
    Number(u32),
}

/// Identifies the worksheet row an evidence image belongs to.
///
/// Canonical form is the section number without leading zeros, followed by an
/// uppercase item letter or a dotted sub-number when present: `"3_D"`, `"3.3"`, `"7"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationKey {
    number: u32,
    item: Option<KeyItem>,
}

impl AssociationKey {
    pub fn new(number: u32, letter: Option<char>) -> Self {
        AssociationKey {
            number,
            item: letter.map(|letter| KeyItem::Letter(letter.to_ascii_uppercase())),
        }
    }

    /// Key of a numbered question such as `"3.3"`
    pub fn numbered(number: u32, sub_number: u32) -> Self {
        AssociationKey {
            number,
            item: Some(KeyItem::Number(sub_number)),
        }
    }

    /// Section or item number
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn item(&self) -> Option<KeyItem> {
        self.item
    }

    /// Uppercase item letter inside the section, if any
    pub fn letter(&self) -> Option<char> {
        match self.item {
            Some(KeyItem::Letter(letter)) => Some(letter),
            _ => None,
        }
    }

    /// Sub-number of a numbered question, if any
    pub fn sub_number(&self) -> Option<u32> {
        match self.item {
            Some(KeyItem::Number(number)) => Some(number),
            _ => None,
        }
    }
}

impl Display for AssociationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.item {
            Some(KeyItem::Letter(letter)) => write!(f, "{}_{}", self.number, letter),
            Some(KeyItem::Number(number)) => write!(f, "{}.{}", self.number, number),
            None => write!(f, "{}", self.number),
        }
    }
}

impl FromStr for AssociationKey {
    type Err = EvidenceSheetError;

    /// Parses a canonical key such as `"3_D"`, `"3.3"` or `"7"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some((number, sub_number)) = value.split_once('.') {
            return Ok(AssociationKey::numbered(number.trim().parse::<u32>()?, sub_number.trim().parse::<u32>()?));
        }
        match value.split_once('_') {
            Some((number, letter)) => {
                let number = number.trim().parse::<u32>()?;
                let mut letters = letter.trim().chars();
                match (letters.next(), letters.next()) {
                    (Some(letter), None) if letter.is_ascii_alphabetic() => Ok(AssociationKey::new(number, Some(letter))),
                    _ => Err(EvidenceSheetError::WithContextError(format!("Invalid association key '{}'", value))),
                }
            }
            None => Ok(AssociationKey::new(value.trim().parse::<u32>()?, None)),
        }
    }
}

/// How evidence filenames encode their association key
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyGrammar {
    /// Dotted prefix when the file stem contains a '.', alphanumeric pair otherwise
    #[default]
    Auto,
    /// `"18.1 1.jpg"`: worksheet prefix, dot, item number
    DottedPrefix,
    /// `"3_D-1.png"`: section number, underscore, item letter; or a bare leading number
    AlphanumericPair,
    /// `"3_3-proof.jpg"`: section number, underscore, question number; key `"3.3"`
    NumericPair,
}

/// Naming conventions of one deployment
#[derive(Clone, Debug, PartialEq)]
pub struct NamingRules {
    /// Words introducing the sequence number in fragment names, matched case-insensitively
    pub order_keywords: Vec<String>,
    pub grammar: KeyGrammar,
    /// Prefix before the dot that dotted-prefix names must carry; dotted names are
    /// rejected when unset
    pub required_prefix: Option<String>,
    /// Accepted item numbers for dotted-prefix names
    pub item_range: Option<RangeInclusive<u32>>,
}

impl Default for NamingRules {
    fn default() -> Self {
        NamingRules {
            order_keywords: vec!["level".to_owned(), "part".to_owned()],
            grammar: KeyGrammar::Auto,
            required_prefix: None,
            item_range: None,
        }
    }
}

/// Extracts order tokens and association keys from file names.
#[derive(Clone, Debug)]
pub struct NamingParser {
    rules: NamingRules,
    order_pattern: Regex,
    dotted_pattern: Regex,
    pair_pattern: Regex,
    numeric_pair_pattern: Regex,
}

impl NamingParser {
    pub fn new(rules: NamingRules) -> Result<NamingParser, EvidenceSheetError> {
        let keywords = rules
            .order_keywords
            .iter()
            .map(|keyword| regex::escape(keyword.trim()))
            .filter(|keyword| !keyword.is_empty())
            .collect::<Vec<_>>();
        if keywords.is_empty() {
            Err(EvidenceSheetError::WithContextError("No order keyword configured".to_owned()))?;
        }
        let order_pattern = Regex::new(&format!(r"(?i)(?:{})[\s_.\-]*(\d+)", keywords.join("|")))
            .map_err(|error| EvidenceSheetError::WithContextError(format!("Invalid order keyword: {}", error)))?;
        Ok(NamingParser {
            rules,
            order_pattern,
            dotted_pattern: Regex::new(r"^\s*(\d+)\.(\d+)").expect("Hardcode regex pattern"),
            pair_pattern: Regex::new(r"^\s*(\d+)(?:_([A-Za-z]))?").expect("Hardcode regex pattern"),
            numeric_pair_pattern: Regex::new(r"^\s*(\d+)_(\d+)").expect("Hardcode regex pattern"),
        })
    }

    pub fn rules(&self) -> &NamingRules {
        &self.rules
    }

    /// Sequence number embedded in a fragment name (`"Level 2.xlsx"` → 2), or [`UNORDERED`].
    pub fn extract_order_token(&self, file_name: &str) -> u32 {
        self.order_pattern
            .captures(base_name(file_name))
            .and_then(|captures| captures[1].parse::<u32>().ok())
            .unwrap_or(UNORDERED)
    }

    /// Association key of an evidence file, `None` when the name follows no known grammar.
    ///
    /// Directory components of archive paths and the file extension are ignored.
    pub fn association_key(&self, file_name: &str) -> Option<AssociationKey> {
        let stem = file_stem(base_name(file_name));
        match self.rules.grammar {
            KeyGrammar::Auto if stem.contains('.') => self.dotted_key(stem),
            KeyGrammar::Auto => self.pair_key(stem),
            KeyGrammar::DottedPrefix => self.dotted_key(stem),
            KeyGrammar::AlphanumericPair => self.pair_key(stem),
            KeyGrammar::NumericPair => self.numeric_pair_key(stem),
        }
    }

    fn dotted_key(&self, stem: &str) -> Option<AssociationKey> {
        let captures = self.dotted_pattern.captures(stem)?;
        let Some(required) = &self.rules.required_prefix else {
            warn!(file = stem, "No worksheet prefix configured for dotted evidence names");
            return None;
        };
        if !same_number(&captures[1], required) {
            debug!(file = stem, prefix = &captures[1], "Evidence belongs to another worksheet");
            return None;
        }
        let item = captures[2].parse::<u32>().ok()?;
        if let Some(range) = &self.rules.item_range {
            if !range.contains(&item) {
                return None;
            }
        }
        Some(AssociationKey::new(item, None))
    }

    fn pair_key(&self, stem: &str) -> Option<AssociationKey> {
        if self.numeric_pair_pattern.is_match(stem) {
            warn!(file = stem, "Numbered question in an alphanumeric evidence name");
            return None;
        }
        let captures = self.pair_pattern.captures(stem)?;
        let number = captures[1].parse::<u32>().ok()?;
        let letter = captures.get(2).and_then(|letter| letter.as_str().chars().next());
        Some(AssociationKey::new(number, letter))
    }

    fn numeric_pair_key(&self, stem: &str) -> Option<AssociationKey> {
        let captures = self.numeric_pair_pattern.captures(stem)?;
        let number = captures[1].parse::<u32>().ok()?;
        let sub_number = captures[2].parse::<u32>().ok()?;
        Some(AssociationKey::numbered(number, sub_number))
    }
}

/// File name without its last extension
fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Compares two numeric strings ignoring leading zeros
fn same_number(left: &str, right: &str) -> bool {
    match (left.trim().parse::<u64>(), right.trim().parse::<u64>()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left.trim() == right.trim(),
    }
}
