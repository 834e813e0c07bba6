//! Relay options: which message types a rule forwards, and whether forwards are silent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One option token accepted by `set` and `backup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayOption {
    Silent,
    Text,
    All,
    Photo,
    Document,
    Video,
    Sticker,
    Animation,
    Voice,
    Audio,
}

impl RelayOption {
    pub const ALL: [RelayOption; 10] = [
        RelayOption::Silent,
        RelayOption::Text,
        RelayOption::All,
        RelayOption::Photo,
        RelayOption::Document,
        RelayOption::Video,
        RelayOption::Sticker,
        RelayOption::Animation,
        RelayOption::Voice,
        RelayOption::Audio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelayOption::Silent => "silent",
            RelayOption::Text => "text",
            RelayOption::All => "all",
            RelayOption::Photo => "photo",
            RelayOption::Document => "document",
            RelayOption::Video => "video",
            RelayOption::Sticker => "sticker",
            RelayOption::Animation => "animation",
            RelayOption::Voice => "voice",
            RelayOption::Audio => "audio",
        }
    }

    /// Comma separated list of every accepted token, for error messages.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|o| o.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RelayOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Set of relay options. Empty means "everything", same as containing `all`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(BTreeSet<RelayOption>);

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses command tokens. Unknown tokens are returned together as the error.
    pub fn parse<'a, I>(tokens: I) -> Result<Self, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = BTreeSet::new();
        let mut unknown = Vec::new();
        for token in tokens {
            match token.parse::<RelayOption>() {
                Ok(option) => {
                    set.insert(option);
                }
                Err(bad) => {
                    if !unknown.contains(&bad) {
                        unknown.push(bad);
                    }
                }
            }
        }
        if unknown.is_empty() {
            Ok(Self(set))
        } else {
            Err(unknown)
        }
    }

    pub fn contains(&self, option: RelayOption) -> bool {
        self.0.contains(&option)
    }

    pub fn insert(&mut self, option: RelayOption) -> bool {
        self.0.insert(option)
    }

    pub fn remove(&mut self, option: RelayOption) -> bool {
        self.0.remove(&option)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RelayOption> + '_ {
        self.0.iter().copied()
    }

    /// Whether a message with the given media tag passes this option set.
    pub fn allows(&self, media_tag: &str) -> bool {
        let type_options = self.0.iter().filter(|o| **o != RelayOption::Silent);
        let mut any_type_option = false;
        for option in type_options {
            any_type_option = true;
            if *option == RelayOption::All || option.as_str() == media_tag {
                return true;
            }
        }
        !any_type_option
    }

    pub fn is_silent(&self) -> bool {
        self.contains(RelayOption::Silent)
    }
}

impl FromIterator<RelayOption> for OptionSet {
    fn from_iter<T: IntoIterator<Item = RelayOption>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("all");
        }
        let joined = self
            .0
            .iter()
            .map(|o| o.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}
