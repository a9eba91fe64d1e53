//! Prompt complexity classification
//!
//! A deterministic pure function: word count plus a deep-keyword scan decide
//! which tier chain the auto-router walks. No I/O, no failure mode.

use crate::config::{SwarmConfig, Tier};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Prompt complexity, the input side of tier selection.
///
/// Complexity maps onto model tiers through [`Complexity::search_order`]:
/// a harder classification widens the fallback chain rather than replacing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Complexity {
    T1,
    T2,
    T3,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
        }
    }

    /// The static fallback chain for this complexity.
    ///
    /// Candidates are tried strictly in this tier order, and within a tier in
    /// registration order. Empty tiers are skipped, not treated as failures.
    pub fn search_order(&self) -> &'static [Tier] {
        match self {
            Self::T1 => &[Tier::Fast],
            Self::T2 => &[Tier::Power, Tier::Fast],
            Self::T3 => &[Tier::Deep, Tier::Power, Tier::Fast],
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "T1" => Ok(Self::T1),
            "T2" => Ok(Self::T2),
            "T3" => Ok(Self::T3),
            other => Err(format!(
                "unknown complexity '{other}' (expected T1, T2, or T3)"
            )),
        }
    }
}

/// Classify a prompt into T1/T2/T3.
///
/// Any deep keyword (case-insensitive substring) or a word count above the T2
/// threshold forces T3; a word count above the T1 threshold yields T2;
/// everything else is T1.
pub fn classify(prompt: &str, config: &SwarmConfig) -> Complexity {
    let words = prompt.split_whitespace().count();
    let lowered = prompt.to_lowercase();
    let has_deep = config
        .deep_keywords()
        .iter()
        .any(|kw| lowered.contains(kw.as_str()));

    if has_deep || words > config.t2_max_words() {
        Complexity::T3
    } else if words > config.t1_max_words() {
        Complexity::T2
    } else {
        Complexity::T1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn word_prompt(count: usize) -> String {
        vec!["word"; count].join(" ")
    }

    #[test]
    fn test_short_prompt_is_t1() {
        let config = SwarmConfig::default();
        assert_eq!(classify("Hi", &config), Complexity::T1);
        assert_eq!(classify(&word_prompt(20), &config), Complexity::T1);
    }

    #[test]
    fn test_medium_prompt_is_t2() {
        let config = SwarmConfig::default();
        assert_eq!(classify(&word_prompt(21), &config), Complexity::T2);
        assert_eq!(classify(&word_prompt(60), &config), Complexity::T2);
    }

    #[test]
    fn test_long_prompt_is_t3() {
        let config = SwarmConfig::default();
        assert_eq!(classify(&word_prompt(61), &config), Complexity::T3);
    }

    #[test]
    fn test_deep_keyword_forces_t3_regardless_of_length() {
        let config = SwarmConfig::default();
        // "why" alone is one word but still lands in T3
        assert_eq!(classify("why", &config), Complexity::T3);
        assert_eq!(classify("Compare React and Vue", &config), Complexity::T3);
    }

    #[test]
    fn test_deep_keyword_match_is_case_insensitive() {
        let config = SwarmConfig::default();
        assert_eq!(classify("ANALYZE this log line", &config), Complexity::T3);
        assert_eq!(classify("Explain In Detail please", &config), Complexity::T3);
    }

    #[test]
    fn test_keyword_matches_as_substring() {
        let config = SwarmConfig::default();
        // "designing" contains "design"
        assert_eq!(classify("designing a logo", &config), Complexity::T3);
    }

    #[test]
    fn test_custom_thresholds_respected() {
        let mut config = SwarmConfig::default();
        config.set_thresholds(2, 4);
        assert_eq!(classify("one two", &config), Complexity::T1);
        assert_eq!(classify("one two three", &config), Complexity::T2);
        assert_eq!(classify("one two three four five", &config), Complexity::T3);
    }

    #[test]
    fn test_search_order_chains() {
        assert_eq!(Complexity::T1.search_order(), &[Tier::Fast]);
        assert_eq!(Complexity::T2.search_order(), &[Tier::Power, Tier::Fast]);
        assert_eq!(
            Complexity::T3.search_order(),
            &[Tier::Deep, Tier::Power, Tier::Fast]
        );
    }

    #[test]
    fn test_complexity_from_str_accepts_lowercase() {
        assert_eq!("t2".parse::<Complexity>().unwrap(), Complexity::T2);
        assert!("T4".parse::<Complexity>().is_err());
    }

    proptest! {
        // Keyword-free short prompts always classify T1. The generated words
        // draw from a consonant-only alphabet so no deep keyword can appear.
        #[test]
        fn prop_short_keyword_free_prompts_are_t1(
            words in proptest::collection::vec("[bcdfgjklmnpqrstvxz]{1,8}", 1..=20)
        ) {
            let config = SwarmConfig::default();
            let prompt = words.join(" ");
            prop_assert_eq!(classify(&prompt, &config), Complexity::T1);
        }

        // Classification is a pure function of the prompt
        #[test]
        fn prop_classification_is_deterministic(prompt in "\\PC{0,200}") {
            let config = SwarmConfig::default();
            prop_assert_eq!(classify(&prompt, &config), classify(&prompt, &config));
        }
    }
}
