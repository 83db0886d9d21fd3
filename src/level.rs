//! Proficiency tiers and the language constraints each one imposes on a script.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proficiency tier, ordered from easiest to hardest.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProficiencyLevel {
    #[default]
    Starter,
    A1,
    Mover,
    A2,
    Flyer,
    B1,
    B2,
}

/// Vocabulary and grammar constraints for one tier.
#[derive(Debug)]
pub struct LevelPolicy {
    pub label: &'static str,
    pub description: &'static str,
    pub vocabulary_size: u32,
    /// Inclusive words-per-sentence range.
    pub sentence_words: (u32, u32),
    pub grammar: &'static str,
    pub connectors: &'static str,
    pub example: &'static str,
    /// Inclusive total-word range for the whole script.
    pub script_words: (u32, u32),
}

static STARTER: LevelPolicy = LevelPolicy {
    label: "Starter",
    description: "Beginner - Very basic words",
    vocabulary_size: 50,
    sentence_words: (3, 5),
    grammar: "Only simple present tense (I am, I have, I like)",
    connectors: "No complex grammar, no conjunctions",
    example: "This is my dog. I like my dog. My dog is brown.",
    script_words: (30, 50),
};

static A1: LevelPolicy = LevelPolicy {
    label: "A1",
    description: "Elementary - Basic phrases",
    vocabulary_size: 100,
    sentence_words: (5, 7),
    grammar: "Present tense, basic adjectives",
    connectors: "Simple connectors: and, but",
    example: "Hello, my name is Anna. I have a pet dog. The dog is brown and fluffy.",
    script_words: (50, 80),
};

static MOVER: LevelPolicy = LevelPolicy {
    label: "Mover",
    description: "Young learner - Everyday topics",
    vocabulary_size: 150,
    sentence_words: (5, 8),
    grammar: "Present and simple past tense allowed",
    connectors: "Simple connectors: and, but, because",
    example: "Hello everyone. Today I want to talk about my pet. I have a cat. My cat is cute and fluffy.",
    script_words: (60, 100),
};

static A2: LevelPolicy = LevelPolicy {
    label: "A2",
    description: "Pre-Intermediate - Simple sentences",
    vocabulary_size: 200,
    sentence_words: (7, 10),
    grammar: "Past and present tense allowed",
    connectors: "Connectors: and, but, because, then",
    example: "Good morning everyone. Today I want to talk about my family. We went to the park yesterday.",
    script_words: (80, 120),
};

static FLYER: LevelPolicy = LevelPolicy {
    label: "Flyer",
    description: "Confident young learner - Short stories",
    vocabulary_size: 250,
    sentence_words: (8, 12),
    grammar: "All basic tenses allowed (present, past, future)",
    connectors: "Connectors: and, but, because, so, then, when",
    example: "Good morning everyone. I am going to tell you about my favorite place. Last weekend, I went to the zoo with my family.",
    script_words: (100, 150),
};

static B1: LevelPolicy = LevelPolicy {
    label: "B1",
    description: "Intermediate - Complex ideas",
    vocabulary_size: 400,
    sentence_words: (10, 15),
    grammar: "All tenses allowed, relative clauses",
    connectors: "Complex connectors: although, however, therefore",
    example: "Hello everyone, I would like to present about my favorite holiday. Last summer, my family visited the beach, which was truly amazing.",
    script_words: (120, 180),
};

static B2: LevelPolicy = LevelPolicy {
    label: "B2",
    description: "Upper-Intermediate - Nuanced descriptions",
    vocabulary_size: 600,
    sentence_words: (12, 20),
    grammar: "All tenses, passive voice, conditionals allowed; metaphors and similes when appropriate",
    connectors: "Advanced connectors: furthermore, nevertheless, consequently, whereas",
    example: "Good morning everyone. Today, I would like to share my thoughts on environmental protection, which has become increasingly important in our modern society.",
    script_words: (180, 250),
};

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 7] = [
        ProficiencyLevel::Starter,
        ProficiencyLevel::A1,
        ProficiencyLevel::Mover,
        ProficiencyLevel::A2,
        ProficiencyLevel::Flyer,
        ProficiencyLevel::B1,
        ProficiencyLevel::B2,
    ];

    /// Key used on the wire and in config files.
    pub fn key(self) -> &'static str {
        match self {
            ProficiencyLevel::Starter => "STARTER",
            ProficiencyLevel::A1 => "A1",
            ProficiencyLevel::Mover => "MOVER",
            ProficiencyLevel::A2 => "A2",
            ProficiencyLevel::Flyer => "FLYER",
            ProficiencyLevel::B1 => "B1",
            ProficiencyLevel::B2 => "B2",
        }
    }

    pub fn policy(self) -> &'static LevelPolicy {
        policy(self)
    }
}

/// Look up the policy for a tier. Total over the tier set.
pub fn policy(level: ProficiencyLevel) -> &'static LevelPolicy {
    match level {
        ProficiencyLevel::Starter => &STARTER,
        ProficiencyLevel::A1 => &A1,
        ProficiencyLevel::Mover => &MOVER,
        ProficiencyLevel::A2 => &A2,
        ProficiencyLevel::Flyer => &FLYER,
        ProficiencyLevel::B1 => &B1,
        ProficiencyLevel::B2 => &B2,
    }
}

/// Render the constraint bullet list that goes into the script prompt.
pub fn instructions(level: ProficiencyLevel) -> String {
    let p = policy(level);
    let vocabulary = if level == ProficiencyLevel::Starter {
        format!(
            "Use only the most basic {} common words (I, you, is, have, like, this, my, the, a, etc.)",
            p.vocabulary_size
        )
    } else {
        format!("Use up to {} vocabulary words", p.vocabulary_size)
    };

    [
        vocabulary,
        format!(
            "Sentences: {}-{} words maximum",
            p.sentence_words.0, p.sentence_words.1
        ),
        p.grammar.to_string(),
        p.connectors.to_string(),
        format!("Example: \"{}\"", p.example),
        format!(
            "Total script: {}-{} words maximum",
            p.script_words.0, p.script_words.1
        ),
    ]
    .iter()
    .map(|line| format!("- {}", line))
    .collect::<Vec<_>>()
    .join("\n")
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ProficiencyLevel::ALL
            .iter()
            .copied()
            .find(|level| level.key() == wanted)
            .ok_or_else(|| format!("unknown level '{}'", s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_by_vocabulary() {
        let sizes: Vec<u32> = ProficiencyLevel::ALL
            .iter()
            .map(|l| l.policy().vocabulary_size)
            .collect();
        let mut sorted = sizes.clone();
        sorted.sort();
        assert_eq!(sizes, sorted);
        assert!(ProficiencyLevel::Starter < ProficiencyLevel::B2);
    }

    #[test]
    fn starter_keeps_sentences_short() {
        let p = policy(ProficiencyLevel::Starter);
        assert!(p.sentence_words.1 <= 5);
        assert!(p.script_words.1 <= 50);
        let text = instructions(ProficiencyLevel::Starter);
        assert!(text.contains("3-5 words"));
        assert!(text.contains("30-50 words"));
        assert!(text.lines().all(|l| l.starts_with("- ")));
    }

    #[test]
    fn parses_keys_case_insensitively() {
        for level in ProficiencyLevel::ALL {
            assert_eq!(level.key().parse::<ProficiencyLevel>(), Ok(level));
        }
        assert_eq!(" flyer ".parse(), Ok(ProficiencyLevel::Flyer));
        assert!("C2".parse::<ProficiencyLevel>().is_err());
    }

    #[test]
    fn default_is_starter() {
        assert_eq!(ProficiencyLevel::default(), ProficiencyLevel::Starter);
    }

    #[test]
    fn serializes_as_uppercase_key() {
        let json = serde_json::to_string(&ProficiencyLevel::Mover).unwrap();
        assert_eq!(json, "\"MOVER\"");
    }
}
