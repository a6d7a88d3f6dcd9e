//! Prompt templates for the script generator, keyed by narration intensity.

/// Fixed slang vocabulary every prompt asks the model to substitute into the
/// narration. Interpolated verbatim, comma-joined, into all five templates.
pub const BRAINROT_TERMS: &[&str] = &[
    "skibidi",
    "rizz",
    "gyatt",
    "sigma",
    "ohio",
    "fanum tax",
    "bussin",
    "no cap",
    "sus",
    "cooked",
    "aura",
    "mewing",
    "delulu",
    "npc",
    "goated",
    "mid",
    "ratio",
    "touch grass",
    "let him cook",
    "its giving",
];

const CLOSING_INSTRUCTION: &str = "Return a string with only the script as if it was a story, \
     dont say here is the video with the duration, go straight into script.";

/// Narration intensity, from mostly normal narration with light slang (1)
/// up to maximally chaotic meme-speech (5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Mild,
    Quirky,
    Playful,
    Chaotic,
    Unhinged,
}

impl Level {
    /// Default used when the form omits the field.
    pub const DEFAULT: Level = Level::Playful;

    pub const ALL: [Level; 5] = [
        Level::Mild,
        Level::Quirky,
        Level::Playful,
        Level::Chaotic,
        Level::Unhinged,
    ];

    /// Out-of-range numbers are rejected at the request boundary rather
    /// than clamped or defaulted.
    pub fn from_number(n: i64) -> Option<Level> {
        match n {
            1 => Some(Level::Mild),
            2 => Some(Level::Quirky),
            3 => Some(Level::Playful),
            4 => Some(Level::Chaotic),
            5 => Some(Level::Unhinged),
            _ => None,
        }
    }

    pub fn number(self) -> i64 {
        match self {
            Level::Mild => 1,
            Level::Quirky => 2,
            Level::Playful => 3,
            Level::Chaotic => 4,
            Level::Unhinged => 5,
        }
    }
}

/// Compose the generation prompt for one request. The speaking-time ceiling
/// is twice the requested clip duration.
pub fn compose(level: Level, duration_secs: i64) -> String {
    let ceiling = duration_secs * 2;
    let terms = BRAINROT_TERMS.join(", ");

    let (opening, term_clause) = match level {
        Level::Mild => (
            "Make a story out of what is happening in the video, pay attention to every detail \
             and make sure it is related to the video and not random.",
            format!("Use and replace a few of the words with these words: {terms}."),
        ),
        Level::Quirky => (
            "Make a story out of what is happening in the video, keeping it quirky and fun \
             while related to the video content.",
            format!("Use some of these words to replace standard terms: {terms}."),
        ),
        Level::Playful => (
            "Turn the video into a playful story, focusing on every detail and adding a \
             quirky, meme-like tone.",
            format!("Use and replace many of the words with these: {terms} for a fun and unique tone."),
        ),
        Level::Chaotic => (
            "Transform the video into a chaotic, meme-heavy story filled with internet humor.",
            format!("Use and replace a lot of the words with these: {terms} to embrace the brain-rot energy."),
        ),
        Level::Unhinged => (
            "Turn the video into an absurd, brain-rot-driven story that exaggerates every \
             detail and embraces internet meme chaos.",
            format!(
                "Heavily use and replace words with these: {terms} to make the script \
                 completely unhinged and full of brain rot."
            ),
        ),
    };

    format!(
        "{opening} Make sure the estimated speaking time of this story is no more than \
         {ceiling} seconds long. {term_clause} {CLOSING_INSTRUCTION}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_level_states_the_speaking_ceiling() {
        for level in Level::ALL {
            for duration in [1, 30, 60, 300] {
                let prompt = compose(level, duration);
                let ceiling = format!("no more than {} seconds", duration * 2);
                assert!(
                    prompt.contains(&ceiling),
                    "level {} duration {duration}: missing ceiling in {prompt:?}",
                    level.number()
                );
            }
        }
    }

    #[test]
    fn every_level_carries_the_full_term_list() {
        let terms = BRAINROT_TERMS.join(", ");
        for level in Level::ALL {
            let prompt = compose(level, 60);
            assert!(prompt.contains(&terms), "level {} lost the term list", level.number());
            assert!(prompt.contains("go straight into script"));
        }
    }

    #[test]
    fn level_parsing_bounds() {
        assert_eq!(Level::from_number(1), Some(Level::Mild));
        assert_eq!(Level::from_number(3), Some(Level::DEFAULT));
        assert_eq!(Level::from_number(5), Some(Level::Unhinged));
        assert_eq!(Level::from_number(0), None);
        assert_eq!(Level::from_number(6), None);
        assert_eq!(Level::from_number(-3), None);
    }

    #[test]
    fn levels_round_trip_their_numbers() {
        for level in Level::ALL {
            assert_eq!(Level::from_number(level.number()), Some(level));
        }
    }

    #[test]
    fn templates_escalate_distinctly() {
        let prompts: Vec<String> = Level::ALL.iter().map(|l| compose(*l, 60)).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
