//! Prompt text sent to the providers.

use crate::level::{self, ProficiencyLevel};

/// Placeholder the model writes where the child's name belongs.
pub const NAME_PLACEHOLDER: &str = "[Name]";

pub const LIVE_SYSTEM_INSTRUCTION: &str =
    "You are listening to a child practice English. Just transcribe accurately what they say.";

pub fn illustration_prompt(theme: &str) -> String {
    format!(
        "A highly vibrant, cheerful, and detailed cartoon-style illustration for children showing: {}. \
         Use bright colors, clear lines, and friendly characters. \
         Ensure there are many small interesting details for a child to describe (e.g., animals, toys, actions). \
         High resolution, professional children's book style.",
        theme
    )
}

pub fn script_prompt(theme: &str, level: ProficiencyLevel) -> String {
    let key = level.key();
    format!(
        "Based on this picture about \"{theme}\", create an English presentation script for a child learning English at {key} level (CEFR).\n\
         \n\
         STRICT LANGUAGE REQUIREMENTS:\n\
         {rules}\n\
         \n\
         The script must include:\n\
         1. An introduction starting with \"Hello everyone, my name is {NAME_PLACEHOLDER}...\"\n\
         2. 4-6 descriptive sentences about what is happening in the picture.\n\
         3. A conclusion like \"That is all. Thank you for listening.\"\n\
         \n\
         IMPORTANT:\n\
         - Use ONLY vocabulary appropriate for {key} level\n\
         - Keep sentences SHORT and SIMPLE for lower levels\n\
         - Focus on clarity over complexity\n\
         \n\
         Return the response in JSON format.",
        rules = level::instructions(level),
    )
}

pub fn speech_prompt(script: &str) -> String {
    format!(
        "Read this script very clearly, slowly (0.8x speed), and expressively with a friendly US English accent for a child: {}",
        script
    )
}

pub fn scoring_prompt(reference: &str, transcript: &str) -> String {
    format!(
        "Analyze the following English speech transcript against the target script.\n\
         Target: \"{reference}\"\n\
         Transcript: \"{transcript}\"\n\
         \n\
         Provide feedback for a child.\n\
         1. A score from 0-100.\n\
         2. CEFR Level (Pre-A1, A1, A2, B1).\n\
         3. A list of 2-3 specific words the child mispronounced or missed.\n\
         4. A short encouraging feedback message.\n\
         \n\
         Return JSON."
    )
}

/// Replace every name placeholder with `name`.
pub fn personalize(text: &str, name: &str) -> String {
    text.replace(NAME_PLACEHOLDER, name)
}
