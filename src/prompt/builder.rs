use crate::grounding::{GroundingContext, UNAVAILABLE};
use crate::intent;
use crate::persona::Persona;

use super::MentionPolicy;

pub const GROUND_TRUTH_LABEL: &str = "GROUND TRUTH";
pub const SEARCH_RESULTS_LABEL: &str = "SEARCH RESULTS";

/// Rule added under [`MentionPolicy::OnlyWhenAsked`]
pub const QUIET_RULE: &str = "Do not mention the time, weather or location unless the user's message asks about them.";

/// Rule added under [`MentionPolicy::Proactive`]
pub const PROACTIVE_RULE: &str = "You may weave the time, weather or location into your reply when it fits naturally.";

/// Builds the system instruction for one turn: persona, live facts, rules
pub fn build_system_instruction(
    persona: Persona,
    grounding: &GroundingContext,
    utterance: &str,
    policy: MentionPolicy,
) -> String {
    let mut prompt = String::new();

    // 1. Persona text, verbatim and first
    prompt.push_str(persona.prompt());
    prompt.push_str("\n\n");

    // 2. Live facts. Always location and time, weather only when requested.
    let geo = grounding.location.value();
    prompt.push_str(GROUND_TRUTH_LABEL);
    prompt.push_str(" (live data for this message):\n");
    prompt.push_str(&format!("- Location: {}\n", or_placeholder(&geo.address)));
    prompt.push_str(&format!("- Local time: {}\n", or_placeholder(&geo.local_time)));
    if let Some(weather) = &grounding.weather {
        prompt.push_str(&format!("- Weather: {}\n", or_placeholder(weather.value())));
    }
    prompt.push('\n');

    // 3. Search results and the Wikipedia summary, kept apart from the ground truth
    if grounding.search.is_some() || grounding.wiki.is_some() {
        let mut lines: Vec<String> = Vec::new();
        if let Some(search) = grounding.search.as_ref().map(|s| s.value().trim()).filter(|s| !s.is_empty()) {
            lines.push(search.to_string());
        }
        if let Some(wiki) = grounding.wiki.as_ref().map(|w| w.value().trim()).filter(|w| !w.is_empty()) {
            lines.push(format!("Wikipedia: {}", wiki));
        }
        if lines.is_empty() {
            lines.push(UNAVAILABLE.to_string());
        }

        prompt.push_str(SEARCH_RESULTS_LABEL);
        prompt.push_str(" (web search for the user's message):\n");
        prompt.push_str(&lines.join("\n"));
        prompt.push_str("\n\n");
    }

    // 4. Rules
    let mut rules = vec![
        "You have live data above. Never claim you lack real-time access.",
        match policy {
            MentionPolicy::OnlyWhenAsked => QUIET_RULE,
            MentionPolicy::Proactive => PROACTIVE_RULE,
        },
        "Use SEARCH RESULTS only for news or fact questions, never to answer what time it is.",
        "When stating the time, use the Local time value exactly as written.",
    ];
    if intent::classify(utterance).asks_time {
        rules.push("The user is asking about the time: answer from GROUND TRUTH.");
    }
    rules.push("Be brief.");
    rules.push("Stay in character.");

    prompt.push_str("Rules:\n");
    for (i, rule) in rules.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
    }

    prompt
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() { UNAVAILABLE } else { value }
}
