pub const PROFESSIONAL_PERSONA_PROMPT: &str = "You are a helpful, polite business assistant.";
