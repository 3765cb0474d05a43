// Interview question bank. Grouped by focus area; the progressive ladder in
// mod.rs decides which group the next round of questions draws from.

pub const BUSINESS_CONTEXT_QUESTIONS: &[&str] = &[
    "What's the primary purpose? (lead capture, support, bookings, routing)",
    "Which channels? (voice, chat, email) What locales?",
];

pub const AUDIENCE_QUESTIONS: &[&str] = &[
    "Who are the users? What are the top 10 intents?",
    "Language/region constraints?",
];

pub const BRAND_VOICE_QUESTIONS: &[&str] = &[
    "Give me 5 tone adjectives (e.g., calm, professional, friendly)",
    "Pacing preference? (fast, moderate, slow)",
    "Any hold-music or transfer phrasing preferences?",
];

pub const GUARDRAIL_QUESTIONS: &[&str] = &[
    "What should the agent refuse to do?",
    "Any disclaimers or PII restrictions?",
    "Regulatory scope? (HIPAA, PCI, industry codes)",
];

pub const SUCCESS_METRIC_QUESTIONS: &[&str] = &[
    "Success metrics? (CSAT, AHT, FCR, conversion)",
    "Escalation SLA or transfer targets?",
];

/// System prompt for interview question generation.
/// Replace: {focus_area}, {question_context}
pub const INTERVIEW_SYSTEM_TEMPLATE: &str = "You are interviewing a stakeholder to build \
    enterprise AI agent metaprompts. Current focus: {focus_area}. \
    Ask 2-3 concise, targeted questions. Be specific. {question_context}";
