//! Requirements interview - collects intake fields over a conversation,
//! asking progressively focused questions until the active profile is
//! complete.

pub mod prompts;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::intake::{FieldProfile, IntakeRecord};
use crate::interview::prompts::{
    AUDIENCE_QUESTIONS, BRAND_VOICE_QUESTIONS, BUSINESS_CONTEXT_QUESTIONS, GUARDRAIL_QUESTIONS,
    INTERVIEW_SYSTEM_TEMPLATE, SUCCESS_METRIC_QUESTIONS,
};
use crate::llm_client::{LlmClient, SYNTHESIS_MODEL};

/// The next interview focus: which area to probe and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub area: &'static str,
    pub guidance: String,
}

/// Progressive questioning ladder: broad business context first, then
/// audience, voice, compliance, metrics, and finally whatever is left.
pub fn next_focus(intake: &IntakeRecord, missing: &[String]) -> Focus {
    if intake.get("Business_Context").is_none() {
        Focus {
            area: "Business Context",
            guidance: format!(
                "Ask 2-3 questions about: {}",
                BUSINESS_CONTEXT_QUESTIONS.join(" ")
            ),
        }
    } else if intake.get("Audience").is_none() {
        Focus {
            area: "Audience",
            guidance: format!("Ask 2-3 questions about: {}", AUDIENCE_QUESTIONS.join(" ")),
        }
    } else if intake.get("Brand_Voice").is_none() {
        Focus {
            area: "Brand Voice",
            guidance: format!(
                "Ask 2-3 questions about: {}",
                BRAND_VOICE_QUESTIONS.join(" ")
            ),
        }
    } else if intake.get("Guardrails").is_none() {
        Focus {
            area: "Guardrails & Compliance",
            guidance: format!("Ask 2-3 questions about: {}", GUARDRAIL_QUESTIONS.join(" ")),
        }
    } else if intake.get("Success_Metrics").is_none() {
        Focus {
            area: "Success Metrics",
            guidance: format!(
                "Ask 1-2 questions about: {}",
                SUCCESS_METRIC_QUESTIONS.join(" ")
            ),
        }
    } else {
        let remaining: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();
        Focus {
            area: "Remaining Details",
            guidance: format!("Ask specific questions about: {}", remaining.join(", ")),
        }
    }
}

/// Reply from one interview round.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterviewReply {
    Questions {
        questions: String,
        missing: Vec<String>,
        collected: IntakeRecord,
        progress: String,
    },
    Ready {
        message: String,
        collected: IntakeRecord,
    },
}

/// Runs one interview round: persists the user message, and either reports
/// readiness or asks the next batch of questions (also persisted).
pub async fn run_interview(
    pool: &PgPool,
    llm: &LlmClient,
    session_id: Uuid,
    user_message: &str,
    intake: &IntakeRecord,
    profile: &FieldProfile,
) -> Result<InterviewReply, AppError> {
    record_message(pool, session_id, "user", user_message).await?;

    let missing = intake.missing(profile);
    if missing.is_empty() {
        return Ok(InterviewReply::Ready {
            message: "All required fields collected. Ready to generate an enterprise-grade \
                      metaprompt."
                .to_string(),
            collected: intake.clone(),
        });
    }

    let focus = next_focus(intake, &missing);
    let collected_json = serde_json::to_string_pretty(intake)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize intake: {e}")))?;
    let question_context = format!(
        "Already collected: {}\n\nMissing: {}\n\n{}",
        collected_json,
        missing.join(", "),
        focus.guidance
    );
    let system = INTERVIEW_SYSTEM_TEMPLATE
        .replace("{focus_area}", focus.area)
        .replace("{question_context}", &question_context);

    let user = if user_message.trim().is_empty() {
        "Begin the interview."
    } else {
        user_message
    };
    let questions = llm.complete(SYNTHESIS_MODEL, &system, user).await?;

    record_message(pool, session_id, "assistant", &questions).await?;

    let total = profile.fields().len();
    Ok(InterviewReply::Questions {
        questions,
        progress: format!("{}/{} fields collected", total - missing.len(), total),
        missing,
        collected: intake.clone(),
    })
}

async fn record_message(
    pool: &PgPool,
    conversation_id: Uuid,
    role: &str,
    content: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO conversation_messages (conversation_id, role, content) VALUES ($1, $2, $3)",
    )
    .bind(conversation_id)
    .bind(role)
    .bind(content)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn intake(pairs: &[(&str, &str)]) -> IntakeRecord {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IntakeRecord::from_collected(&map).unwrap()
    }

    #[test]
    fn test_focus_starts_with_business_context() {
        let record = intake(&[]);
        let missing = record.missing(&FieldProfile::extended());
        assert_eq!(next_focus(&record, &missing).area, "Business Context");
    }

    #[test]
    fn test_focus_advances_through_the_ladder() {
        let record = intake(&[("Business_Context", "bakery")]);
        let missing = record.missing(&FieldProfile::extended());
        assert_eq!(next_focus(&record, &missing).area, "Audience");

        let record = intake(&[
            ("Business_Context", "bakery"),
            ("Audience", "customers"),
            ("Brand_Voice", "warm"),
            ("Guardrails", "no allergens advice"),
        ]);
        let missing = record.missing(&FieldProfile::extended());
        assert_eq!(next_focus(&record, &missing).area, "Success Metrics");
    }

    #[test]
    fn test_focus_falls_back_to_remaining_details() {
        let record = intake(&[
            ("Business_Context", "bakery"),
            ("Audience", "customers"),
            ("Brand_Voice", "warm"),
            ("Guardrails", "standard"),
            ("Success_Metrics", "CSAT"),
        ]);
        let missing = record.missing(&FieldProfile::extended());
        let focus = next_focus(&record, &missing);
        assert_eq!(focus.area, "Remaining Details");
        assert!(focus.guidance.contains("Goal"));
    }

    #[test]
    fn test_reply_serializes_with_type_tag() {
        let reply = InterviewReply::Ready {
            message: "done".to_string(),
            collected: intake(&[]),
        };
        let json = serde_json::to_value(reply).unwrap();
        assert_eq!(json["type"], "ready");

        let reply = InterviewReply::Questions {
            questions: "What is the goal?".to_string(),
            missing: vec!["Goal".to_string()],
            collected: intake(&[]),
            progress: "9/10 fields collected".to_string(),
        };
        let json = serde_json::to_value(reply).unwrap();
        assert_eq!(json["type"], "questions");
        assert_eq!(json["progress"], "9/10 fields collected");
    }
}
