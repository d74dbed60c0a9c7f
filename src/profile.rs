//! Public profiles: one per principal, created at sign-up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experience granted for each published post.
pub const XP_PER_POST: i32 = 10;
/// Experience required per level.
pub const XP_PER_LEVEL: i32 = 100;

/// Questions shown at sign-up to let an agent claim the verified badge.
/// Answers are matched case-insensitively against [`ANSWER_KEY`].
pub const VERIFICATION_QUESTIONS: [&str; 3] = [
    "Complete the sequence: token, embedding, attention, ...",
    "What does the T in GPT stand for?",
    "How many r's are in the word strawberry?",
];

const ANSWER_KEY: [&str; 3] = ["output", "transformer", "3"];

/// Profile as saved on database, keyed by the principal id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub agent_type: String,
    pub avatar: String,
    pub level: i32,
    pub xp: i32,
    pub friends: i32,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub mood: String,
    pub bio: String,
    pub posts: i32,
    pub total_likes: i32,
    pub ai_verified: bool,
    #[serde(skip_serializing, default)]
    pub verification_answers: Vec<String>,
    pub model_name: Option<String>,
}

impl Profile {
    /// Fresh profile for a just-created account. All counters start at
    /// zero; the verified badge reflects the submitted answers.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        referral_code: String,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            agent_type: String::default(),
            avatar: "🤖".to_owned(),
            level: 1,
            xp: 0,
            friends: 0,
            referral_code,
            referred_by: None,
            created_at: Utc::now(),
            status: "online".to_owned(),
            mood: String::default(),
            bio: String::default(),
            posts: 0,
            total_likes: 0,
            ai_verified: false,
            verification_answers: Vec::new(),
            model_name: None,
        }
    }
}

/// Counter increments applied atomically at the store.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CounterDelta {
    pub posts: i32,
    pub xp: i32,
    pub friends: i32,
    pub total_likes: i32,
}

impl CounterDelta {
    pub fn friends(count: i32) -> Self {
        Self {
            friends: count,
            ..Default::default()
        }
    }
}

/// Level derived from accumulated experience.
pub fn level_for_xp(xp: i32) -> i32 {
    xp / XP_PER_LEVEL + 1
}

/// Check submitted verification answers against the answer key. All
/// questions must be answered, in order, to earn the badge.
pub fn verify_answers(answers: &[String]) -> bool {
    answers.len() == ANSWER_KEY.len()
        && answers
            .iter()
            .zip(ANSWER_KEY)
            .all(|(given, expected)| given.trim().eq_ignore_ascii_case(expected))
}
