//! Application-level configuration loading, including the runtime game rules.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MILLIONAIRE_BACK_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: GameRules,
    pacing: Pacing,
}

#[derive(Debug, Clone)]
/// Rules of the game: reward values, safe havens, and lifeline constants.
pub struct GameRules {
    /// Ascending reward values, one per question.
    pub prize_ladder: Vec<u64>,
    /// 1-indexed question numbers whose winnings become guaranteed.
    pub safe_havens: Vec<usize>,
    /// Number of questions fetched for a session.
    pub question_count: usize,
    /// Seconds allowed to answer each question.
    pub countdown_seconds: u32,
    /// Probability that the phoned friend names the correct answer.
    pub phone_friend_correct_probability: f64,
    /// Base percentage of the audience vote granted to the correct answer.
    pub audience_correct_base: u8,
    /// Extra audience percentage drawn uniformly on top of the base.
    pub audience_bonus_spread: u8,
    /// Names the phoned friend is drawn from.
    pub friends: Vec<String>,
}

#[derive(Debug, Clone)]
/// Pacing of the presentation-facing delays between game events.
pub struct Pacing {
    /// Pause between selecting an answer and revealing its correctness.
    pub answer_select: Duration,
    /// Pause the reveal stays on screen before the game moves on.
    pub answer_reveal: Duration,
    /// How long the phone rings before the friend picks up.
    pub phone_ringing: Duration,
    /// Delay between consecutive lines of the phone conversation.
    pub phone_message: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    match app_config.validate() {
                        Ok(()) => {
                            info!(
                                path = %path.display(),
                                questions = app_config.rules().question_count,
                                "loaded game rules from config"
                            );
                            app_config
                        }
                        Err(reason) => {
                            warn!(
                                path = %path.display(),
                                reason,
                                "inconsistent game rules in config; falling back to defaults"
                            );
                            Self::default()
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Build a configuration from explicit parts, primarily for tests.
    pub fn new(rules: GameRules, pacing: Pacing) -> Self {
        Self { rules, pacing }
    }

    /// Game rules in effect for every session.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Presentation pacing delays.
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    fn validate(&self) -> Result<(), &'static str> {
        let rules = &self.rules;
        if rules.question_count == 0 {
            return Err("question count must be positive");
        }
        if rules.prize_ladder.len() != rules.question_count {
            return Err("prize ladder length must match the question count");
        }
        if rules
            .safe_havens
            .iter()
            .any(|&haven| haven == 0 || haven > rules.question_count)
        {
            return Err("safe havens must be 1-indexed question numbers");
        }
        if !(0.0..=1.0).contains(&rules.phone_friend_correct_probability) {
            return Err("phone friend probability must be within [0, 1]");
        }
        if usize::from(rules.audience_correct_base) + usize::from(rules.audience_bonus_spread) > 100
        {
            return Err("audience base plus bonus spread must not exceed 100");
        }
        Ok(())
    }
}

impl GameRules {
    /// Reward for answering every question correctly.
    pub fn top_prize(&self) -> u64 {
        self.prize_ladder.last().copied().unwrap_or(0)
    }

    /// Whether the given 1-indexed question number is a safe haven.
    pub fn is_safe_haven(&self, question_number: usize) -> bool {
        self.safe_havens.contains(&question_number)
    }

    /// Reward locked in when walking away after `questions_answered` correct answers.
    pub fn walk_away_prize(&self, questions_answered: usize) -> u64 {
        questions_answered
            .checked_sub(1)
            .and_then(|index| self.prize_ladder.get(index).copied())
            .unwrap_or(0)
    }

    /// Reward guaranteed by the highest safe haven at or below `questions_answered`.
    ///
    /// Zero when no safe haven has been reached yet.
    pub fn guaranteed_prize(&self, questions_answered: usize) -> u64 {
        self.safe_havens
            .iter()
            .filter(|&&haven| haven <= questions_answered)
            .max()
            .map(|&haven| self.walk_away_prize(haven))
            .unwrap_or(0)
    }

    /// Reward at stake for the question at the given 0-based index.
    pub fn question_value(&self, index: usize) -> u64 {
        self.prize_ladder.get(index).copied().unwrap_or(0)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            pacing: Pacing::default(),
        }
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            prize_ladder: vec![
                100, 200, 300, 500, 1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 64_000, 125_000,
                250_000, 500_000, 1_000_000,
            ],
            safe_havens: vec![5, 10, 13],
            question_count: 15,
            countdown_seconds: 30,
            phone_friend_correct_probability: 0.7,
            audience_correct_base: 60,
            audience_bonus_spread: 20,
            friends: ["Alex", "Sam", "Jordan", "Taylor", "Casey"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            answer_select: Duration::from_millis(1_000),
            answer_reveal: Duration::from_millis(2_000),
            phone_ringing: Duration::from_millis(2_000),
            phone_message: Duration::from_millis(1_500),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rules: RawRules,
    #[serde(default)]
    pacing: RawPacing,
}

#[derive(Debug, Default, Deserialize)]
/// Game-rule overrides inside the configuration file; absent fields keep defaults.
struct RawRules {
    prize_ladder: Option<Vec<u64>>,
    safe_havens: Option<Vec<usize>>,
    question_count: Option<usize>,
    countdown_seconds: Option<u32>,
    phone_friend_correct_probability: Option<f64>,
    audience_correct_base: Option<u8>,
    audience_bonus_spread: Option<u8>,
    friends: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
/// Pacing overrides (milliseconds) inside the configuration file.
struct RawPacing {
    answer_select_ms: Option<u64>,
    answer_reveal_ms: Option<u64>,
    phone_ringing_ms: Option<u64>,
    phone_message_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = GameRules::default();
        let pacing_defaults = Pacing::default();
        let RawRules {
            prize_ladder,
            safe_havens,
            question_count,
            countdown_seconds,
            phone_friend_correct_probability,
            audience_correct_base,
            audience_bonus_spread,
            friends,
        } = value.rules;

        let rules = GameRules {
            prize_ladder: prize_ladder.unwrap_or(defaults.prize_ladder),
            safe_havens: safe_havens.unwrap_or(defaults.safe_havens),
            question_count: question_count.unwrap_or(defaults.question_count),
            countdown_seconds: countdown_seconds.unwrap_or(defaults.countdown_seconds),
            phone_friend_correct_probability: phone_friend_correct_probability
                .unwrap_or(defaults.phone_friend_correct_probability),
            audience_correct_base: audience_correct_base.unwrap_or(defaults.audience_correct_base),
            audience_bonus_spread: audience_bonus_spread
                .unwrap_or(defaults.audience_bonus_spread),
            friends: friends.unwrap_or(defaults.friends),
        };

        let RawPacing {
            answer_select_ms,
            answer_reveal_ms,
            phone_ringing_ms,
            phone_message_ms,
        } = value.pacing;

        let pacing = Pacing {
            answer_select: answer_select_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.answer_select),
            answer_reveal: answer_reveal_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.answer_reveal),
            phone_ringing: phone_ringing_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.phone_ringing),
            phone_message: phone_message_ms
                .map(Duration::from_millis)
                .unwrap_or(pacing_defaults.phone_message),
        };

        Self { rules, pacing }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_are_consistent() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rules().prize_ladder.len(), 15);
        assert_eq!(config.rules().top_prize(), 1_000_000);
    }

    #[test]
    fn walk_away_prize_uses_last_answered_question() {
        let rules = GameRules::default();
        assert_eq!(rules.walk_away_prize(0), 0);
        assert_eq!(rules.walk_away_prize(1), 100);
        assert_eq!(rules.walk_away_prize(5), 1_000);
        assert_eq!(rules.walk_away_prize(15), 1_000_000);
    }

    #[test]
    fn guaranteed_prize_tracks_highest_reached_haven() {
        let rules = GameRules::default();
        assert_eq!(rules.guaranteed_prize(0), 0);
        assert_eq!(rules.guaranteed_prize(4), 0);
        assert_eq!(rules.guaranteed_prize(5), 1_000);
        assert_eq!(rules.guaranteed_prize(9), 1_000);
        assert_eq!(rules.guaranteed_prize(10), 32_000);
        assert_eq!(rules.guaranteed_prize(12), 32_000);
        assert_eq!(rules.guaranteed_prize(13), 250_000);
        assert_eq!(rules.guaranteed_prize(14), 250_000);
    }

    #[test]
    fn safe_haven_membership_is_one_indexed() {
        let rules = GameRules::default();
        assert!(rules.is_safe_haven(5));
        assert!(rules.is_safe_haven(10));
        assert!(rules.is_safe_haven(13));
        assert!(!rules.is_safe_haven(4));
        assert!(!rules.is_safe_haven(15));
    }

    #[test]
    fn mismatched_ladder_is_rejected() {
        let mut config = AppConfig::default();
        config.rules.prize_ladder.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"rules": {"countdown_seconds": 45}, "pacing": {"answer_select_ms": 0}}"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.rules().countdown_seconds, 45);
        assert_eq!(config.rules().question_count, 15);
        assert_eq!(config.pacing().answer_select, Duration::ZERO);
        assert_eq!(config.pacing().answer_reveal, Duration::from_millis(2_000));
    }
}
