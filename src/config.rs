//! Application-level configuration: scoring constants, auth settings, and the
//! data file locations, all overridable through the environment.

use std::{env, fmt::Debug, path::PathBuf, str::FromStr};

use tracing::warn;

/// Default location on disk where the server looks for the team roster.
const DEFAULT_TEAMS_PATH: &str = "config/teams.json";
/// Default location on disk where the server looks for the question bank.
const DEFAULT_QUESTIONS_PATH: &str = "config/questions.json";

/// Scoring and timing constants applied to every round.
#[derive(Debug, Clone)]
pub struct GameRules {
    /// Score every team starts the session with.
    pub initial_score: i32,
    /// Signed delta for a correct answer.
    pub correct_points: i32,
    /// Signed delta for an incorrect (or missing) answer.
    pub wrong_points: i32,
    /// Signed delta applied to each domino chain target.
    pub domino_penalty: i32,
    /// Number of incorrect teams at which the crisis rule fires.
    pub crisis_threshold: usize,
    /// Signed delta applied to every team during a crisis.
    pub crisis_penalty: i32,
    /// Floor no score may drop below.
    pub min_score: i32,
    /// Answer window length in seconds.
    pub round_duration_secs: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            initial_score: 15,
            correct_points: 2,
            wrong_points: -2,
            domino_penalty: -1,
            crisis_threshold: 5,
            crisis_penalty: -2,
            min_score: 0,
            round_duration_secs: 30,
        }
    }
}

impl GameRules {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            initial_score: env_parsed("INITIAL_SCORE", defaults.initial_score),
            correct_points: env_parsed("CORRECT_POINTS", defaults.correct_points),
            wrong_points: env_parsed("WRONG_POINTS", defaults.wrong_points),
            domino_penalty: env_parsed("DOMINO_PENALTY", defaults.domino_penalty),
            crisis_threshold: env_parsed("CRISIS_THRESHOLD", defaults.crisis_threshold),
            crisis_penalty: env_parsed("CRISIS_PENALTY", defaults.crisis_penalty),
            min_score: env_parsed("MIN_SCORE", defaults.min_score),
            round_duration_secs: env_parsed("ROUND_DURATION", defaults.round_duration_secs),
        }
    }
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Scoring and timing constants.
    pub rules: GameRules,
    /// HS256 secret used to sign and verify bearer tokens.
    pub session_secret: String,
    /// Username accepted by the admin login route.
    pub admin_username: String,
    /// Password accepted by the admin login route.
    pub admin_password: String,
    /// Google OAuth client id; Google login is refused when unset.
    pub google_client_id: Option<String>,
    /// Whether the demo login route is enabled.
    pub test_mode: bool,
    /// Location of the team roster file.
    pub teams_path: PathBuf,
    /// Location of the question bank file.
    pub questions_path: PathBuf,
}

impl AppConfig {
    /// Resolve the configuration from the environment, falling back to
    /// built-in defaults for anything unset.
    pub fn load() -> Self {
        let session_secret = env::var("SESSION_SECRET").unwrap_or_else(|_| {
            warn!("SESSION_SECRET not set; using the development default");
            "default-secret".into()
        });

        Self {
            rules: GameRules::from_env(),
            session_secret,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into()),
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|id| !id.is_empty()),
            test_mode: env::var("TEST_MODE").is_ok_and(|value| value == "true"),
            teams_path: env_path("TEAMS_PATH", DEFAULT_TEAMS_PATH),
            questions_path: env_path("QUESTIONS_PATH", DEFAULT_QUESTIONS_PATH),
        }
    }
}

/// Parse an environment variable, keeping `default` on absence or bad input.
fn env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr + Debug,
{
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw = %raw, default = ?default, "unparseable value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var_os(key)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(default))
}
