use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub data: DataConfig,
    pub report: ReportConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STUDIO_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STUDIO_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            data: DataConfig::from_env_profiled(p),
            report: ReportConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  data:    dir={}", self.data.data_dir.display());
        tracing::info!(
            "  report:  top_n={}, repeat_canceller_min={}, lead_basis={}",
            self.report.top_n,
            self.report.repeat_canceller_min,
            self.report.lead_conversion_basis
        );
    }
}

// ── Data files ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub sales_file: String,
    pub sessions_file: String,
    pub leads_file: String,
    pub clients_file: String,
    pub cancellations_file: String,
    pub payroll_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sales_file: "sales.json".to_string(),
            sessions_file: "sessions.json".to_string(),
            leads_file: "leads.json".to_string(),
            clients_file: "clients.json".to_string(),
            cancellations_file: "late_cancellations.json".to_string(),
            payroll_file: "payroll.json".to_string(),
        }
    }
}

impl DataConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            sales_file: profiled_env_or(p, "SALES_FILE", &d.sales_file),
            sessions_file: profiled_env_or(p, "SESSIONS_FILE", &d.sessions_file),
            leads_file: profiled_env_or(p, "LEADS_FILE", &d.leads_file),
            clients_file: profiled_env_or(p, "CLIENTS_FILE", &d.clients_file),
            cancellations_file: profiled_env_or(p, "CANCELLATIONS_FILE", &d.cancellations_file),
            payroll_file: profiled_env_or(p, "PAYROLL_FILE", &d.payroll_file),
        }
    }
}

// ── Report defaults ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows kept by leaderboard views.
    pub top_n: usize,
    /// Late cancellations needed to show up as a repeat canceller.
    pub repeat_canceller_min: usize,
    /// "total-leads" or "trials-completed".
    pub lead_conversion_basis: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            repeat_canceller_min: 3,
            lead_conversion_basis: "total-leads".to_string(),
        }
    }
}

impl ReportConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            top_n: profiled_env_usize(p, "REPORT_TOP_N", 10),
            repeat_canceller_min: profiled_env_usize(p, "REPEAT_CANCELLER_MIN", 3),
            lead_conversion_basis: profiled_env_or(p, "LEAD_CONVERSION_BASIS", "total-leads"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global, so each test uses its own profile prefix.

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("CFGTESTA_REPORT_TOP_N", "25");
        let cfg = Config::for_profile("cfgtesta");
        assert_eq!(cfg.profile, "CFGTESTA");
        assert_eq!(cfg.report.top_n, 25);
        env::remove_var("CFGTESTA_REPORT_TOP_N");
    }

    #[test]
    fn unparseable_numbers_fall_back_to_default() {
        env::set_var("CFGTESTB_REPEAT_CANCELLER_MIN", "lots");
        let cfg = Config::for_profile("cfgtestb");
        assert_eq!(cfg.report.repeat_canceller_min, 3);
        env::remove_var("CFGTESTB_REPEAT_CANCELLER_MIN");
    }

    #[test]
    fn data_file_override() {
        env::set_var("CFGTESTC_PAYROLL_FILE", "payroll_2024.json");
        let cfg = Config::for_profile("cfgtestc");
        assert_eq!(cfg.data.payroll_file, "payroll_2024.json");
        env::remove_var("CFGTESTC_PAYROLL_FILE");
    }

    #[test]
    fn default_profile_label() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
    }
}
