use std::io::IsTerminal;

use crate::format::LoggerFormat;

/// HTTP client internals are chatty at `debug`; keep them at `warn` unless
/// the caller names them explicitly.
const QUIET_DEPS: &[&str] = &["hyper_util=warn", "reqwest=warn", "h2=warn"];

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `lora_core=debug,info`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
    /// Syslog identifier for journald output.
    pub identifier: String,
}

impl LoggerConfig {
    pub fn new(format: LoggerFormat, level: impl Into<String>) -> Self {
        Self {
            format,
            level: level.into(),
            ..Self::default()
        }
    }

    /// Filter directive handed to `EnvFilter`, with dependency noise muted.
    pub fn directive(&self) -> String {
        let level = self.level.trim();
        let mut out = if level.is_empty() {
            "info".to_string()
        } else {
            level.to_string()
        };
        for dep in QUIET_DEPS {
            let target = dep.split('=').next().unwrap_or_default();
            if !out.contains(target) {
                out.push(',');
                out.push_str(dep);
            }
        }
        out
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
            identifier: "lora-agentd".to_string(),
        }
    }
}
