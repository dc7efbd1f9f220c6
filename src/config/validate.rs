// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::Glob;

use crate::config::model::{
    CompletionSection, ConfigFile, DiagnosticsSection, DiagnosticsSettings, DispatchSettings,
    LimitsSection, PathsSection, RawConfigFile, ScriptsSection,
};
use crate::errors::{Result, WildfireError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WildfireError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_limits(&raw.limits)?;
        validate_completion(&raw.completion)?;
        let diagnostics = validate_diagnostics(&raw.diagnostics)?;
        let step_timeout = raw
            .dispatch
            .step_timeout
            .as_deref()
            .map(|s| parse_duration(s).map_err(|e| config_error("[dispatch].step_timeout", e)))
            .transpose()?;
        if step_timeout == Some(Duration::ZERO) {
            return Err(WildfireError::ConfigError(
                "[dispatch].step_timeout must be greater than zero".to_string(),
            ));
        }
        if raw.archive.prefix.trim().is_empty() {
            return Err(WildfireError::ConfigError(
                "[archive].prefix must not be empty".to_string(),
            ));
        }

        let paths = resolve_paths(raw.paths)?;
        let scripts = resolve_scripts(raw.scripts, &paths.home_dir);

        Ok(ConfigFile::new_unchecked(
            paths,
            scripts,
            raw.limits,
            raw.completion,
            diagnostics,
            DispatchSettings { step_timeout },
            raw.archive,
        ))
    }
}

/// Parse a duration with a unit suffix: `ms`, `s`, `m` or `h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

fn config_error(field: &str, msg: String) -> WildfireError {
    WildfireError::ConfigError(format!("{field}: {msg}"))
}

fn validate_limits(limits: &LimitsSection) -> Result<()> {
    for (name, value) in [
        ("max_workers", limits.max_workers),
        ("max_fires", limits.max_fires),
        ("max_days", limits.max_days),
    ] {
        if value == 0 {
            return Err(WildfireError::ConfigError(format!(
                "[limits].{name} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

fn validate_completion(completion: &CompletionSection) -> Result<()> {
    for (name, value) in [
        ("grid_threshold", completion.grid_threshold),
        ("day_threshold", completion.day_threshold),
    ] {
        if value == 0 {
            return Err(WildfireError::ConfigError(format!(
                "[completion].{name} must be >= 1 (got 0)"
            )));
        }
    }

    for (name, pattern) in [
        ("grid_pattern", &completion.grid_pattern),
        ("day_pattern", &completion.day_pattern),
    ] {
        Glob::new(pattern).map_err(|e| {
            WildfireError::ConfigError(format!(
                "[completion].{name} is not a valid glob '{pattern}': {e}"
            ))
        })?;
    }
    Ok(())
}

fn validate_diagnostics(raw: &DiagnosticsSection) -> Result<DiagnosticsSettings> {
    if raw.log_tail_lines == 0 {
        return Err(WildfireError::ConfigError(
            "[diagnostics].log_tail_lines must be >= 1 (got 0)".to_string(),
        ));
    }

    for (name, markers) in [
        ("upstream_markers", &raw.upstream_markers),
        ("main_routine_markers", &raw.main_routine_markers),
    ] {
        if markers.is_empty() || markers.iter().any(|m| m.trim().is_empty()) {
            return Err(WildfireError::ConfigError(format!(
                "[diagnostics].{name} must contain at least one non-empty marker"
            )));
        }
    }

    let settle_delay = parse_duration(&raw.settle_delay)
        .map_err(|e| config_error("[diagnostics].settle_delay", e))?;

    Ok(DiagnosticsSettings {
        log_tail_lines: raw.log_tail_lines,
        settle_delay,
        upstream_markers: raw.upstream_markers.clone(),
        main_routine_markers: raw.main_routine_markers.clone(),
    })
}

fn resolve(home: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        home.join(path)
    }
}

/// `home_dir` is made absolute against the working directory before
/// anything is joined onto it.
fn resolve_paths(raw: PathsSection) -> Result<PathsSection> {
    let home = std::path::absolute(&raw.home_dir).map_err(|e| {
        WildfireError::ConfigError(format!(
            "[paths].home_dir {} cannot be made absolute: {e}",
            raw.home_dir.display()
        ))
    })?;
    Ok(PathsSection {
        scratch_dir: resolve(&home, raw.scratch_dir),
        data_dir: resolve(&home, raw.data_dir),
        fires_csv: resolve(&home, raw.fires_csv),
        filtered_csv: resolve(&home, raw.filtered_csv),
        archive_dir: resolve(&home, raw.archive_dir),
        home_dir: home,
    })
}

fn resolve_scripts(raw: ScriptsSection, home: &Path) -> ScriptsSection {
    ScriptsSection {
        shell: raw.shell,
        run: resolve(home, raw.run),
        test: resolve(home, raw.test),
    }
}
