//! Configuration file support for Pathways
//!
//! Loads district-specific lookup tables and fixed time anchors from JSON.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.pathwaysrc.json` in the working directory
//! 3. `pathways.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::recommend::MAX_RECOMMENDATIONS;
use crate::tables::{CategoryMap, ScoringPolicy, DAEP_CONSEQUENCE};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Most remediation categories a single offense category may map to
const MAX_MAPPED_CATEGORIES: usize = 3;

/// Pathways configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathwaysConfig {
    /// Consequence types counted as extended placement (default: ["daep"])
    #[serde(default)]
    pub extended_placement_consequences: Option<Vec<String>>,

    /// Per-offense-category overrides of the remediation category map
    #[serde(default)]
    pub category_map: BTreeMap<String, Vec<String>>,

    /// Remediation categories used for unmapped offense categories
    #[serde(default)]
    pub fallback_categories: Option<Vec<String>>,

    /// Number of recommendations to return (default: 5, maximum: 5)
    #[serde(default)]
    pub top: Option<usize>,

    /// Fixed reference time for reproducible runs (RFC 3339)
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,

    /// Fixed school-year start (default: August 1 of the current academic year)
    #[serde(default)]
    pub school_year_start: Option<NaiveDate>,
}

/// Resolved configuration with lookup tables built
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub policy: ScoringPolicy,
    pub category_map: CategoryMap,
    pub top_n: usize,
    pub reference_time: Option<DateTime<Utc>>,
    pub school_year_start: Option<NaiveDate>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl PathwaysConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref consequences) = self.extended_placement_consequences {
            if consequences.is_empty() {
                anyhow::bail!("extended_placement_consequences must not be empty");
            }
            if consequences.iter().any(|c| c.trim().is_empty()) {
                anyhow::bail!("extended_placement_consequences must not contain blank values");
            }
        }

        for (offense, targets) in &self.category_map {
            if offense.trim().is_empty() {
                anyhow::bail!("category_map keys must not be blank");
            }
            validate_categories(&format!("category_map.{}", offense), targets)?;
        }

        if let Some(ref fallback) = self.fallback_categories {
            validate_categories("fallback_categories", fallback)?;
        }

        if let Some(top) = self.top {
            if top == 0 || top > MAX_RECOMMENDATIONS {
                anyhow::bail!(
                    "top must be between 1 and {} (got {})",
                    MAX_RECOMMENDATIONS,
                    top
                );
            }
        }

        if let (Some(reference), Some(start)) = (self.reference_time, self.school_year_start) {
            if start > reference.date_naive() {
                anyhow::bail!(
                    "school_year_start ({}) must not be after reference_time ({})",
                    start,
                    reference
                );
            }
        }

        Ok(())
    }

    /// Resolve config into the tables the engine consumes
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let policy = ScoringPolicy {
            extended_placement_consequences: self
                .extended_placement_consequences
                .clone()
                .unwrap_or_else(|| vec![DAEP_CONSEQUENCE.to_string()]),
        };
        let category_map =
            CategoryMap::with_overrides(&self.category_map, self.fallback_categories.as_deref());

        Ok(ResolvedConfig {
            policy,
            category_map,
            top_n: self.top.unwrap_or(MAX_RECOMMENDATIONS),
            reference_time: self.reference_time,
            school_year_start: self.school_year_start,
            config_path: None,
        })
    }
}

fn validate_categories(field: &str, targets: &[String]) -> Result<()> {
    if targets.is_empty() || targets.len() > MAX_MAPPED_CATEGORIES {
        anyhow::bail!(
            "{} must list between 1 and {} categories (got {})",
            field,
            MAX_MAPPED_CATEGORIES,
            targets.len()
        );
    }
    if targets.iter().any(|t| t.trim().is_empty()) {
        anyhow::bail!("{} must not contain blank categories", field);
    }
    Ok(())
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        PathwaysConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.pathwaysrc.json`
/// 2. `pathways.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(PathwaysConfig, PathBuf)>> {
    for name in [".pathwaysrc.json", "pathways.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<PathwaysConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: PathwaysConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (PathwaysConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
