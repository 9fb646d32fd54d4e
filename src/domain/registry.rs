//! Strategy profile registry.
//!
//! Built in two phases: a mutable [`StrategyRegistry`] accepts and validates
//! profiles, then [`StrategyRegistry::freeze`] hands back a read-only
//! [`FrozenRegistry`] for lookups. Parameters are declared up front so a bad
//! default is rejected when the profile is registered.

use crate::domain::error::TradeAuditError;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

const BATCH_PREFIX: &str = "backtests_details_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Bool(_) => ParamKind::Bool,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub key: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParamSpec {
    pub fn float(key: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            key: key.to_string(),
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn int(key: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            key: key.to_string(),
            kind: ParamKind::Int,
            default: ParamValue::Int(default),
            min: Some(min as f64),
            max: Some(max as f64),
        }
    }

    pub fn flag(key: &str, default: bool) -> Self {
        Self {
            key: key.to_string(),
            kind: ParamKind::Bool,
            default: ParamValue::Bool(default),
            min: None,
            max: None,
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("parameter key must not be empty".into());
        }
        if self.default.kind() != self.kind {
            return Err(format!(
                "parameter {}: default {} does not match declared kind {:?}",
                self.key, self.default, self.kind
            ));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("parameter {}: min {min} exceeds max {max}", self.key));
            }
        }
        if let Some(v) = self.default.as_f64() {
            let below = self.min.is_some_and(|min| v < min);
            let above = self.max.is_some_and(|max| v > max);
            if below || above {
                return Err(format!(
                    "parameter {}: default {} outside [{}, {}]",
                    self.key,
                    self.default,
                    self.min.map_or("-inf".to_string(), |m| m.to_string()),
                    self.max.map_or("inf".to_string(), |m| m.to_string()),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyProfile {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

/// Registry in its build phase.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<String, StrategyProfile>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, profile: StrategyProfile) -> Result<(), TradeAuditError> {
        validate_profile(&profile).map_err(|reason| TradeAuditError::Registry { reason })?;
        if self.entries.contains_key(&profile.name) {
            return Err(TradeAuditError::Registry {
                reason: format!("strategy '{}' is already registered", profile.name),
            });
        }
        self.entries.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn freeze(self) -> FrozenRegistry {
        FrozenRegistry {
            entries: self.entries,
        }
    }
}

/// Read-only registry.
#[derive(Debug, Clone, Default)]
pub struct FrozenRegistry {
    entries: BTreeMap<String, StrategyProfile>,
}

impl FrozenRegistry {
    pub fn get(&self, name: &str) -> Option<&StrategyProfile> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyProfile> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the strategy a `backtests_details_<strategy>_...csv` batch belongs to.
    ///
    /// The longest registered name wins so `box_wedge` is not mistaken for a
    /// hypothetical `box`.
    pub fn resolve_batch(&self, batch_name: &str) -> Option<&StrategyProfile> {
        let stem = batch_name.strip_suffix(".csv").unwrap_or(batch_name);
        let rest = stem.strip_prefix(BATCH_PREFIX)?;
        self.entries
            .values()
            .filter(|p| {
                rest.strip_prefix(p.name.as_str())
                    .is_some_and(|tail| tail.is_empty() || tail.starts_with('_'))
            })
            .max_by_key(|p| p.name.len())
    }
}

fn validate_profile(profile: &StrategyProfile) -> Result<(), String> {
    let name = &profile.name;
    if name.is_empty() {
        return Err("strategy name must not be empty".into());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(format!(
            "strategy name '{name}' must be lowercase letters, digits, or underscores"
        ));
    }
    let mut seen = HashSet::new();
    for param in &profile.params {
        param.check().map_err(|e| format!("{name}: {e}"))?;
        if !seen.insert(param.key.as_str()) {
            return Err(format!("{name}: duplicate parameter {}", param.key));
        }
    }
    Ok(())
}

/// Strategies shipped with the backtester.
pub fn default_registry() -> Result<FrozenRegistry, TradeAuditError> {
    let mut registry = StrategyRegistry::new();
    registry.register(StrategyProfile {
        name: "buy_the_dip".into(),
        display_name: "Buy The Dip".into(),
        description: "Buys after an intraday drop from the recent high, exits on target, stop, or hold limit".into(),
        params: vec![
            ParamSpec::float("dip_threshold", 1.0, 0.0, 100.0),
            ParamSpec::float("take_profit", 1.0, 0.0, 100.0),
            ParamSpec::float("stop_loss", 0.5, 0.0, 100.0),
            ParamSpec::int("hold_days", 2, 1, 365),
            ParamSpec::float("position_size", 10.0, 0.0, 100.0),
        ],
    })?;
    registry.register(StrategyProfile {
        name: "momentum".into(),
        display_name: "Momentum".into(),
        description: "Enters on strong trailing returns over a lookback window".into(),
        params: vec![
            ParamSpec::int("lookback", 20, 1, 500),
            ParamSpec::float("momentum_threshold", 5.0, 0.0, 100.0),
            ParamSpec::float("take_profit", 3.0, 0.0, 100.0),
            ParamSpec::float("stop_loss", 1.5, 0.0, 100.0),
        ],
    })?;
    registry.register(StrategyProfile {
        name: "vix".into(),
        display_name: "VIX Fear Index".into(),
        description: "Buys when volatility spikes above a threshold".into(),
        params: vec![
            ParamSpec::float("vix_threshold", 20.0, 0.0, 200.0),
            ParamSpec::flag("hold_overnight", true),
        ],
    })?;
    registry.register(StrategyProfile {
        name: "box_wedge".into(),
        display_name: "Box Wedge".into(),
        description: "Trades breakouts from consolidation ranges".into(),
        params: vec![
            ParamSpec::int("lookback", 30, 5, 500),
            ParamSpec::float("breakout_pct", 1.0, 0.0, 100.0),
            ParamSpec::float("take_profit", 2.0, 0.0, 100.0),
            ParamSpec::float("stop_loss", 1.0, 0.0, 100.0),
        ],
    })?;
    Ok(registry.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> StrategyProfile {
        StrategyProfile {
            name: name.into(),
            display_name: name.to_uppercase(),
            description: String::new(),
            params: vec![ParamSpec::float("take_profit", 1.0, 0.0, 10.0)],
        }
    }

    #[test]
    fn register_freeze_query() {
        let mut reg = StrategyRegistry::new();
        reg.register(profile("alpha")).unwrap();
        reg.register(profile("beta")).unwrap();
        let frozen = reg.freeze();

        assert_eq!(frozen.len(), 2);
        assert_eq!(frozen.names(), vec!["alpha", "beta"]);
        assert_eq!(frozen.get("beta").unwrap().display_name, "BETA");
        assert!(frozen.get("gamma").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut reg = StrategyRegistry::new();
        reg.register(profile("alpha")).unwrap();
        let err = reg.register(profile("alpha")).unwrap_err();
        assert!(matches!(err, TradeAuditError::Registry { .. }));
    }

    #[test]
    fn bad_names_rejected() {
        let mut reg = StrategyRegistry::new();
        assert!(reg.register(profile("")).is_err());
        assert!(reg.register(profile("Buy Dip")).is_err());
    }

    #[test]
    fn default_out_of_range_rejected() {
        let mut reg = StrategyRegistry::new();
        let mut p = profile("alpha");
        p.params = vec![ParamSpec::float("stop_loss", 150.0, 0.0, 100.0)];
        let err = reg.register(p).unwrap_err();
        assert!(err.to_string().contains("outside [0, 100]"));
    }

    #[test]
    fn kind_mismatch_rejected() {
        let mut reg = StrategyRegistry::new();
        let mut p = profile("alpha");
        p.params = vec![ParamSpec {
            default: ParamValue::Bool(true),
            ..ParamSpec::int("lookback", 5, 1, 10)
        }];
        assert!(reg.register(p).is_err());
    }

    #[test]
    fn duplicate_param_rejected() {
        let mut reg = StrategyRegistry::new();
        let mut p = profile("alpha");
        p.params.push(ParamSpec::float("take_profit", 2.0, 0.0, 10.0));
        let err = reg.register(p).unwrap_err();
        assert!(err.to_string().contains("duplicate parameter take_profit"));
    }

    #[test]
    fn inverted_range_rejected() {
        let mut reg = StrategyRegistry::new();
        let mut p = profile("alpha");
        p.params = vec![ParamSpec::int("lookback", 5, 10, 1)];
        assert!(reg.register(p).is_err());
    }

    #[test]
    fn default_registry_is_valid() {
        let reg = default_registry().unwrap();
        assert_eq!(reg.names(), vec!["box_wedge", "buy_the_dip", "momentum", "vix"]);
        let dip = reg.get("buy_the_dip").unwrap();
        let hold = dip.params.iter().find(|p| p.key == "hold_days").unwrap();
        assert_eq!(hold.default, ParamValue::Int(2));
    }

    #[test]
    fn resolves_batch_names() {
        let reg = default_registry().unwrap();
        let p = reg
            .resolve_batch("backtests_details_buy_the_dip_AAPL_20240101.csv")
            .unwrap();
        assert_eq!(p.name, "buy_the_dip");
        assert_eq!(
            reg.resolve_batch("backtests_details_vix.csv").unwrap().name,
            "vix"
        );
        assert!(reg.resolve_batch("backtests_details_vixen.csv").is_none());
        assert!(reg.resolve_batch("trades_momentum.csv").is_none());
    }

    #[test]
    fn longest_name_wins() {
        let mut reg = StrategyRegistry::new();
        reg.register(profile("box")).unwrap();
        reg.register(profile("box_wedge")).unwrap();
        let frozen = reg.freeze();
        assert_eq!(
            frozen
                .resolve_batch("backtests_details_box_wedge_SPY.csv")
                .unwrap()
                .name,
            "box_wedge"
        );
        assert_eq!(
            frozen.resolve_batch("backtests_details_box_SPY.csv").unwrap().name,
            "box"
        );
    }
}
