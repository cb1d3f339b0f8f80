use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub subject: SubjectConfig,
}

/// 片脚しか検出できないフレームの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegFallback {
    /// 有効な片脚の角度をそのまま使う
    #[default]
    SingleLeg,
    /// 両脚そろわないフレームはスキップ
    SkipFrame,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterConfig {
    /// しゃがみ判定の目標膝角度（度）
    #[serde(default = "default_target_angle")]
    pub target_angle: f32,
    /// 目標角度からの許容幅（度）
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// 立ち上がり判定の膝角度（度）。この値以上で1レップ完了
    #[serde(default = "default_stand_angle")]
    pub stand_angle: f32,
    /// 関節を有効とみなす信頼度閾値
    #[serde(default = "default_joint_confidence")]
    pub joint_confidence: f32,
    #[serde(default)]
    pub leg_fallback: LegFallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectConfig {
    /// 追跡対象のクラスラベル
    #[serde(default = "default_label")]
    pub label: String,
    /// 検出スコア閾値
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_target_angle() -> f32 { 90.0 }
fn default_tolerance() -> f32 { 10.0 }
fn default_stand_angle() -> f32 { 140.0 }
fn default_joint_confidence() -> f32 { 0.1 }
fn default_label() -> String { "person".to_string() }
fn default_min_score() -> f32 { 0.6 }

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            target_angle: default_target_angle(),
            tolerance: default_tolerance(),
            stand_angle: default_stand_angle(),
            joint_confidence: default_joint_confidence(),
            leg_fallback: LegFallback::default(),
        }
    }
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            min_score: default_min_score(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込みに失敗したらデフォルト設定を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "using default config");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.counter;
        if !c.tolerance.is_finite() || c.tolerance < 0.0 {
            bail!("counter.tolerance must be a finite value >= 0 (got {})", c.tolerance);
        }
        for (name, value) in [("target_angle", c.target_angle), ("stand_angle", c.stand_angle)] {
            if !(0.0..=180.0).contains(&value) {
                bail!("counter.{} must be within [0, 180] (got {})", name, value);
            }
        }
        // 90°と140°の間の不感帯がないとチャタリングする
        if c.stand_angle <= c.target_angle + c.tolerance {
            bail!(
                "counter.stand_angle ({}) must exceed target_angle + tolerance ({})",
                c.stand_angle,
                c.target_angle + c.tolerance
            );
        }
        if !(0.0..=1.0).contains(&c.joint_confidence) {
            bail!("counter.joint_confidence must be within [0, 1] (got {})", c.joint_confidence);
        }
        if !(0.0..=1.0).contains(&self.subject.min_score) {
            bail!("subject.min_score must be within [0, 1] (got {})", self.subject.min_score);
        }
        Ok(())
    }
}
