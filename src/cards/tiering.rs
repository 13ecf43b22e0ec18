//! Card tiering and file heat. `heat_score` is an exponential moving
//! average over recent `card_interactions`, bounded to `[0, 1]`,
//! recomputed on each `usage_count` increment.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTier {
    Premium,
    Standard,
    Structural,
}

impl CardTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardTier::Premium => "premium",
            CardTier::Standard => "standard",
            CardTier::Structural => "structural",
        }
    }
}

/// `heat` = mean `heat_score` of a flow's files; a file with no recorded
/// heat counts as 0.
pub fn flow_heat(file_heats: &[Option<f64>]) -> f64 {
    if file_heats.is_empty() {
        return 0.0;
    }
    let sum: f64 = file_heats.iter().map(|h| h.unwrap_or(0.0)).sum();
    sum / file_heats.len() as f64
}

pub fn card_tier(heat: f64) -> CardTier {
    if heat > 0.6 {
        CardTier::Premium
    } else if heat > 0.3 {
        CardTier::Standard
    } else {
        CardTier::Structural
    }
}

/// Bounded EMA update for a file's `heat_score`, applied every time a
/// card touching that file is used (`usage_count` increments). `alpha`
/// controls how quickly heat responds to fresh interactions; 0.3 weighs
/// the newest interaction meaningfully without discarding history.
pub fn update_heat_score(previous: Option<f64>, interaction_signal: f64, alpha: f64) -> f64 {
    let prev = previous.unwrap_or(0.0);
    (prev * (1.0 - alpha) + interaction_signal * alpha).clamp(0.0, 1.0)
}

pub const HEAT_EMA_ALPHA: f64 = 0.3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(card_tier(0.9), CardTier::Premium);
        assert_eq!(card_tier(0.6), CardTier::Standard);
        assert_eq!(card_tier(0.31), CardTier::Standard);
        assert_eq!(card_tier(0.3), CardTier::Structural);
        assert_eq!(card_tier(0.0), CardTier::Structural);
    }

    #[test]
    fn missing_heat_counts_as_zero() {
        let heats = vec![Some(1.0), None, Some(1.0)];
        assert!((flow_heat(&heats) - 0.6667).abs() < 0.001);
    }

    #[test]
    fn ema_stays_bounded() {
        let mut heat = None;
        for _ in 0..20 {
            heat = Some(update_heat_score(heat, 1.0, HEAT_EMA_ALPHA));
        }
        assert!(heat.unwrap() <= 1.0);
        assert!(heat.unwrap() > 0.9);
    }
}
