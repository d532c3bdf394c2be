//! Reward policy: the boundary between investor actions and bandit rewards.

use venture_core::config::RewardConfig;
use venture_core::types::Action;

/// Maps feedback actions to rewards and back.
pub trait RewardPolicy: Send + Sync {
    fn reward_for(&self, action: Action) -> f64;

    /// The action recorded in the interaction log for a numeric reward.
    fn action_for(&self, reward: f64) -> Action {
        if reward > 0.0 {
            Action::Invest
        } else {
            Action::Pass
        }
    }
}

/// Fixed reward per action; invest = 1, pass = 0 by default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryRewardPolicy {
    invest: f64,
    pass: f64,
}

impl BinaryRewardPolicy {
    pub fn new(invest: f64, pass: f64) -> Self {
        Self { invest, pass }
    }

    pub fn from_config(config: &RewardConfig) -> Self {
        Self::new(config.invest, config.pass)
    }
}

impl Default for BinaryRewardPolicy {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl RewardPolicy for BinaryRewardPolicy {
    fn reward_for(&self, action: Action) -> f64 {
        match action {
            Action::Invest => self.invest,
            Action::Pass => self.pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let policy = BinaryRewardPolicy::default();
        assert_eq!(policy.reward_for(Action::Invest), 1.0);
        assert_eq!(policy.reward_for(Action::Pass), 0.0);
        assert_eq!(policy.action_for(1.0), Action::Invest);
        assert_eq!(policy.action_for(0.0), Action::Pass);
        assert_eq!(policy.action_for(-0.5), Action::Pass);
    }

    #[test]
    fn test_configured_mapping() {
        let policy = BinaryRewardPolicy::from_config(&RewardConfig {
            invest: 2.5,
            pass: -0.25,
        });
        assert_eq!(policy.reward_for(Action::Invest), 2.5);
        assert_eq!(policy.reward_for(Action::Pass), -0.25);
    }
}
