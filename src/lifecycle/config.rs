use std::time::Duration;

use crate::domain::order::OrderStatus;
use crate::utils::RetryConfig;

pub const ENV_COOKING_DELAY: &str = "ORDER_COOKING_DELAY_SECS";
pub const ENV_OUT_FOR_DELIVERY_DELAY: &str = "ORDER_OUT_FOR_DELIVERY_DELAY_SECS";
pub const ENV_DELIVERED_DELAY: &str = "ORDER_DELIVERED_DELAY_SECS";
pub const ENV_ADVANCE_MAX_ATTEMPTS: &str = "ORDER_ADVANCE_MAX_ATTEMPTS";

/// Longest accepted transition delay.
pub const MAX_TRANSITION_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error(
        "Transition delays must be strictly increasing \
         (cooking {cooking:?}, out for delivery {out_for_delivery:?}, delivered {delivered:?})"
    )]
    NotIncreasing {
        cooking: Duration,
        out_for_delivery: Duration,
        delivered: Duration,
    },

    #[error("Transition delay {delay:?} exceeds the {max:?} ceiling")]
    DelayTooLong { delay: Duration, max: Duration },
}

/// Timing and policy for the automatic status advance.
///
/// All three delays are measured from placement.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub cooking_after: Duration,
    pub out_for_delivery_after: Duration,
    pub delivered_after: Duration,
    /// Policy for a scheduled advance whose store write fails.
    pub advance_retry: RetryConfig,
    /// Buffer size of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cooking_after: Duration::from_secs(60),
            out_for_delivery_after: Duration::from_secs(3 * 60),
            delivered_after: Duration::from_secs(6 * 60),
            advance_retry: RetryConfig::fire_once(),
            event_capacity: 256,
        }
    }
}

impl LifecycleConfig {
    pub fn with_delays(
        mut self,
        cooking_after: Duration,
        out_for_delivery_after: Duration,
        delivered_after: Duration,
    ) -> Self {
        self.cooking_after = cooking_after;
        self.out_for_delivery_after = out_for_delivery_after;
        self.delivered_after = delivered_after;
        self
    }

    pub fn with_advance_retry(mut self, retry: RetryConfig) -> Self {
        self.advance_retry = retry;
        self
    }

    /// Load from `ORDER_*` environment variables, defaulting what is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            cooking_after: secs(&lookup, ENV_COOKING_DELAY, defaults.cooking_after)?,
            out_for_delivery_after: secs(
                &lookup,
                ENV_OUT_FOR_DELIVERY_DELAY,
                defaults.out_for_delivery_after,
            )?,
            delivered_after: secs(&lookup, ENV_DELIVERED_DELAY, defaults.delivered_after)?,
            advance_retry: match lookup(ENV_ADVANCE_MAX_ATTEMPTS) {
                Some(raw) => {
                    let attempts = parse::<u32>(ENV_ADVANCE_MAX_ATTEMPTS, &raw)?;
                    defaults.advance_retry.clone().with_max_attempts(attempts)
                }
                None => defaults.advance_retry.clone(),
            },
            event_capacity: defaults.event_capacity,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cooking_after < self.out_for_delivery_after
            && self.out_for_delivery_after < self.delivered_after)
        {
            return Err(ConfigError::NotIncreasing {
                cooking: self.cooking_after,
                out_for_delivery: self.out_for_delivery_after,
                delivered: self.delivered_after,
            });
        }

        if self.delivered_after > MAX_TRANSITION_DELAY {
            return Err(ConfigError::DelayTooLong {
                delay: self.delivered_after,
                max: MAX_TRANSITION_DELAY,
            });
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "event_capacity".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    /// The three scheduled transitions, in firing order.
    pub fn schedule(&self) -> [(Duration, OrderStatus); 3] {
        [
            (self.cooking_after, OrderStatus::Cooking),
            (self.out_for_delivery_after, OrderStatus::OutForDelivery),
            (self.delivered_after, OrderStatus::Delivered),
        ]
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    let delay = Duration::from_secs(parse::<u64>(key, &raw)?);
    if delay > MAX_TRANSITION_DELAY {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        });
    }

    Ok(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_follow_one_three_six_minutes() {
        let config = LifecycleConfig::default();

        assert_eq!(config.cooking_after, Duration::from_secs(60));
        assert_eq!(config.out_for_delivery_after, Duration::from_secs(180));
        assert_eq!(config.delivered_after, Duration::from_secs(360));
        assert_eq!(config.advance_retry.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides_and_defaults() {
        let config = LifecycleConfig::from_lookup(lookup_from(&[
            (ENV_COOKING_DELAY, "5"),
            (ENV_ADVANCE_MAX_ATTEMPTS, "3"),
        ]))
        .unwrap();

        assert_eq!(config.cooking_after, Duration::from_secs(5));
        assert_eq!(config.out_for_delivery_after, Duration::from_secs(180));
        assert_eq!(config.advance_retry.max_attempts, 3);
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let err = LifecycleConfig::from_lookup(lookup_from(&[(ENV_DELIVERED_DELAY, "soon")]))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_DELIVERED_DELAY.to_string(),
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn test_delay_above_ceiling_is_rejected() {
        let err = LifecycleConfig::from_lookup(lookup_from(&[(
            ENV_DELIVERED_DELAY,
            "18446744073709551615",
        )]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_DELIVERED_DELAY.to_string(),
                value: "18446744073709551615".to_string(),
            }
        );

        let at_ceiling = MAX_TRANSITION_DELAY.as_secs().to_string();
        let config =
            LifecycleConfig::from_lookup(lookup_from(&[(ENV_DELIVERED_DELAY, at_ceiling.as_str())]))
                .unwrap();
        assert_eq!(config.delivered_after, MAX_TRANSITION_DELAY);
    }

    #[test]
    fn test_validate_rejects_programmatic_delay_above_ceiling() {
        let config = LifecycleConfig::default().with_delays(
            Duration::from_secs(1),
            Duration::from_secs(2),
            MAX_TRANSITION_DELAY + Duration::from_secs(1),
        );

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayTooLong { .. })
        ));
    }

    #[test]
    fn test_delays_must_increase() {
        let err = LifecycleConfig::from_lookup(lookup_from(&[
            (ENV_COOKING_DELAY, "200"),
            (ENV_OUT_FOR_DELIVERY_DELAY, "100"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::NotIncreasing { .. }));
    }

    #[test]
    fn test_schedule_order() {
        let schedule = LifecycleConfig::default().schedule();
        let targets: Vec<OrderStatus> = schedule.iter().map(|(_, s)| *s).collect();

        assert_eq!(
            targets,
            vec![
                OrderStatus::Cooking,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered
            ]
        );
        assert!(schedule.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
