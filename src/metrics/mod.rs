//! Pure derivations over forecast series
//!
//! Nothing in here reads the clock; "now" is always passed in.

pub mod alerts;
pub mod compass;
pub mod condition;
pub mod moon;
pub mod sun;
pub mod surf_rules;
pub mod windows;

pub use alerts::{AlertLevel, AlertRules, classify_alert};
pub use compass::{BearingArc, compass_label};
pub use condition::ConditionScale;
pub use moon::MoonPhase;
pub use sun::night_bounds;
pub use surf_rules::{RuleMatch, SpotRule, default_rules, match_rule};
pub use windows::{
    BestNight, BucketStats, Bucketing, Extremum, NightWindow, best_swell_day, best_viewing_night,
    best_window, bucket_stats, clarity, current_reading,
};
