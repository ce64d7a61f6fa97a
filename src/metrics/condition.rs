/// Which side of a threshold counts as the better condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// `value >= threshold` earns the label (wave height)
    HigherIsBetter,
    /// `value <= threshold` earns the label (cloud cover)
    LowerIsBetter,
}

/// Ordered threshold table mapping a continuous value to a label.
///
/// Thresholds are listed from best to worst. Boundary values belong to the
/// better label.
#[derive(Debug, Clone, Copy)]
pub struct ConditionScale {
    pub polarity: Polarity,
    pub thresholds: &'static [(f64, &'static str)],
    pub fallback: &'static str,
}

impl ConditionScale {
    /// Surf scale over wave height in metres
    pub const SURF: ConditionScale = ConditionScale {
        polarity: Polarity::HigherIsBetter,
        thresholds: &[(2.0, "EXCELLENT"), (1.5, "GOOD"), (1.0, "FAIR")],
        fallback: "POOR",
    };

    /// Sky scale over cloud cover percentage
    pub const SKY: ConditionScale = ConditionScale {
        polarity: Polarity::LowerIsBetter,
        thresholds: &[(15.0, "CLEAR"), (30.0, "MOSTLY CLEAR"), (60.0, "PARTLY CLOUDY")],
        fallback: "CLOUDY",
    };

    #[must_use]
    pub fn classify(&self, value: f64) -> &'static str {
        self.thresholds
            .iter()
            .find(|(threshold, _)| match self.polarity {
                Polarity::HigherIsBetter => value >= *threshold,
                Polarity::LowerIsBetter => value <= *threshold,
            })
            .map_or(self.fallback, |(_, label)| label)
    }

    /// True when `value` reaches the best label on the scale
    #[must_use]
    pub fn is_top(&self, value: f64) -> bool {
        self.thresholds
            .first()
            .is_some_and(|(_, label)| self.classify(value) == *label)
    }
}
