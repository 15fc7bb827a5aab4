use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::{
    CALENDAR_MONTH_HOURS, HOURS_PER_YEAR, LoadError, MONTHS_PER_YEAR, UNIFORM_MONTH_HOURS,
};

/// Time resolution of a load profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Monthly,
    Hourly,
}

/// Monthly baseload energy [kWh/month] and peak power [kW].
///
/// All four sequences have the same length, a positive multiple of 12.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyLoad {
    baseload_extraction: Vec<f64>,
    baseload_injection: Vec<f64>,
    peak_extraction: Vec<f64>,
    peak_injection: Vec<f64>,
}

impl MonthlyLoad {
    /// Creates a validated monthly load.
    ///
    /// # Errors
    ///
    /// Returns an error if lengths differ or are not a multiple of 12, or any
    /// value is negative or not finite.
    pub fn new(
        baseload_extraction: Vec<f64>,
        baseload_injection: Vec<f64>,
        peak_extraction: Vec<f64>,
        peak_injection: Vec<f64>,
    ) -> Result<Self, LoadError> {
        let len = baseload_extraction.len();
        if len == 0 || len % MONTHS_PER_YEAR != 0 {
            return Err(LoadError::NotMultiple {
                name: "baseload_extraction",
                len,
                of: MONTHS_PER_YEAR,
            });
        }
        for (name, values) in [
            ("baseload_extraction", &baseload_extraction),
            ("baseload_injection", &baseload_injection),
            ("peak_extraction", &peak_extraction),
            ("peak_injection", &peak_injection),
        ] {
            check_series(name, values, len)?;
        }
        Ok(Self {
            baseload_extraction,
            baseload_injection,
            peak_extraction,
            peak_injection,
        })
    }

    /// Number of years the data covers.
    #[must_use]
    pub fn years(&self) -> usize {
        self.baseload_extraction.len() / MONTHS_PER_YEAR
    }

    #[must_use]
    pub fn baseload_extraction(&self) -> &[f64] {
        &self.baseload_extraction
    }

    #[must_use]
    pub fn baseload_injection(&self) -> &[f64] {
        &self.baseload_injection
    }

    #[must_use]
    pub fn peak_extraction(&self) -> &[f64] {
        &self.peak_extraction
    }

    #[must_use]
    pub fn peak_injection(&self) -> &[f64] {
        &self.peak_injection
    }

    /// Repeats the data until it covers `years`.
    #[must_use]
    pub fn tiled(&self, years: usize) -> Self {
        let tile = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .copied()
                .cycle()
                .take(years * MONTHS_PER_YEAR)
                .collect()
        };
        Self {
            baseload_extraction: tile(&self.baseload_extraction),
            baseload_injection: tile(&self.baseload_injection),
            peak_extraction: tile(&self.peak_extraction),
            peak_injection: tile(&self.peak_injection),
        }
    }

    pub(crate) fn from_parts_unchecked(
        baseload_extraction: Vec<f64>,
        baseload_injection: Vec<f64>,
        peak_extraction: Vec<f64>,
        peak_injection: Vec<f64>,
    ) -> Self {
        Self {
            baseload_extraction,
            baseload_injection,
            peak_extraction,
            peak_injection,
        }
    }
}

/// Hourly extraction and injection power [kW].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyLoad {
    extraction: Vec<f64>,
    injection: Vec<f64>,
}

impl HourlyLoad {
    /// Creates a validated hourly load.
    ///
    /// # Errors
    ///
    /// Returns an error if lengths differ or are not a multiple of 8760, or any
    /// value is negative or not finite.
    pub fn new(extraction: Vec<f64>, injection: Vec<f64>) -> Result<Self, LoadError> {
        let len = extraction.len();
        if len == 0 || len % HOURS_PER_YEAR != 0 {
            return Err(LoadError::NotMultiple {
                name: "extraction",
                len,
                of: HOURS_PER_YEAR,
            });
        }
        check_series("extraction", &extraction, len)?;
        check_series("injection", &injection, len)?;
        Ok(Self {
            extraction,
            injection,
        })
    }

    #[must_use]
    pub fn years(&self) -> usize {
        self.extraction.len() / HOURS_PER_YEAR
    }

    #[must_use]
    pub fn extraction(&self) -> &[f64] {
        &self.extraction
    }

    #[must_use]
    pub fn injection(&self) -> &[f64] {
        &self.injection
    }

    /// Aggregates to calendar months: energy is summed and the peak is the
    /// largest hourly value of the month.
    #[must_use]
    pub fn to_monthly(&self) -> MonthlyLoad {
        let months = self.years() * MONTHS_PER_YEAR;
        let mut load = MonthlyLoad {
            baseload_extraction: Vec::with_capacity(months),
            baseload_injection: Vec::with_capacity(months),
            peak_extraction: Vec::with_capacity(months),
            peak_injection: Vec::with_capacity(months),
        };
        let mut start = 0;
        for _ in 0..self.years() {
            for hours in CALENDAR_MONTH_HOURS {
                let range = start..start + hours;
                let ext = &self.extraction[range.clone()];
                let inj = &self.injection[range];
                load.baseload_extraction.push(ext.iter().sum());
                load.baseload_injection.push(inj.iter().sum());
                load.peak_extraction.push(ext.iter().copied().fold(0.0, f64::max));
                load.peak_injection.push(inj.iter().copied().fold(0.0, f64::max));
                start += hours;
            }
        }
        load
    }

    pub(crate) fn map(
        &self,
        extraction: impl Fn(usize, f64) -> f64,
        injection: impl Fn(usize, f64) -> f64,
    ) -> Self {
        Self {
            extraction: self
                .extraction
                .iter()
                .enumerate()
                .map(|(h, &v)| extraction(h, v))
                .collect(),
            injection: self
                .injection
                .iter()
                .enumerate()
                .map(|(h, &v)| injection(h, v))
                .collect(),
        }
    }

    fn tiled(&self, years: usize) -> Self {
        let tile = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .copied()
                .cycle()
                .take(years * HOURS_PER_YEAR)
                .collect()
        };
        Self {
            extraction: tile(&self.extraction),
            injection: tile(&self.injection),
        }
    }
}

/// A load at monthly or hourly resolution, single-year or multi-year.
///
/// Single-year variants are tiled over the simulation period; multi-year
/// variants must cover it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadProfile {
    Monthly(MonthlyLoad),
    MultiYearMonthly(MonthlyLoad),
    Hourly(HourlyLoad),
    MultiYearHourly(HourlyLoad),
}

impl LoadProfile {
    /// One year of monthly load.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is negative or not finite.
    pub fn monthly(
        baseload_extraction: [f64; MONTHS_PER_YEAR],
        baseload_injection: [f64; MONTHS_PER_YEAR],
        peak_extraction: [f64; MONTHS_PER_YEAR],
        peak_injection: [f64; MONTHS_PER_YEAR],
    ) -> Result<Self, LoadError> {
        MonthlyLoad::new(
            baseload_extraction.to_vec(),
            baseload_injection.to_vec(),
            peak_extraction.to_vec(),
            peak_injection.to_vec(),
        )
        .map(Self::Monthly)
    }

    /// Monthly load covering several years, 12 values per year.
    #[must_use]
    pub fn multi_year_monthly(load: MonthlyLoad) -> Self {
        Self::MultiYearMonthly(load)
    }

    /// One year of hourly load.
    ///
    /// # Errors
    ///
    /// Returns an error if the series do not hold exactly 8760 valid values.
    pub fn hourly(extraction: Vec<f64>, injection: Vec<f64>) -> Result<Self, LoadError> {
        let load = HourlyLoad::new(extraction, injection)?;
        if load.years() != 1 {
            return Err(LoadError::LengthMismatch {
                name: "extraction",
                expected: HOURS_PER_YEAR,
                actual: load.extraction.len(),
            });
        }
        Ok(Self::Hourly(load))
    }

    /// Hourly load covering several years, 8760 values per year.
    ///
    /// # Errors
    ///
    /// Returns an error if the series are not a valid multi-year hourly load.
    pub fn multi_year_hourly(extraction: Vec<f64>, injection: Vec<f64>) -> Result<Self, LoadError> {
        HourlyLoad::new(extraction, injection).map(Self::MultiYearHourly)
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        match self {
            Self::Monthly(_) | Self::MultiYearMonthly(_) => Resolution::Monthly,
            Self::Hourly(_) | Self::MultiYearHourly(_) => Resolution::Hourly,
        }
    }

    /// Years covered by a multi-year profile; `None` for a tiled single year.
    #[must_use]
    pub fn data_years(&self) -> Option<usize> {
        match self {
            Self::Monthly(_) | Self::Hourly(_) => None,
            Self::MultiYearMonthly(load) => Some(load.years()),
            Self::MultiYearHourly(load) => Some(load.years()),
        }
    }

    fn check_period(&self, years: usize) -> Result<(), LoadError> {
        match self.data_years() {
            Some(data_years) if data_years != years => Err(LoadError::PeriodMismatch {
                data_years,
                simulation_years: years,
            }),
            _ => Ok(()),
        }
    }

    /// Monthly view over `years`; hourly data is aggregated by calendar month.
    ///
    /// # Errors
    ///
    /// Returns an error if a multi-year profile does not cover `years`.
    pub fn monthly_view(&self, years: usize) -> Result<MonthlyView<'_>, LoadError> {
        self.check_period(years)?;
        let load = match self {
            Self::Monthly(load) | Self::MultiYearMonthly(load) => Cow::Borrowed(load),
            Self::Hourly(load) | Self::MultiYearHourly(load) => Cow::Owned(load.to_monthly()),
        };
        Ok(MonthlyView { load, years })
    }

    /// Hourly view over `years`.
    ///
    /// # Errors
    ///
    /// Returns an error for monthly profiles, or if a multi-year profile does
    /// not cover `years`.
    pub fn hourly_view(&self, years: usize) -> Result<HourlyView<'_>, LoadError> {
        self.check_period(years)?;
        match self {
            Self::Hourly(load) | Self::MultiYearHourly(load) => Ok(HourlyView { load, years }),
            Self::Monthly(_) | Self::MultiYearMonthly(_) => Err(LoadError::HourlyDataRequired),
        }
    }

    /// Mean yearly net heat into the ground, injection minus extraction [kWh].
    #[must_use]
    pub fn imbalance(&self) -> f64 {
        let (injection, extraction, years) = match self {
            Self::Monthly(load) | Self::MultiYearMonthly(load) => (
                load.baseload_injection.iter().sum::<f64>(),
                load.baseload_extraction.iter().sum::<f64>(),
                load.years(),
            ),
            Self::Hourly(load) | Self::MultiYearHourly(load) => (
                load.injection.iter().sum::<f64>(),
                load.extraction.iter().sum::<f64>(),
                load.years(),
            ),
        };
        (injection - extraction) / years as f64
    }

    /// True if every extraction and injection value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        let all_zero = |values: &[f64]| values.iter().all(|&v| v == 0.0);
        match self {
            Self::Monthly(load) | Self::MultiYearMonthly(load) => {
                all_zero(&load.baseload_extraction)
                    && all_zero(&load.baseload_injection)
                    && all_zero(&load.peak_extraction)
                    && all_zero(&load.peak_injection)
            }
            Self::Hourly(load) | Self::MultiYearHourly(load) => {
                all_zero(&load.extraction) && all_zero(&load.injection)
            }
        }
    }

    /// Largest extraction and injection power [kW] anywhere in the data.
    #[must_use]
    pub fn max_power(&self) -> (f64, f64) {
        let max = |values: &[f64]| values.iter().copied().fold(0.0, f64::max);
        match self {
            Self::Monthly(load) | Self::MultiYearMonthly(load) => {
                let view = MonthlyView {
                    load: Cow::Borrowed(load),
                    years: load.years(),
                };
                let months = view.months();
                (
                    (0..months).map(|k| view.peak_extraction(k)).fold(0.0, f64::max),
                    (0..months).map(|k| view.peak_injection(k)).fold(0.0, f64::max),
                )
            }
            Self::Hourly(load) | Self::MultiYearHourly(load) => {
                (max(&load.extraction), max(&load.injection))
            }
        }
    }

    /// Scales extraction and injection by constant factors.
    #[must_use]
    pub fn scaled(&self, extraction: f64, injection: f64) -> Self {
        self.map_steps(|_, v| v * extraction, |_, v| v * injection)
    }

    /// Caps extraction and injection power [kW]. Monthly energy is capped at
    /// the same power held for a uniform month.
    #[must_use]
    pub fn capped(&self, extraction: f64, injection: f64) -> Self {
        match self {
            Self::Monthly(load) | Self::MultiYearMonthly(load) => {
                let cap = |values: &[f64], cap: f64| -> Vec<f64> {
                    values.iter().map(|v| v.min(cap)).collect()
                };
                let capped = MonthlyLoad {
                    baseload_extraction: cap(
                        &load.baseload_extraction,
                        extraction * UNIFORM_MONTH_HOURS,
                    ),
                    baseload_injection: cap(
                        &load.baseload_injection,
                        injection * UNIFORM_MONTH_HOURS,
                    ),
                    peak_extraction: cap(&load.peak_extraction, extraction),
                    peak_injection: cap(&load.peak_injection, injection),
                };
                self.with_monthly(capped)
            }
            Self::Hourly(_) | Self::MultiYearHourly(_) => {
                self.map_steps(|_, v| v.min(extraction), |_, v| v.min(injection))
            }
        }
    }

    /// Element-wise difference `self - other` clamped at zero. Both profiles
    /// must have the same variant and length.
    #[must_use]
    pub fn remainder(&self, other: &Self) -> Self {
        let diff = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter()
                .zip(b.iter().chain(std::iter::repeat(&0.0)))
                .map(|(x, y)| (x - y).max(0.0))
                .collect()
        };
        match (self, other) {
            (
                Self::Monthly(a) | Self::MultiYearMonthly(a),
                Self::Monthly(b) | Self::MultiYearMonthly(b),
            ) => self.with_monthly(MonthlyLoad {
                baseload_extraction: diff(&a.baseload_extraction, &b.baseload_extraction),
                baseload_injection: diff(&a.baseload_injection, &b.baseload_injection),
                peak_extraction: diff(&a.peak_extraction, &b.peak_extraction),
                peak_injection: diff(&a.peak_injection, &b.peak_injection),
            }),
            (
                Self::Hourly(a) | Self::MultiYearHourly(a),
                Self::Hourly(b) | Self::MultiYearHourly(b),
            ) => self.with_hourly(HourlyLoad {
                extraction: diff(&a.extraction, &b.extraction),
                injection: diff(&a.injection, &b.injection),
            }),
            _ => self.scaled(0.0, 0.0),
        }
    }

    /// Applies per-step maps to every extraction and injection value.
    ///
    /// Steps are months or hours of the stored data. Monthly maps apply to both
    /// baseload and peak.
    pub(crate) fn map_steps(
        &self,
        extraction: impl Fn(usize, f64) -> f64,
        injection: impl Fn(usize, f64) -> f64,
    ) -> Self {
        match self {
            Self::Monthly(load) | Self::MultiYearMonthly(load) => {
                let map = |values: &[f64], f: &dyn Fn(usize, f64) -> f64| -> Vec<f64> {
                    values.iter().enumerate().map(|(k, &v)| f(k, v)).collect()
                };
                self.with_monthly(MonthlyLoad {
                    baseload_extraction: map(&load.baseload_extraction, &extraction),
                    baseload_injection: map(&load.baseload_injection, &injection),
                    peak_extraction: map(&load.peak_extraction, &extraction),
                    peak_injection: map(&load.peak_injection, &injection),
                })
            }
            Self::Hourly(load) | Self::MultiYearHourly(load) => {
                self.with_hourly(load.map(extraction, injection))
            }
        }
    }

    /// Materializes a multi-year profile covering exactly `years`.
    #[must_use]
    pub fn expanded(&self, years: usize) -> Self {
        match self {
            Self::Monthly(load) => Self::MultiYearMonthly(load.tiled(years)),
            Self::Hourly(load) => Self::MultiYearHourly(load.tiled(years)),
            Self::MultiYearMonthly(_) | Self::MultiYearHourly(_) => self.clone(),
        }
    }

    fn with_monthly(&self, load: MonthlyLoad) -> Self {
        match self {
            Self::Monthly(_) | Self::Hourly(_) => Self::Monthly(load),
            Self::MultiYearMonthly(_) | Self::MultiYearHourly(_) => Self::MultiYearMonthly(load),
        }
    }

    fn with_hourly(&self, load: HourlyLoad) -> Self {
        match self {
            Self::Monthly(_) | Self::Hourly(_) => Self::Hourly(load),
            Self::MultiYearMonthly(_) | Self::MultiYearHourly(_) => Self::MultiYearHourly(load),
        }
    }
}

/// Monthly load over the simulation period.
#[derive(Debug, Clone)]
pub struct MonthlyView<'a> {
    load: Cow<'a, MonthlyLoad>,
    years: usize,
}

impl MonthlyView<'_> {
    #[must_use]
    pub fn years(&self) -> usize {
        self.years
    }

    #[must_use]
    pub fn months(&self) -> usize {
        self.years * MONTHS_PER_YEAR
    }

    fn index(&self, month: usize) -> usize {
        month % self.load.baseload_extraction.len()
    }

    /// Extracted energy in `month` [kWh].
    #[must_use]
    pub fn baseload_extraction(&self, month: usize) -> f64 {
        self.load.baseload_extraction[self.index(month)]
    }

    /// Injected energy in `month` [kWh].
    #[must_use]
    pub fn baseload_injection(&self, month: usize) -> f64 {
        self.load.baseload_injection[self.index(month)]
    }

    /// Peak extraction power [kW], never below the month's average power.
    #[must_use]
    pub fn peak_extraction(&self, month: usize) -> f64 {
        self.load.peak_extraction[self.index(month)]
            .max(self.baseload_extraction(month) / UNIFORM_MONTH_HOURS)
    }

    /// Peak injection power [kW], never below the month's average power.
    #[must_use]
    pub fn peak_injection(&self, month: usize) -> f64 {
        self.load.peak_injection[self.index(month)]
            .max(self.baseload_injection(month) / UNIFORM_MONTH_HOURS)
    }

    /// Average net power into the ground in `month` [W].
    #[must_use]
    pub fn net_power(&self, month: usize) -> f64 {
        (self.baseload_injection(month) - self.baseload_extraction(month)) * 1000.0
            / UNIFORM_MONTH_HOURS
    }

    /// Net power into the ground for every month [W].
    #[must_use]
    pub fn net_powers(&self) -> Vec<f64> {
        (0..self.months()).map(|k| self.net_power(k)).collect()
    }

    /// Net yearly energy into the ground in `year` (0-based) [kWh].
    #[must_use]
    pub fn yearly_imbalance(&self, year: usize) -> f64 {
        (year * MONTHS_PER_YEAR..(year + 1) * MONTHS_PER_YEAR)
            .map(|k| self.baseload_injection(k) - self.baseload_extraction(k))
            .sum()
    }

    /// Materializes the view as a multi-year monthly load.
    #[must_use]
    pub fn to_load(&self) -> MonthlyLoad {
        self.load.tiled(self.years)
    }
}

/// Hourly load over the simulation period.
#[derive(Debug, Clone, Copy)]
pub struct HourlyView<'a> {
    load: &'a HourlyLoad,
    years: usize,
}

impl HourlyView<'_> {
    #[must_use]
    pub fn years(&self) -> usize {
        self.years
    }

    #[must_use]
    pub fn hours(&self) -> usize {
        self.years * HOURS_PER_YEAR
    }

    fn index(&self, hour: usize) -> usize {
        hour % self.load.extraction.len()
    }

    /// Extraction power in `hour` [kW].
    #[must_use]
    pub fn extraction(&self, hour: usize) -> f64 {
        self.load.extraction[self.index(hour)]
    }

    /// Injection power in `hour` [kW].
    #[must_use]
    pub fn injection(&self, hour: usize) -> f64 {
        self.load.injection[self.index(hour)]
    }

    /// Net power into the ground in `hour` [W].
    #[must_use]
    pub fn net_power(&self, hour: usize) -> f64 {
        (self.injection(hour) - self.extraction(hour)) * 1000.0
    }

    /// Net power into the ground for every hour [W].
    #[must_use]
    pub fn net_powers(&self) -> Vec<f64> {
        (0..self.hours()).map(|h| self.net_power(h)).collect()
    }
}

fn check_series(name: &'static str, values: &[f64], expected: usize) -> Result<(), LoadError> {
    if values.len() != expected {
        return Err(LoadError::LengthMismatch {
            name,
            expected,
            actual: values.len(),
        });
    }
    if let Some((index, &value)) = values
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v >= 0.0))
    {
        return Err(LoadError::Negative { name, index, value });
    }
    Ok(())
}
