//! Model time horizon shared by every tree built for one run.

use std::fmt;

use crate::domain::error::DomainError;

/// Time horizon of a model run: how many periods, and which year each one is.
///
/// Built once from settings and handed to every constructor that sizes
/// per-period arrays, so no component has to reach for a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelContext {
    start_year: i32,
    timestep: u32,
    period_count: usize,
}

impl ModelContext {
    pub fn new(start_year: i32, timestep: u32, period_count: usize) -> Result<Self, DomainError> {
        if timestep == 0 {
            return Err(DomainError::InvalidContext("timestep must be positive".into()));
        }
        if period_count == 0 {
            return Err(DomainError::InvalidContext(
                "period count must be positive".into(),
            ));
        }
        Ok(Self {
            start_year,
            timestep,
            period_count,
        })
    }

    pub fn period_count(&self) -> usize {
        self.period_count
    }

    /// Years per period.
    pub fn timestep(&self) -> u32 {
        self.timestep
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Calendar year of `period`.
    pub fn year(&self, period: usize) -> i32 {
        self.start_year + (period as i32) * (self.timestep as i32)
    }

    /// Period index of `year`, if the year falls exactly on a period boundary.
    pub fn period_of(&self, year: i32) -> Option<usize> {
        let offset = year - self.start_year;
        if offset < 0 || offset % (self.timestep as i32) != 0 {
            return None;
        }
        let period = (offset / self.timestep as i32) as usize;
        (period < self.period_count).then_some(period)
    }

    /// Iterator over all valid period indices.
    pub fn periods(&self) -> std::ops::Range<usize> {
        0..self.period_count
    }
}

impl Default for ModelContext {
    fn default() -> Self {
        Self {
            start_year: 1990,
            timestep: 15,
            period_count: 9,
        }
    }
}

impl fmt::Display for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={} every {} years ({} periods)",
            self.start_year,
            self.year(self.period_count - 1),
            self.timestep,
            self.period_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_context_when_mapping_years_then_roundtrips_period_boundaries() {
        let ctx = ModelContext::new(2005, 5, 4).unwrap();
        assert_eq!(ctx.year(0), 2005);
        assert_eq!(ctx.year(3), 2020);
        assert_eq!(ctx.period_of(2010), Some(1));
        assert_eq!(ctx.period_of(2012), None);
        assert_eq!(ctx.period_of(2025), None);
        assert_eq!(ctx.period_of(2000), None);
    }

    #[test]
    fn given_zero_timestep_when_creating_then_rejected() {
        assert!(matches!(
            ModelContext::new(2005, 0, 4),
            Err(DomainError::InvalidContext(_))
        ));
        assert!(ModelContext::new(2005, 5, 0).is_err());
    }
}
