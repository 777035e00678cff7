//! Weekday harvest fractions

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::validation::validate_fraction_table;

/// Share of the plants picked on each weekday, Monday first.
///
/// A zero entry marks a day without picking; capacity is undefined there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct HarvestFractionTable {
    fractions: [f64; HarvestFractionTable::DAYS],
}

impl HarvestFractionTable {
    pub const DAYS: usize = 7;

    /// Build a table from seven fractions, Monday first
    pub fn new(fractions: [f64; Self::DAYS]) -> Result<Self, &'static str> {
        validate_fraction_table(&fractions)?;
        Ok(Self { fractions })
    }

    /// Position of a date's weekday in the table (Monday = 0)
    pub fn weekday_index(date: NaiveDate) -> usize {
        date.weekday().num_days_from_monday() as usize
    }

    /// Fraction stored at a table position, `None` outside the table
    pub fn fraction_at(&self, index: usize) -> Option<f64> {
        self.fractions.get(index).copied()
    }

    /// Fraction picked on a given date
    pub fn fraction_for(&self, date: NaiveDate) -> Option<f64> {
        self.fraction_at(Self::weekday_index(date))
    }
}

impl Default for HarvestFractionTable {
    /// A third of the rows Monday to Wednesday, half Thursday to Saturday,
    /// nothing on Sunday
    fn default() -> Self {
        let third = 1.0 / 3.0;
        Self {
            fractions: [third, third, third, 0.5, 0.5, 0.5, 0.0],
        }
    }
}

impl TryFrom<Vec<f64>> for HarvestFractionTable {
    type Error = &'static str;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let fractions: [f64; Self::DAYS] = values
            .try_into()
            .map_err(|_| "Harvest fraction table must have exactly 7 entries")?;
        Self::new(fractions)
    }
}

impl From<HarvestFractionTable> for Vec<f64> {
    fn from(table: HarvestFractionTable) -> Self {
        table.fractions.to_vec()
    }
}
