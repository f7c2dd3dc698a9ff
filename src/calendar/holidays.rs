//! National public holidays.
//!
//! Calendars are looked up by ISO country code. Only nationwide holidays are
//! modelled; regional ones and Sunday substitutions vary by autonomous
//! community and are left out.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::domain::DateRange;
use crate::error::{PipelineError, Result};

/// Source of holiday dates for one region.
pub trait HolidayCalendar: Send + Sync {
    /// ISO country code this calendar answers for.
    fn region(&self) -> &str;

    /// Holidays falling in `year`.
    fn holidays_in_year(&self, year: i32) -> Vec<NaiveDate>;
}

/// Nationwide public holidays in Spain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpainNationalHolidays;

impl HolidayCalendar for SpainNationalHolidays {
    fn region(&self) -> &str {
        "ES"
    }

    fn holidays_in_year(&self, year: i32) -> Vec<NaiveDate> {
        const FIXED: [(u32, u32); 9] = [
            (1, 1),   // Año Nuevo
            (1, 6),   // Epifanía del Señor
            (5, 1),   // Fiesta del Trabajo
            (8, 15),  // Asunción de la Virgen
            (10, 12), // Fiesta Nacional de España
            (11, 1),  // Todos los Santos
            (12, 6),  // Día de la Constitución
            (12, 8),  // Inmaculada Concepción
            (12, 25), // Navidad
        ];

        let mut out: Vec<NaiveDate> = FIXED
            .iter()
            .filter_map(|&(m, d)| NaiveDate::from_ymd_opt(year, m, d))
            .collect();
        if let Some(easter) = easter_sunday(year) {
            out.push(easter - Duration::days(2)); // Viernes Santo
        }
        out.sort();
        out
    }
}

/// Built-in calendar for `region`.
pub fn calendar_for_region(region: &str) -> Result<Box<dyn HolidayCalendar>> {
    match region.trim().to_ascii_uppercase().as_str() {
        "ES" => Ok(Box::new(SpainNationalHolidays)),
        other => Err(PipelineError::config(format!("no holiday calendar for region '{other}'"))),
    }
}

/// Holidays of `calendar` inside `range`, inclusive.
pub fn holidays_in_range(range: &DateRange, calendar: &dyn HolidayCalendar) -> BTreeSet<NaiveDate> {
    range
        .years()
        .flat_map(|year| calendar.holidays_in_year(year))
        .filter(|d| range.contains(*d))
        .collect()
}

/// Gregorian Easter Sunday (anonymous Gregorian computus).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}
