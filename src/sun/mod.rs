//! Sunrise/sunset ephemeris for a fixed observer.
//!
//! Solar coordinates use the low-precision series from Meeus (Astronomical
//! Algorithms, ch. 25), good to about a minute for rise/set work:
//!
//! 1. Julian centuries since J2000 for the instant being evaluated
//! 2. mean longitude, mean anomaly, equation of centre
//! 3. apparent longitude and obliquity (with nutation correction)
//! 4. declination, right ascension and the equation of time
//!
//! The rise/set hour angle is solved for a true altitude of −0°50′ (34′ of
//! refraction plus the 16′ solar semi-diameter). Declination and equation of
//! time are re-evaluated at each refined event instant until it settles.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::domain::{ObserverLocation, SunSample};
use crate::error::{PipelineError, Result};

/// Standard altitude of the sun's centre at rise/set, in degrees.
pub const RISE_SET_ALTITUDE_DEG: f64 = -50.0 / 60.0;

const MAX_REFINEMENTS: usize = 10;
const CONVERGENCE_SECONDS: f64 = 1.0;
const JULIAN_UNIX_EPOCH: f64 = 2_440_587.5;
const JULIAN_J2000: f64 = 2_451_545.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEvent {
    Rise,
    Set,
}

impl SunEvent {
    fn label(self) -> &'static str {
        match self {
            SunEvent::Rise => "sunrise",
            SunEvent::Set => "sunset",
        }
    }
}

/// Apparent solar coordinates at one instant.
#[derive(Debug, Clone, Copy)]
struct SolarCoordinates {
    declination_deg: f64,
    /// Equation of time in minutes (apparent minus mean solar time).
    equation_of_time_min: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SunEphemeris {
    location: ObserverLocation,
}

impl SunEphemeris {
    pub fn new(location: ObserverLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> ObserverLocation {
        self.location
    }

    /// One sample per date in `[start, end]`, stepping `step_days` from `start`.
    ///
    /// Hours are `hour + minute / 60` of each event in the observer's zone,
    /// seconds truncated.
    pub fn compute_sun_times(&self, start: NaiveDate, end: NaiveDate, step_days: u32) -> Result<Vec<SunSample>> {
        if step_days == 0 {
            return Err(PipelineError::config("sun sampling step must be at least one day"));
        }
        if start > end {
            return Err(PipelineError::config(format!(
                "sun window start {start} is after end {end}"
            )));
        }

        let step = Duration::days(i64::from(step_days));
        let mut out = Vec::new();
        let mut date = start;
        while date <= end {
            let sunrise = self.next_event(date, SunEvent::Rise)?;
            let sunset = self.next_event(date, SunEvent::Set)?;
            out.push(SunSample {
                date,
                sunrise_hour: fractional_hour(&sunrise),
                sunset_hour: fractional_hour(&sunset),
            });
            date += step;
        }

        tracing::debug!(samples = out.len(), %start, %end, step_days, "computed sun times");
        Ok(out)
    }

    /// First `event` at or after local midnight of `date`.
    pub fn next_event(&self, date: NaiveDate, event: SunEvent) -> Result<DateTime<Tz>> {
        let midnight = local_midnight(self.location.zone, date)?;

        // The UTC day of local midnight, and the next one for zones east of
        // Greenwich where the local day spills over.
        let first_day = midnight.date_naive();
        for day in [first_day, first_day + Duration::days(1)] {
            let instant = self.event_on_utc_day(day, event, date)?;
            if instant >= midnight {
                return Ok(instant.with_timezone(&self.location.zone));
            }
        }

        Err(PipelineError::NoEvent {
            date,
            event: event.label(),
        })
    }

    /// Rise or set instant whose UT falls on `day`, refined iteratively.
    fn event_on_utc_day(&self, day: NaiveDate, event: SunEvent, requested: NaiveDate) -> Result<DateTime<Utc>> {
        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        let latitude = self.location.latitude.to_radians();
        let altitude = RISE_SET_ALTITUDE_DEG.to_radians();

        // Start from local apparent noon.
        let mut minutes = 720.0 - 4.0 * self.location.longitude;

        for _ in 0..MAX_REFINEMENTS {
            let instant = day_start + duration_from_minutes(minutes);
            let coords = solar_coordinates(julian_centuries(&instant));
            let declination = coords.declination_deg.to_radians();

            let cos_h = (altitude.sin() - latitude.sin() * declination.sin()) / (latitude.cos() * declination.cos());
            if !(-1.0..=1.0).contains(&cos_h) {
                return Err(PipelineError::NoEvent {
                    date: requested,
                    event: event.label(),
                });
            }
            let hour_angle_deg = cos_h.acos().to_degrees();
            let signed = match event {
                SunEvent::Rise => hour_angle_deg,
                SunEvent::Set => -hour_angle_deg,
            };

            let refined = 720.0 - 4.0 * (self.location.longitude + signed) - coords.equation_of_time_min;
            let delta_seconds = (refined - minutes).abs() * 60.0;
            minutes = refined;
            if delta_seconds < CONVERGENCE_SECONDS {
                break;
            }
        }

        Ok(day_start + duration_from_minutes(minutes))
    }
}

fn local_midnight(zone: Tz, date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date.and_time(NaiveTime::MIN);
    // A DST jump can skip midnight; fall back to the first representable instant.
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| PipelineError::config(format!("local midnight of {date} does not exist in {zone}")))
}

fn duration_from_minutes(minutes: f64) -> Duration {
    // Whole milliseconds are plenty for minute-resolution output.
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

fn fractional_hour<T: Timelike>(t: &T) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0
}

fn julian_centuries(instant: &DateTime<Utc>) -> f64 {
    let seconds = instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_millis()) / 1000.0;
    let jd = JULIAN_UNIX_EPOCH + seconds / 86_400.0;
    (jd - JULIAN_J2000) / 36_525.0
}

fn solar_coordinates(t: f64) -> SolarCoordinates {
    let mean_longitude = (280.46646 + t * (36000.76983 + t * 0.0003032)).rem_euclid(360.0);
    let mean_anomaly = (357.52911 + t * (35999.05029 - 0.0001537 * t)).to_radians();

    let centre = mean_anomaly.sin() * (1.914602 - t * (0.004817 + 0.000014 * t))
        + (2.0 * mean_anomaly).sin() * (0.019993 - 0.000101 * t)
        + (3.0 * mean_anomaly).sin() * 0.000289;
    let true_longitude = mean_longitude + centre;

    let omega = (125.04 - 1934.136 * t).to_radians();
    let apparent_longitude = (true_longitude - 0.00569 - 0.00478 * omega.sin()).to_radians();

    let mean_obliquity = 23.0 + (26.0 + (21.448 - t * (46.815 + t * (0.00059 - t * 0.001813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.00256 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_longitude.sin()).asin();
    let right_ascension = (obliquity.cos() * apparent_longitude.sin())
        .atan2(apparent_longitude.cos())
        .to_degrees()
        .rem_euclid(360.0);

    // E = L0 - 0.0057183° - α, wrapped to (-180°, 180°], at 4 minutes per degree.
    let mut eot_deg = mean_longitude - 0.0057183 - right_ascension;
    eot_deg = (eot_deg + 180.0).rem_euclid(360.0) - 180.0;

    SolarCoordinates {
        declination_deg: declination.to_degrees(),
        equation_of_time_min: 4.0 * eot_deg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn madrid() -> SunEphemeris {
        SunEphemeris::new(ObserverLocation::default())
    }

    #[test]
    fn fractional_hour_truncates_seconds() {
        let t = chrono::NaiveTime::from_hms_opt(6, 17, 59).unwrap();
        assert_eq!(fractional_hour(&t), 6.0 + 17.0 / 60.0);

        let t = chrono::NaiveTime::from_hms_milli_opt(18, 59, 59, 999).unwrap();
        assert_eq!(fractional_hour(&t), 18.0 + 59.0 / 60.0);
        assert!(fractional_hour(&t) < 19.0);
    }

    #[test]
    fn summer_solstice_in_madrid_utc() {
        // Almanac: 04:44 and 19:48 UT.
        let s = madrid().compute_sun_times(d(2025, 6, 21), d(2025, 6, 21), 1).unwrap();
        assert_eq!(s.len(), 1);
        assert!((s[0].sunrise_hour - (4.0 + 44.0 / 60.0)).abs() < 0.05, "{:?}", s[0]);
        assert!((s[0].sunset_hour - (19.0 + 48.0 / 60.0)).abs() < 0.05, "{:?}", s[0]);
    }

    #[test]
    fn winter_solstice_in_madrid_utc() {
        // Almanac: 07:33 and 16:51 UT.
        let s = madrid().compute_sun_times(d(2024, 12, 21), d(2024, 12, 21), 1).unwrap();
        assert!((s[0].sunrise_hour - (7.0 + 33.0 / 60.0)).abs() < 0.05, "{:?}", s[0]);
        assert!((s[0].sunset_hour - (16.0 + 51.0 / 60.0)).abs() < 0.05, "{:?}", s[0]);
    }

    #[test]
    fn local_zone_shifts_by_offset() {
        let local = SunEphemeris::new(ObserverLocation {
            zone: chrono_tz::Europe::Madrid,
            ..ObserverLocation::default()
        });
        let utc = madrid().next_event(d(2025, 6, 21), SunEvent::Rise).unwrap();
        let cest = local.next_event(d(2025, 6, 21), SunEvent::Rise).unwrap();
        assert_eq!(utc.timestamp(), cest.timestamp());
        assert_eq!(cest.hour(), utc.hour() + 2);
    }

    #[test]
    fn one_sample_per_step_with_rise_before_set() {
        let s = madrid().compute_sun_times(d(2024, 1, 1), d(2025, 12, 31), 15).unwrap();
        // 731 days stepped by 15 from the first: 0, 15, ..., 720.
        assert_eq!(s.len(), 49);
        assert_eq!(s[0].date, d(2024, 1, 1));
        assert_eq!(s.last().unwrap().date, d(2025, 12, 21));
        for sample in &s {
            assert!(sample.sunrise_hour < sample.sunset_hour, "{sample:?}");
            assert!((0.0..24.0).contains(&sample.sunrise_hour));
            assert!((0.0..24.0).contains(&sample.sunset_hour));
        }
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(
            madrid().compute_sun_times(d(2024, 1, 1), d(2024, 1, 2), 0),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn polar_night_reports_no_event() {
        let tromso = SunEphemeris::new(ObserverLocation {
            latitude: 69.65,
            longitude: 18.96,
            zone: Tz::UTC,
        });
        assert_eq!(
            tromso.next_event(d(2024, 12, 21), SunEvent::Rise),
            Err(PipelineError::NoEvent {
                date: d(2024, 12, 21),
                event: "sunrise"
            })
        );
    }

    #[test]
    fn equation_of_time_near_known_extremes() {
        // Early November: about +16.4 min; mid February: about -14.2 min.
        let nov = Utc.with_ymd_and_hms(2025, 11, 3, 12, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2025, 2, 11, 12, 0, 0).unwrap();
        let e_nov = solar_coordinates(julian_centuries(&nov)).equation_of_time_min;
        let e_feb = solar_coordinates(julian_centuries(&feb)).equation_of_time_min;
        assert!((e_nov - 16.4).abs() < 0.3, "{e_nov}");
        assert!((e_feb + 14.2).abs() < 0.3, "{e_feb}");
    }
}
