use chrono::{DateTime, Datelike, FixedOffset, Utc};

/// All user-facing scheduling runs on Moscow wall-clock time. Fixed UTC+3, no DST.
pub fn moscow_time(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(3 * 3600).expect("static offset");
    now.with_timezone(&offset)
}

/// key: seasons -> northern-hemisphere classification driving watering cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }

    pub fn label_ru(&self) -> &'static str {
        match self {
            Season::Winter => "Зима",
            Season::Spring => "Весна",
            Season::Summer => "Лето",
            Season::Autumn => "Осень",
        }
    }

    /// Scalar applied to the summer-baseline interval when estimating the
    /// interval for this season.
    pub fn multiplier(&self) -> f64 {
        match self {
            Season::Winter => 2.0,
            Season::Spring => 1.0,
            Season::Summer => 0.8,
            Season::Autumn => 1.4,
        }
    }

    /// Inverse scalar used to recover the summer baseline from an interval
    /// observed in this season.
    pub fn reverse_multiplier(&self) -> f64 {
        match self {
            Season::Winter => 0.5,
            Season::Spring => 1.0,
            Season::Summer => 1.25,
            Season::Autumn => 0.7,
        }
    }
}

pub fn month_name_ru(month: u32) -> &'static str {
    match month {
        1 => "Январь",
        2 => "Февраль",
        3 => "Март",
        4 => "Апрель",
        5 => "Май",
        6 => "Июнь",
        7 => "Июль",
        8 => "Август",
        9 => "Сентябрь",
        10 => "Октябрь",
        11 => "Ноябрь",
        12 => "Декабрь",
        _ => "",
    }
}

/// Season descriptor handed to the interval estimator prompt.
#[derive(Debug, Clone)]
pub struct SeasonInfo {
    pub season: Season,
    pub month: u32,
    pub month_name_ru: &'static str,
}

impl SeasonInfo {
    pub fn at(now: DateTime<Utc>) -> Self {
        let month = moscow_time(now).month();
        Self {
            season: Season::from_month(month),
            month,
            month_name_ru: month_name_ru(month),
        }
    }
}
