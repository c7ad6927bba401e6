use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A measurable health quantity carried by a health record.
///
/// # Examples
///
/// ```
/// use vitalmon_common::types::Indicator;
///
/// let ind: Indicator = "systolicPressure".parse().unwrap();
/// assert_eq!(ind, Indicator::SystolicPressure);
/// assert_eq!(ind.to_string(), "systolic_pressure");
/// assert!(!ind.is_decimal());
/// assert!(Indicator::BloodSugar.is_decimal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    SystolicPressure,
    DiastolicPressure,
    HeartRate,
    BloodSugar,
    Weight,
    Temperature,
    BloodOxygen,
    Steps,
    SleepHours,
}

impl Indicator {
    pub const ALL: [Indicator; 9] = [
        Indicator::SystolicPressure,
        Indicator::DiastolicPressure,
        Indicator::HeartRate,
        Indicator::BloodSugar,
        Indicator::Weight,
        Indicator::Temperature,
        Indicator::BloodOxygen,
        Indicator::Steps,
        Indicator::SleepHours,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::SystolicPressure => "systolic_pressure",
            Indicator::DiastolicPressure => "diastolic_pressure",
            Indicator::HeartRate => "heart_rate",
            Indicator::BloodSugar => "blood_sugar",
            Indicator::Weight => "weight",
            Indicator::Temperature => "temperature",
            Indicator::BloodOxygen => "blood_oxygen",
            Indicator::Steps => "steps",
            Indicator::SleepHours => "sleep_hours",
        }
    }

    /// Whether readings of this indicator are decimal rather than integral.
    pub fn is_decimal(&self) -> bool {
        matches!(
            self,
            Indicator::BloodSugar
                | Indicator::Weight
                | Indicator::Temperature
                | Indicator::SleepHours
        )
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Indicator::SystolicPressure | Indicator::DiastolicPressure => "mmHg",
            Indicator::HeartRate => "bpm",
            Indicator::BloodSugar => "mmol/L",
            Indicator::Weight => "kg",
            Indicator::Temperature => "°C",
            Indicator::BloodOxygen => "%",
            Indicator::Steps => "steps",
            Indicator::SleepHours => "h",
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Indicator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accepts snake_case, the camelCase field names of the record API,
        // and a few short clinical aliases.
        match s.trim() {
            "systolic_pressure" | "systolicPressure" | "systolic" => Ok(Indicator::SystolicPressure),
            "diastolic_pressure" | "diastolicPressure" | "diastolic" => {
                Ok(Indicator::DiastolicPressure)
            }
            "heart_rate" | "heartRate" | "pulse" => Ok(Indicator::HeartRate),
            "blood_sugar" | "bloodSugar" | "glucose" => Ok(Indicator::BloodSugar),
            "weight" => Ok(Indicator::Weight),
            "temperature" | "temp" => Ok(Indicator::Temperature),
            "blood_oxygen" | "bloodOxygen" | "spo2" => Ok(Indicator::BloodOxygen),
            "steps" => Ok(Indicator::Steps),
            "sleep_hours" | "sleepHours" | "sleep" => Ok(Indicator::SleepHours),
            _ => Err(format!("unknown indicator: {s}")),
        }
    }
}

/// A single typed measurement value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Integer(i64),
    Decimal(f64),
}

impl Reading {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Reading::Integer(v) => v as f64,
            Reading::Decimal(v) => v,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Reading::Integer(_) => true,
            Reading::Decimal(v) => v.is_finite(),
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Integer(v) => write!(f, "{v}"),
            Reading::Decimal(v) => write!(f, "{v}"),
        }
    }
}

/// One health record as seen by the rule engine.
///
/// Every indicator is optional; an absent value means "no data" and is
/// never read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    pub record_id: Option<i64>,
    pub user_id: Option<i64>,
    pub systolic_pressure: Option<i64>,
    pub diastolic_pressure: Option<i64>,
    pub heart_rate: Option<i64>,
    pub blood_sugar: Option<f64>,
    pub weight: Option<f64>,
    pub temperature: Option<f64>,
    pub blood_oxygen: Option<i64>,
    pub steps: Option<i64>,
    pub sleep_hours: Option<f64>,
}

impl MeasurementSnapshot {
    pub fn new(user_id: i64, record_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            record_id: Some(record_id),
            ..Self::default()
        }
    }

    /// Returns the reading for `indicator`, or `None` when the record has no data for it.
    pub fn reading(&self, indicator: Indicator) -> Option<Reading> {
        match indicator {
            Indicator::SystolicPressure => self.systolic_pressure.map(Reading::Integer),
            Indicator::DiastolicPressure => self.diastolic_pressure.map(Reading::Integer),
            Indicator::HeartRate => self.heart_rate.map(Reading::Integer),
            Indicator::BloodSugar => self.blood_sugar.map(Reading::Decimal),
            Indicator::Weight => self.weight.map(Reading::Decimal),
            Indicator::Temperature => self.temperature.map(Reading::Decimal),
            Indicator::BloodOxygen => self.blood_oxygen.map(Reading::Integer),
            Indicator::Steps => self.steps.map(Reading::Integer),
            Indicator::SleepHours => self.sleep_hours.map(Reading::Decimal),
        }
    }
}

/// Alert severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use vitalmon_common::types::AlertLevel;
///
/// let level: AlertLevel = "medium".parse().unwrap();
/// assert_eq!(level, AlertLevel::Medium);
/// assert_eq!(level.code(), 2);
/// assert!(AlertLevel::High > AlertLevel::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

impl AlertLevel {
    /// Numeric code used by the alert table: 1=low, 2=medium, 3=high.
    pub fn code(&self) -> u8 {
        match self {
            AlertLevel::Low => 1,
            AlertLevel::Medium => 2,
            AlertLevel::High => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AlertLevel::Low),
            2 => Some(AlertLevel::Medium),
            3 => Some(AlertLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Low => write!(f, "low"),
            AlertLevel::Medium => write!(f, "medium"),
            AlertLevel::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "1" => Ok(AlertLevel::Low),
            "medium" | "2" => Ok(AlertLevel::Medium),
            "high" | "3" => Ok(AlertLevel::High),
            _ => Err(format!("unknown alert level: {s}")),
        }
    }
}

/// Handling state of an alert. `Open` is initial, `Handled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Handled,
}

impl AlertStatus {
    /// Numeric code used by the alert table: 0=open, 1=handled.
    pub fn code(&self) -> u8 {
        match self {
            AlertStatus::Open => 0,
            AlertStatus::Handled => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AlertStatus::Open),
            1 => Some(AlertStatus::Handled),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Open => write!(f, "open"),
            AlertStatus::Handled => write!(f, "handled"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" | "0" => Ok(AlertStatus::Open),
            "handled" | "1" => Ok(AlertStatus::Handled),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Assigned by the alert store on insert.
    pub id: Option<String>,
    pub user_id: i64,
    pub record_id: i64,
    /// Rule that produced this alert
    pub rule_id: i64,
    pub alert_type: String,
    pub alert_level: AlertLevel,
    /// Indicator(s) that caused the match, `/`-joined when more than one
    pub indicator: String,
    /// Observed value(s), in the same order as `indicator`
    pub observed_value: String,
    pub threshold_description: String,
    pub message: String,
    pub status: AlertStatus,
    pub handled_by: Option<i64>,
    pub handle_time: Option<DateTime<Utc>>,
    /// Assigned by the alert store on insert.
    pub create_time: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_handled(&self) -> bool {
        self.status == AlertStatus::Handled
    }
}
