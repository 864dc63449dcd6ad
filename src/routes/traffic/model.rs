use chrono::{TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::keys::namespaces::TRAFFIC;
use crate::cache::{create_cache_key, object_params};
use crate::error::AppError;
use crate::utils::geo::{Coordinate, round2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Cycling,
    Walking,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Cycling => "cycling",
            TravelMode::Walking => "walking",
        }
    }

    /// 畅通时的平均速度（千米/小时）
    pub fn free_flow_kmh(&self) -> f64 {
        match self {
            TravelMode::Driving => 50.0,
            TravelMode::Cycling => 15.0,
            TravelMode::Walking => 5.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    #[serde(default)]
    pub mode: TravelMode,
    pub departure_hour: Option<u32>,
}

impl TrafficQuery {
    pub fn origin(&self) -> Coordinate {
        Coordinate::new(self.origin_lat, self.origin_lng)
    }

    pub fn destination(&self) -> Coordinate {
        Coordinate::new(self.dest_lat, self.dest_lng)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.origin().is_valid() || !self.destination().is_valid() {
            return Err(AppError::validation("invalid coordinates"));
        }
        if self.departure_hour.is_some_and(|h| h > 23) {
            return Err(AppError::validation("departure_hour must be between 0 and 23"));
        }
        Ok(())
    }

    /// 未指定出发时间时取当前 UTC 小时
    pub fn hour_at(&self, now_millis: i64) -> u32 {
        self.departure_hour.unwrap_or_else(|| {
            Utc.timestamp_millis_opt(now_millis)
                .single()
                .map(|t| t.hour())
                .unwrap_or(0)
        })
    }

    pub fn cache_key(&self, hour: u32) -> String {
        create_cache_key(
            TRAFFIC,
            &object_params(json!({
                "origin": format!("{:.4},{:.4}", self.origin_lat, self.origin_lng),
                "destination": format!("{:.4},{:.4}", self.dest_lat, self.dest_lng),
                "mode": self.mode.as_str(),
                "hour": hour,
            })),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Light,
    Moderate,
    Heavy,
}

impl CongestionLevel {
    fn from_factor(factor: f64) -> Self {
        if factor < 1.15 {
            CongestionLevel::Light
        } else if factor < 1.5 {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Heavy
        }
    }

    fn advisory(&self) -> &'static str {
        match self {
            CongestionLevel::Light => "Traffic is flowing freely.",
            CongestionLevel::Moderate => "Expect some slowdowns along the way.",
            CongestionLevel::Heavy => "Heavy traffic expected; consider leaving earlier or later.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficAdvisory {
    pub mode: TravelMode,
    pub departure_hour: u32,
    pub distance_km: f64,
    pub free_flow_minutes: u32,
    pub expected_minutes: u32,
    pub delay_minutes: u32,
    pub congestion: CongestionLevel,
    pub advisory: &'static str,
}

/// 工作日典型拥堵系数，按小时索引
const WEEKDAY_PROFILE: [f64; 24] = [
    1.0, 1.0, 1.0, 1.0, 1.0, 1.05, // 0-5
    1.2, 1.6, 1.8, 1.5, 1.2, 1.2, // 6-11
    1.3, 1.25, 1.2, 1.3, 1.6, 1.9, // 12-17
    1.7, 1.4, 1.2, 1.1, 1.05, 1.0, // 18-23
];

/// 基于时段拥堵曲线的路况估算
#[derive(Debug, Clone)]
pub struct TrafficEstimator {
    profile: [f64; 24],
}

impl Default for TrafficEstimator {
    fn default() -> Self {
        Self {
            profile: WEEKDAY_PROFILE,
        }
    }
}

impl TrafficEstimator {
    pub fn with_profile(profile: [f64; 24]) -> Self {
        Self { profile }
    }

    /// 只有驾车受拥堵影响
    pub fn congestion_factor(&self, mode: TravelMode, hour: u32) -> f64 {
        match mode {
            TravelMode::Driving => self.profile[(hour % 24) as usize].max(1.0),
            _ => 1.0,
        }
    }

    pub fn estimate(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        mode: TravelMode,
        hour: u32,
    ) -> TrafficAdvisory {
        let distance = origin.distance_km(destination);
        let free_flow = distance / mode.free_flow_kmh() * 60.0;
        let factor = self.congestion_factor(mode, hour);
        let expected = free_flow * factor;
        let congestion = CongestionLevel::from_factor(factor);

        let free_flow_minutes = free_flow.round() as u32;
        let expected_minutes = expected.round() as u32;

        TrafficAdvisory {
            mode,
            departure_hour: hour % 24,
            distance_km: round2(distance),
            free_flow_minutes,
            expected_minutes,
            delay_minutes: expected_minutes.saturating_sub(free_flow_minutes),
            congestion,
            advisory: congestion.advisory(),
        }
    }
}
