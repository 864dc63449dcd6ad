use chrono::{DateTime, TimeZone, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::cache::keys::namespaces::TRIP_PLAN;
use crate::cache::{create_cache_key, object_params};
use crate::clock::SharedClock;
use crate::error::AppError;

pub const MAX_DAYS: u32 = 30;
pub const MAX_TRAVELERS: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Budget,
    #[default]
    #[serde(alias = "mid", alias = "medium")]
    Moderate,
    Luxury,
}

impl Budget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Budget::Budget => "budget",
            Budget::Moderate => "moderate",
            Budget::Luxury => "luxury",
        }
    }

    /// 每人每天的预估花费（美元）
    pub fn daily_cost(&self) -> u32 {
        match self {
            Budget::Budget => 60,
            Budget::Moderate => 150,
            Budget::Luxury => 400,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TripPlanRequest {
    pub destination: String,
    pub days: u32,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub interests: Vec<String>,
    pub travelers: Option<u32>,
}

/// 校验并规范化后的行程请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripPlanQuery {
    pub destination: String,
    pub days: u32,
    pub budget: Budget,
    pub interests: Vec<String>,
    pub travelers: u32,
}

impl TripPlanRequest {
    pub fn validate(self) -> Result<TripPlanQuery, AppError> {
        let destination = self.destination.split_whitespace().collect::<Vec<_>>().join(" ");
        if destination.is_empty() {
            return Err(AppError::validation("destination is required"));
        }
        if !(1..=MAX_DAYS).contains(&self.days) {
            return Err(AppError::validation(format!(
                "days must be between 1 and {}",
                MAX_DAYS
            )));
        }
        let travelers = self.travelers.unwrap_or(1);
        if !(1..=MAX_TRAVELERS).contains(&travelers) {
            return Err(AppError::validation(format!(
                "travelers must be between 1 and {}",
                MAX_TRAVELERS
            )));
        }

        let mut interests: Vec<String> = self
            .interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect();
        if let Some(bad) = interests.iter().find(|i| !is_interest_name(i)) {
            return Err(AppError::validation(format!("invalid interest: {}", bad)));
        }
        interests.sort();
        interests.dedup();

        Ok(TripPlanQuery {
            destination,
            days: self.days,
            budget: self.budget,
            interests,
            travelers,
        })
    }
}

/// 兴趣名只允许字母、数字、空格、`-` 和 `_`
fn is_interest_name(interest: &str) -> bool {
    interest
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
}

impl TripPlanQuery {
    /// 目的地大小写不敏感，兴趣已排序去重，以 JSON 数组参与键
    pub fn cache_key(&self) -> String {
        create_cache_key(
            TRIP_PLAN,
            &object_params(json!({
                "destination": self.destination.to_lowercase(),
                "days": self.days,
                "budget": self.budget.as_str(),
                "interests": self.interests,
                "travelers": self.travelers,
            })),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub slot: &'static str,
    pub interest: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayPlan {
    pub day: u32,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Itinerary {
    pub id: Uuid,
    pub destination: String,
    pub days: u32,
    pub budget: Budget,
    pub travelers: u32,
    pub interests: Vec<String>,
    pub daily_plans: Vec<DayPlan>,
    pub estimated_cost: u32,
    pub currency: &'static str,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("{0}")]
    Unsupported(String),
    #[error("planner unavailable: {0}")]
    Unavailable(String),
}

/// 行程生成后端
pub trait TripPlanner: Send + Sync {
    fn plan<'a>(&'a self, query: &'a TripPlanQuery) -> BoxFuture<'a, Result<Itinerary, PlannerError>>;
}

const SLOTS: [&str; 3] = ["morning", "afternoon", "evening"];

const DEFAULT_INTEREST: &str = "sightseeing";

fn templates(interest: &str) -> Option<&'static [&'static str]> {
    let list: &'static [&'static str] = match interest {
        "sightseeing" => &[
            "Walking tour of the historic center",
            "Panoramic viewpoint visit",
            "Guided city highlights tour",
            "Stroll along the main boulevard",
        ],
        "food" => &[
            "Morning market visit",
            "Local cooking class",
            "Street food tasting",
            "Dinner at a traditional restaurant",
        ],
        "culture" => &[
            "Art museum visit",
            "Local crafts workshop",
            "Live music or theatre performance",
            "Contemporary gallery crawl",
        ],
        "history" => &[
            "Old fortress and ramparts",
            "History museum visit",
            "Cathedral and cloisters tour",
            "Heritage quarter walking tour",
        ],
        "nature" => &[
            "Botanical garden walk",
            "Day hike on a nearby trail",
            "Riverside or coastal picnic",
            "Sunset at a scenic lookout",
        ],
        "nightlife" => &[
            "Rooftop bar at sunset",
            "Live jazz club",
            "Night market stroll",
            "Local pub crawl",
        ],
        "shopping" => &[
            "Artisan boutiques district",
            "Flea market browse",
            "Design and concept stores",
            "Local food souvenirs shopping",
        ],
        "adventure" => &[
            "Kayaking excursion",
            "Bike tour around town",
            "Climbing or canyoning session",
            "Zip-line park",
        ],
        _ => return None,
    };
    Some(list)
}

/// 基于兴趣模板的本地行程生成器
#[derive(Debug, Clone)]
pub struct TemplatePlanner {
    clock: SharedClock,
}

impl TemplatePlanner {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    pub fn build(&self, query: &TripPlanQuery) -> Result<Itinerary, PlannerError> {
        let interests: Vec<&str> = if query.interests.is_empty() {
            vec![DEFAULT_INTEREST]
        } else {
            query.interests.iter().map(String::as_str).collect()
        };

        let catalog = interests
            .iter()
            .map(|interest| {
                templates(interest)
                    .map(|list| (*interest, list))
                    .ok_or_else(|| {
                        PlannerError::Unsupported(format!("unsupported interest: {}", interest))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let daily_plans = (0..query.days as usize)
            .map(|day| {
                let activities = SLOTS
                    .iter()
                    .enumerate()
                    .map(|(slot_index, &slot)| {
                        let (interest, list) = catalog[(day + slot_index) % catalog.len()];
                        let title = list[(day * SLOTS.len() + slot_index) % list.len()];
                        Activity {
                            slot,
                            interest: interest.to_string(),
                            title: format!("{} in {}", title, query.destination),
                        }
                    })
                    .collect();
                DayPlan {
                    day: day as u32 + 1,
                    activities,
                }
            })
            .collect();

        let generated_at = Utc
            .timestamp_millis_opt(self.clock.now_millis())
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Itinerary {
            id: Uuid::new_v4(),
            destination: query.destination.clone(),
            days: query.days,
            budget: query.budget,
            travelers: query.travelers,
            interests: interests.iter().map(|i| i.to_string()).collect(),
            daily_plans,
            estimated_cost: query.days * query.travelers * query.budget.daily_cost(),
            currency: "USD",
            generated_at,
        })
    }
}

impl TripPlanner for TemplatePlanner {
    fn plan<'a>(&'a self, query: &'a TripPlanQuery) -> BoxFuture<'a, Result<Itinerary, PlannerError>> {
        async move { self.build(query) }.boxed()
    }
}
