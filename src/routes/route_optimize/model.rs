use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::cache::keys::namespaces::ROUTE_OPTIMIZE;
use crate::cache::{create_cache_key, object_params};
use crate::error::AppError;
use crate::utils::geo::{Coordinate, round2};

pub const MIN_STOPS: usize = 2;
pub const MAX_STOPS: usize = 25;

/// 估算行程时间用的平均车速（千米/小时）
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteOptimizeRequest {
    pub stops: Vec<Stop>,
    pub start_index: Option<usize>,
    #[serde(default)]
    pub round_trip: bool,
}

impl RouteOptimizeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(MIN_STOPS..=MAX_STOPS).contains(&self.stops.len()) {
            return Err(AppError::validation(format!(
                "between {} and {} stops are required",
                MIN_STOPS, MAX_STOPS
            )));
        }
        if let Some(stop) = self.stops.iter().find(|s| !s.coordinate().is_valid()) {
            return Err(AppError::validation(format!(
                "invalid coordinates for stop {}",
                stop.name
            )));
        }
        if self.start() >= self.stops.len() {
            return Err(AppError::validation("start_index is out of range"));
        }
        Ok(())
    }

    pub fn start(&self) -> usize {
        self.start_index.unwrap_or(0)
    }

    /// 结果中的顺序引用输入下标，所以停靠点顺序属于键的一部分；坐标按原值参与键
    pub fn cache_key(&self) -> String {
        let stops: Vec<Value> = self
            .stops
            .iter()
            .map(|s| json!([s.name, s.lat, s.lng]))
            .collect();
        create_cache_key(
            ROUTE_OPTIMIZE,
            &object_params(json!({
                "stops": stops,
                "start": self.start(),
                "round_trip": self.round_trip,
            })),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Leg {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizedRoute {
    pub order: Vec<usize>,
    pub stops: Vec<Stop>,
    pub legs: Vec<Leg>,
    pub round_trip: bool,
    pub total_distance_km: f64,
    pub original_distance_km: f64,
    pub savings_km: f64,
    pub estimated_minutes: u32,
}

struct DistanceMatrix {
    size: usize,
    km: Vec<f64>,
}

impl DistanceMatrix {
    fn new(stops: &[Stop]) -> Self {
        let coords: Vec<Coordinate> = stops.iter().map(Stop::coordinate).collect();
        let size = coords.len();
        let mut km = vec![0.0; size * size];
        for i in 0..size {
            for j in (i + 1)..size {
                let d = coords[i].distance_km(&coords[j]);
                km[i * size + j] = d;
                km[j * size + i] = d;
            }
        }
        Self { size, km }
    }

    fn get(&self, from: usize, to: usize) -> f64 {
        self.km[from * self.size + to]
    }

    fn route_length(&self, order: &[usize], round_trip: bool) -> f64 {
        let open: f64 = order.windows(2).map(|w| self.get(w[0], w[1])).sum();
        match (round_trip, order.first(), order.last()) {
            (true, Some(&first), Some(&last)) if order.len() > 1 => open + self.get(last, first),
            _ => open,
        }
    }
}

/// 从起点出发，每次前往最近的未访问点
fn nearest_neighbour(matrix: &DistanceMatrix, start: usize) -> Vec<usize> {
    let mut visited = vec![false; matrix.size];
    let mut order = Vec::with_capacity(matrix.size);
    let mut current = start;
    visited[current] = true;
    order.push(current);

    while order.len() < matrix.size {
        let next = (0..matrix.size)
            .filter(|&i| !visited[i])
            .min_by(|&a, &b| matrix.get(current, a).total_cmp(&matrix.get(current, b)));
        let Some(next) = next else { break };
        visited[next] = true;
        order.push(next);
        current = next;
    }
    order
}

/// 2-opt 反转区间直到不再缩短，起点保持不动
fn two_opt(matrix: &DistanceMatrix, mut order: Vec<usize>, round_trip: bool) -> Vec<usize> {
    let n = order.len();
    if n < 4 {
        return order;
    }

    let mut best = matrix.route_length(&order, round_trip);
    let mut improved = true;
    while improved {
        improved = false;
        for i in 1..n - 1 {
            for k in (i + 1)..n {
                order[i..=k].reverse();
                let length = matrix.route_length(&order, round_trip);
                if length + EPSILON < best {
                    best = length;
                    improved = true;
                } else {
                    order[i..=k].reverse();
                }
            }
        }
    }
    order
}

pub fn optimize(stops: &[Stop], start: usize, round_trip: bool) -> OptimizedRoute {
    let matrix = DistanceMatrix::new(stops);
    let order = two_opt(&matrix, nearest_neighbour(&matrix, start), round_trip);

    let mut path = order.clone();
    if round_trip {
        path.push(order[0]);
    }
    let legs: Vec<Leg> = path
        .windows(2)
        .map(|w| Leg {
            from: stops[w[0]].name.clone(),
            to: stops[w[1]].name.clone(),
            distance_km: round2(matrix.get(w[0], w[1])),
        })
        .collect();

    let total = matrix.route_length(&order, round_trip);
    let input_order: Vec<usize> = (0..stops.len()).collect();
    let original = matrix.route_length(&input_order, round_trip);

    OptimizedRoute {
        stops: order.iter().map(|&i| stops[i].clone()).collect(),
        order,
        legs,
        round_trip,
        total_distance_km: round2(total),
        original_distance_km: round2(original),
        savings_km: round2((original - total).max(0.0)),
        estimated_minutes: (total / AVERAGE_SPEED_KMH * 60.0).round() as u32,
    }
}
