//! Ruling grid inference.
//!
//! Horizontal segments vote for row rulings with their y, vertical segments
//! vote for column rulings with their x. Votes closer than the tolerance
//! collapse into a single ruling at their running average.

use log::debug;

use crate::types::Segment;

/// Candidate ruling positions per axis, both sorted ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulingGrid {
    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
}

impl RulingGrid {
    pub fn rows(&self) -> usize {
        self.ys.len().saturating_sub(1)
    }

    pub fn cols(&self) -> usize {
        self.xs.len().saturating_sub(1)
    }
}

/// Segments split by orientation; diagonals are dropped.
#[derive(Debug, Clone, Default)]
pub struct Rulings {
    pub horizontal: Vec<Segment>,
    pub vertical: Vec<Segment>,
}

pub fn split_rulings(segments: &[Segment], eps: f32) -> Rulings {
    let mut rulings = Rulings::default();
    for seg in segments {
        if seg.is_horizontal(eps) {
            rulings.horizontal.push(*seg);
        } else if seg.is_vertical(eps) {
            rulings.vertical.push(*seg);
        }
    }
    rulings
}

/// Cluster scalar values and return the cluster centroids, ascending.
///
/// A value joins the current cluster when it lies within `tolerance` of the
/// cluster's running average. The centroid moves with every value that
/// joins, so a long, slowly increasing run can drift.
pub fn cluster_values(values: &[f32], tolerance: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut centroids: Vec<f32> = Vec::new();
    let mut count = 0usize;

    for value in sorted {
        match centroids.last_mut() {
            Some(avg) if value - *avg <= tolerance => {
                count += 1;
                *avg += (value - *avg) / count as f32;
            }
            _ => {
                centroids.push(value);
                count = 1;
            }
        }
    }

    centroids
}

/// Build the ruling grid, or `None` when no table can possibly exist.
pub fn infer_grid(rulings: &Rulings, eps: f32) -> Option<RulingGrid> {
    if rulings.horizontal.len() < 2 || rulings.vertical.len() < 2 {
        debug!(
            "too few rulings for a grid ({} horizontal, {} vertical)",
            rulings.horizontal.len(),
            rulings.vertical.len()
        );
        return None;
    }

    let ys: Vec<f32> = rulings.horizontal.iter().map(|s| (s.y0 + s.y1) / 2.0).collect();
    let xs: Vec<f32> = rulings.vertical.iter().map(|s| (s.x0 + s.x1) / 2.0).collect();

    let grid = RulingGrid {
        xs: cluster_values(&xs, eps),
        ys: cluster_values(&ys, eps),
    };

    if grid.xs.len() < 2 || grid.ys.len() < 2 {
        debug!("rulings collapse into fewer than two positions on an axis");
        return None;
    }

    Some(grid)
}
