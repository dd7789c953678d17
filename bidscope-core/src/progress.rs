//! Weighted, category-based progress tracking.
//!
//! A load is split into named categories with fixed weights that sum to
//! 100. Overall progress counts completed categories fully and in-progress
//! categories by their own percentage. Observed durations feed a moving
//! average per category; until every unfinished category has one, time
//! remaining is extrapolated from the elapsed time and overall progress.
//!
//! The tracker is bookkeeping only; nothing waits on it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::CoreError;

/// Weight of each new duration sample in the moving average.
const SMOOTHING: f64 = 0.3;

/// Default categories for a threads run, weighted by expected fetch cost.
pub const DEFAULT_CATEGORIES: &[(&str, u8)] = &[
    ("threads", 10),
    ("projects", 20),
    ("users", 15),
    ("bids", 20),
    ("milestones", 15),
    ("messages", 10),
    ("persistence", 5),
    ("output", 5),
];

/// Lifecycle of a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    /// Not started.
    #[default]
    Pending,
    /// Started and not yet ended.
    InProgress,
    /// Ended.
    Completed,
}

/// State of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryState {
    /// Lifecycle status.
    pub status: CategoryStatus,
    /// When the category started.
    #[serde(skip)]
    pub started_at: Option<Instant>,
    /// How long it took, once completed.
    pub duration: Option<Duration>,
    /// Own progress, 0-100.
    pub progress: f64,
    /// Last status message.
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
struct Category {
    name: String,
    weight: u8,
    state: CategoryState,
    estimate: Option<Duration>,
}

/// Tracks progress across weighted categories.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::from_validated(DEFAULT_CATEGORIES)
    }
}

impl ProgressTracker {
    /// Creates a tracker. Weights must sum to exactly 100 and names must be
    /// unique.
    pub fn new(categories: &[(&str, u8)]) -> Result<Self, CoreError> {
        let total: u32 = categories.iter().map(|(_, w)| u32::from(*w)).sum();
        if total != 100 {
            return Err(CoreError::InvalidConfig(format!(
                "progress weights must sum to 100, got {total}"
            )));
        }
        let tracker = Self::from_validated(categories);
        if tracker.index.len() != categories.len() {
            return Err(CoreError::InvalidConfig(
                "progress category names must be unique".into(),
            ));
        }
        Ok(tracker)
    }

    fn from_validated(categories: &[(&str, u8)]) -> Self {
        let categories: Vec<Category> = categories
            .iter()
            .map(|(name, weight)| Category {
                name: (*name).to_string(),
                weight: *weight,
                state: CategoryState::default(),
                estimate: None,
            })
            .collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self { categories, index }
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut Category, CoreError> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| CoreError::UnknownCategory(name.to_string()))?;
        Ok(&mut self.categories[i])
    }

    /// Marks a category as started.
    pub fn start_category(&mut self, name: &str) -> Result<(), CoreError> {
        let category = self.category_mut(name)?;
        category.state = CategoryState {
            status: CategoryStatus::InProgress,
            started_at: Some(Instant::now()),
            ..CategoryState::default()
        };
        Ok(())
    }

    /// Updates a category's own progress (clamped to 0-100).
    ///
    /// A pending category is started implicitly; a completed one is left
    /// alone.
    pub fn update_category_progress(
        &mut self,
        name: &str,
        percent: f64,
        message: Option<&str>,
    ) -> Result<(), CoreError> {
        let category = self.category_mut(name)?;
        match category.state.status {
            CategoryStatus::Completed => return Ok(()),
            CategoryStatus::Pending => {
                category.state.status = CategoryStatus::InProgress;
                category.state.started_at = Some(Instant::now());
            }
            CategoryStatus::InProgress => {}
        }
        category.state.progress = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        if let Some(message) = message {
            category.state.message = Some(message.to_string());
        }
        Ok(())
    }

    /// Marks a category as completed and records its duration.
    pub fn end_category(&mut self, name: &str) -> Result<(), CoreError> {
        let category = self.category_mut(name)?;
        if category.state.status == CategoryStatus::Completed {
            return Ok(());
        }
        let elapsed = category
            .state
            .started_at
            .map_or(Duration::ZERO, |t| t.elapsed());
        category.state.status = CategoryStatus::Completed;
        category.state.progress = 100.0;
        category.state.duration = Some(elapsed);
        record_duration(category, elapsed);
        Ok(())
    }

    /// Returns every category to pending. Duration estimates are kept.
    pub fn reset_progress(&mut self) {
        for category in &mut self.categories {
            category.state = CategoryState::default();
        }
    }

    /// Weighted overall progress, 0-100.
    pub fn overall_progress(&self) -> f64 {
        let total: f64 = self
            .categories
            .iter()
            .map(|c| {
                let weight = f64::from(c.weight);
                match c.state.status {
                    CategoryStatus::Pending => 0.0,
                    CategoryStatus::InProgress => weight * c.state.progress / 100.0,
                    CategoryStatus::Completed => weight,
                }
            })
            .fold(0.0, |acc, v| acc + v);
        total.min(100.0)
    }

    /// State of one category.
    pub fn category(&self, name: &str) -> Option<&CategoryState> {
        self.index.get(name).map(|&i| &self.categories[i].state)
    }

    /// Categories in declaration order with their weights.
    pub fn categories(&self) -> impl Iterator<Item = (&str, u8, &CategoryState)> {
        self.categories
            .iter()
            .map(|c| (c.name.as_str(), c.weight, &c.state))
    }

    /// Smoothed duration estimate for a category, once one run has finished.
    pub fn estimated_duration(&self, name: &str) -> Option<Duration> {
        self.index.get(name).and_then(|&i| self.categories[i].estimate)
    }

    /// Estimated time left.
    ///
    /// Uses the smoothed estimates when every unfinished category has one.
    /// Otherwise extrapolates the time since the first category started over
    /// the overall progress, which also holds when categories run side by
    /// side. Returns `None` before any progress has been made.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        self.remaining_from_estimates()
            .or_else(|| self.remaining_from_elapsed())
    }

    fn remaining_from_elapsed(&self) -> Option<Duration> {
        let overall = self.overall_progress();
        if overall <= 0.0 {
            return None;
        }
        let elapsed = self
            .categories
            .iter()
            .filter_map(|c| c.state.started_at)
            .min()
            .map(|t| t.elapsed())?;
        Duration::try_from_secs_f64(elapsed.as_secs_f64() * (100.0 - overall) / overall).ok()
    }

    fn remaining_from_estimates(&self) -> Option<Duration> {
        let mut remaining = Duration::ZERO;
        for category in &self.categories {
            let left = match category.state.status {
                CategoryStatus::Completed => continue,
                CategoryStatus::Pending => category.estimate?,
                CategoryStatus::InProgress => {
                    let estimate = category.estimate?;
                    let elapsed = category
                        .state
                        .started_at
                        .map_or(Duration::ZERO, |t| t.elapsed());
                    estimate.saturating_sub(elapsed)
                }
            };
            remaining += left;
        }
        Some(remaining)
    }
}

fn record_duration(category: &mut Category, sample: Duration) {
    category.estimate = Some(match category.estimate {
        None => sample,
        Some(previous) => Duration::from_secs_f64(
            SMOOTHING * sample.as_secs_f64() + (1.0 - SMOOTHING) * previous.as_secs_f64(),
        ),
    });
}
