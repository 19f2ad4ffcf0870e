// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Review and rating enrichment
//!
//! The refinement engine calls the [`ReviewProvider`] once per refine, after
//! all plugins, when reviews or ratings were requested.

use crate::plugin::PluginContext;
use appcenter_core::{AppList, PluginResult, Review, ReviewRefineFlags};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Source of reviews and star ratings
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Fill reviews and ratings for every app in the list.
    ///
    /// Apps that already carry the requested data are left alone.
    async fn refine(
        &self,
        list: &AppList,
        flags: ReviewRefineFlags,
        ctx: &PluginContext,
    ) -> PluginResult<()>;
}

/// Star histogram, index 1..=5 holds the number of n-star ratings
pub type StarCounts = [u32; 6];

/// Serves reviews and ratings from an in-memory table keyed by app id
#[derive(Default)]
pub struct StaticReviewProvider {
    reviews: RwLock<HashMap<String, Vec<Review>>>,
    ratings: RwLock<HashMap<String, StarCounts>>,
}

impl StaticReviewProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_review(&self, app_id: impl Into<String>, review: Review) {
        self.reviews
            .write()
            .entry(app_id.into())
            .or_default()
            .push(review);
    }

    pub fn set_ratings(&self, app_id: impl Into<String>, counts: StarCounts) {
        self.ratings.write().insert(app_id.into(), counts);
    }
}

#[async_trait]
impl ReviewProvider for StaticReviewProvider {
    async fn refine(
        &self,
        list: &AppList,
        flags: ReviewRefineFlags,
        ctx: &PluginContext,
    ) -> PluginResult<()> {
        if flags.is_empty() {
            return Ok(());
        }
        for app in list {
            ctx.check_cancelled()?;
            let Some(id) = app.id() else { continue };

            if flags.contains(ReviewRefineFlags::GET_RATINGS) && app.review_ratings().is_empty() {
                if let Some(counts) = self.ratings.read().get(&id) {
                    app.set_review_ratings(counts.to_vec());
                    if let Some(rating) = wilson_rating(counts) {
                        if rating > 0 {
                            app.set_rating(rating);
                        }
                    }
                }
            }

            if flags.contains(ReviewRefineFlags::GET_REVIEWS) && app.reviews().is_empty() {
                if let Some(reviews) = self.reviews.read().get(&id) {
                    for review in reviews {
                        app.add_review(review.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Lower bound of the Wilson score interval, as a percentage.
///
/// Keeps a handful of enthusiastic ratings from outranking many good ones.
/// Returns `None` when there are no ratings.
pub fn wilson_rating(counts: &StarCounts) -> Option<u32> {
    let total: u64 = counts[1..].iter().map(|c| u64::from(*c)).sum();
    if total == 0 {
        return None;
    }
    let n = total as f64;
    let mut val = wilson_score(f64::from(counts[1]), n, 0.2) * -2.0;
    val += wilson_score(f64::from(counts[2]), n, 0.2) * -1.0;
    val += wilson_score(f64::from(counts[4]), n, 0.2);
    val += wilson_score(f64::from(counts[5]), n, 0.2) * 2.0;

    // -2..+2 to 0..100
    let pct = ((val + 3.0) * 20.0).ceil();
    Some(pct.clamp(0.0, 100.0) as u32)
}

fn wilson_score(value: f64, n: f64, power: f64) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let z = pnormaldist(1.0 - power / 2.0);
    let phat = value / n;
    (phat + z * z / (2.0 * n) - z * ((phat * (1.0 - phat) + z * z / (4.0 * n)) / n).sqrt())
        / (1.0 + z * z / n)
}

/// Inverse of the standard normal CDF (Odeh and Evans approximation)
fn pnormaldist(qn: f64) -> f64 {
    const B: [f64; 11] = [
        1.570796288,
        0.03706987906,
        -0.8364353589e-3,
        -0.2250947176e-3,
        0.6841218299e-5,
        0.5824238515e-5,
        -0.104527497e-5,
        0.8360937017e-7,
        -0.3231081277e-8,
        0.3657763036e-10,
        0.6936233982e-12,
    ];
    if !(0.0..=1.0).contains(&qn) || qn == 0.5 {
        return 0.0;
    }
    let mut w1 = if qn > 0.5 { 1.0 - qn } else { qn };
    let w3 = -(4.0 * w1 * (1.0 - w1)).ln();
    w1 = B[0];
    for (i, b) in B.iter().enumerate().skip(1) {
        w1 += b * w3.powi(i as i32);
    }
    if qn > 0.5 {
        (w1 * w3).sqrt()
    } else {
        -(w1 * w3).sqrt()
    }
}
