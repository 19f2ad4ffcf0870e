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

//! App categories with per-category app counts.

use crate::app::App;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub type CategoryRef = Arc<Category>;

/// A browsable category
///
/// `desktop_groups` are `A::B` expressions; an app belongs to the group
/// when it has every category named in it.
#[derive(Debug)]
pub struct Category {
    id: String,
    name: String,
    desktop_groups: Vec<String>,
    size: AtomicU32,
}

impl Category {
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, desktop_groups: I) -> CategoryRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            id: id.into(),
            name: name.into(),
            desktop_groups: desktop_groups.into_iter().map(Into::into).collect(),
            size: AtomicU32::new(0),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desktop_groups(&self) -> &[String] {
        &self.desktop_groups
    }

    pub fn size(&self) -> u32 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn increment_size(&self, by: u32) {
        self.size.fetch_add(by, Ordering::Relaxed);
    }

    pub fn reset_size(&self) {
        self.size.store(0, Ordering::Relaxed);
    }

    /// Check whether an app falls into any of the desktop groups
    pub fn matches(&self, app: &App) -> bool {
        self.desktop_groups.iter().any(|group| {
            group
                .split("::")
                .filter(|c| !c.is_empty())
                .all(|c| app.has_category(c))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_desktop_group() {
        let app = App::new("zeus.desktop");
        app.add_category("AudioVideo");
        app.add_category("Player");

        let music = Category::new("music", "Music", ["AudioVideo::Player"]);
        let games = Category::new("games", "Games", ["Game", "Game::Arcade"]);
        assert!(music.matches(&app));
        assert!(!games.matches(&app));

        music.increment_size(2);
        music.increment_size(1);
        assert_eq!(music.size(), 3);
        music.reset_size();
        assert_eq!(music.size(), 0);
    }
}
