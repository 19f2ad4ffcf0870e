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

//! Bitset types shared by apps, lists, queries and jobs.
//!
//! Every set is a transparent newtype over an unsigned integer so it
//! serializes as a plain number and combines with the usual bit operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $ty:ty {
            $(
                $(#[$fmeta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($ty);

        impl $name {
            $(
                $(#[$fmeta])*
                pub const $flag: $name = $name($value);
            )*

            const NAMED: &'static [(&'static str, $name)] = &[
                $( (stringify!($flag), $name($value)), )*
            ];

            /// The empty set
            pub const fn empty() -> Self {
                $name(0)
            }

            pub const fn bits(&self) -> $ty {
                self.0
            }

            pub const fn from_bits(bits: $ty) -> Self {
                $name(bits)
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// True if every bit of `other` is set
            pub const fn contains(&self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }

            /// True if any bit of `other` is set
            pub const fn intersects(&self, other: $name) -> bool {
                (self.0 & other.0) != 0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: $name) {
                self.0 &= !other.0;
            }

            pub const fn union(self, other: $name) -> Self {
                $name(self.0 | other.0)
            }

            pub const fn difference(self, other: $name) -> Self {
                $name(self.0 & !other.0)
            }

            /// Names of the single-bit flags that are set
            pub fn names(&self) -> Vec<&'static str> {
                Self::NAMED
                    .iter()
                    .filter(|(_, f)| f.0.count_ones() == 1 && self.contains(*f))
                    .map(|(n, _)| *n)
                    .collect()
            }

            /// Look up a flag by name, accepting `origin-ui`, `ORIGIN_UI` or `origin_ui`
            pub fn from_name(name: &str) -> Option<Self> {
                let wanted = name.trim().replace('-', "_").to_ascii_uppercase();
                Self::NAMED
                    .iter()
                    .find(|(n, _)| *n == wanted)
                    .map(|(_, f)| *f)
            }

            /// Parse a comma separated list of flag names
            pub fn parse_list(list: &str) -> Result<Self, String> {
                let mut flags = Self::empty();
                for part in list.split(',').filter(|p| !p.trim().is_empty()) {
                    let flag = Self::from_name(part)
                        .ok_or_else(|| format!("unknown {} flag: {}", stringify!($name), part.trim()))?;
                    flags.insert(flag);
                }
                Ok(flags)
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                $name(self.0 & rhs.0)
            }
        }

        impl BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                $name(!self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_empty() {
                    return write!(f, "{}(empty)", stringify!($name));
                }
                write!(f, "{}({})", stringify!($name), self.names().join(" | "))
            }
        }
    };
}

flag_set! {
    /// Data an app must carry after a refine
    pub struct RefineFlags: u64 {
        const LICENSE = 1 << 0;
        const URL = 1 << 1;
        const DESCRIPTION = 1 << 2;
        const SIZE = 1 << 3;
        const RATING = 1 << 4;
        const VERSION = 1 << 5;
        const HISTORY = 1 << 6;
        const SETUP_ACTION = 1 << 7;
        const UPDATE_DETAILS = 1 << 8;
        const ORIGIN = 1 << 9;
        const RELATED = 1 << 10;
        const MENU_PATH = 1 << 11;
        const ADDONS = 1 << 12;
        /// Keep generic packages in the filtered result
        const ALLOW_PACKAGES = 1 << 13;
        const UPDATE_SEVERITY = 1 << 14;
        const UPGRADE_REMOVED = 1 << 15;
        const PROVENANCE = 1 << 16;
        const REVIEWS = 1 << 17;
        const REVIEW_RATINGS = 1 << 18;
        const KEY_COLORS = 1 << 19;
        const ICON = 1 << 20;
        const PERMISSIONS = 1 << 21;
        const ORIGIN_HOSTNAME = 1 << 22;
        const ORIGIN_UI = 1 << 23;
        const RUNTIME = 1 << 24;
        const SCREENSHOTS = 1 << 25;
        const CATEGORIES = 1 << 26;
        const KUDOS = 1 << 27;
    }
}

impl RefineFlags {
    /// Add the requirements implied by other requirements.
    ///
    /// The origin UI string and hostname are derived from the origin, and
    /// the size of an app includes its runtime.
    pub fn with_implied(self) -> Self {
        let mut flags = self;
        if flags.intersects(RefineFlags::ORIGIN_UI | RefineFlags::ORIGIN_HOSTNAME) {
            flags.insert(RefineFlags::ORIGIN);
        }
        if flags.contains(RefineFlags::SIZE) {
            flags.insert(RefineFlags::RUNTIME);
        }
        flags
    }
}

flag_set! {
    /// Behavioural flags for a refine job
    pub struct RefineJobFlags: u32 {
        const INTERACTIVE = 1 << 0;
        /// Only drop wildcards from the result, leave validity checks to the caller
        const DISABLE_FILTERING = 1 << 1;
    }
}

flag_set! {
    /// Identity fields used by `AppList::filter_duplicates`
    pub struct DedupeFlags: u32 {
        const KEY_ID = 1 << 0;
        const KEY_SOURCE = 1 << 1;
        const KEY_VERSION = 1 << 2;
        const KEY_ID_PROVIDES = 1 << 3;
        const PREFER_INSTALLED = 1 << 4;
        const DEFAULT = (1 << 0) | (1 << 1) | (1 << 4);
    }
}

flag_set! {
    pub struct ListAppsFlags: u32 {
        const INTERACTIVE = 1 << 0;
    }
}

flag_set! {
    pub struct AppListFlags: u32 {
        const IS_TRUNCATED = 1 << 0;
        const IS_RANDOMIZED = 1 << 1;
        const WATCH_APPS = 1 << 2;
    }
}

flag_set! {
    /// Orthogonal boolean attributes of an app
    pub struct Quirks: u64 {
        /// Provided by the distribution
        const PROVENANCE = 1 << 0;
        const COMPULSORY = 1 << 1;
        /// Unresolved placeholder, only id and kind are known
        const IS_WILDCARD = 1 << 2;
        const HIDE_FROM_SEARCH = 1 << 3;
        const NOT_LAUNCHABLE = 1 << 4;
        const DEVELOPER_VERIFIED = 1 << 5;
        const NEEDS_REBOOT = 1 << 6;
        const PARENTAL_FILTER = 1 << 7;
        const LOCAL_HAS_REPOSITORY = 1 << 8;
    }
}

flag_set! {
    /// Quality markers used for ranking
    pub struct Kudos: u32 {
        const MY_LANGUAGE = 1 << 0;
        const RECENT_RELEASE = 1 << 1;
        const FEATURE_RECOMMENDED = 1 << 2;
        const MODERN_TOOLKIT = 1 << 3;
        const SEARCH_PROVIDER = 1 << 4;
        const INSTALLS_USER_DOCS = 1 << 5;
        const USES_NOTIFICATIONS = 1 << 6;
        const HAS_KEYWORDS = 1 << 7;
        const HAS_SCREENSHOTS = 1 << 8;
        const HIGH_CONTRAST = 1 << 9;
        const HI_DPI_ICON = 1 << 10;
        const SANDBOXED = 1 << 11;
    }
}

flag_set! {
    pub struct EventFlags: u32 {
        /// Should be shown to the user
        const VISIBLE = 1 << 0;
        const WARNING = 1 << 1;
        /// Raised by a job the user started
        const INTERACTIVE = 1 << 2;
    }
}

flag_set! {
    /// What the review provider should fetch
    pub struct ReviewRefineFlags: u32 {
        const GET_REVIEWS = 1 << 0;
        const GET_RATINGS = 1 << 1;
    }
}

impl ReviewRefineFlags {
    /// Derive the review request from refine requirements
    pub fn from_refine(flags: RefineFlags) -> Self {
        let mut out = ReviewRefineFlags::empty();
        if flags.contains(RefineFlags::REVIEWS) {
            out.insert(ReviewRefineFlags::GET_REVIEWS);
        }
        if flags.intersects(RefineFlags::REVIEW_RATINGS | RefineFlags::RATING) {
            out.insert(ReviewRefineFlags::GET_RATINGS);
        }
        out
    }
}
