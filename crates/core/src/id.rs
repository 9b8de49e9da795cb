//! Process-wide identifiers for programs, groups and animations.
//!
//! The tree hands out ids instead of references so that bindings, events and
//! back-references never borrow into the structure they describe.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($name:ident, $counter:ident, $prefix:literal) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Allocates a fresh identifier, never handed out before in this process.
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(ProgramId, NEXT_PROGRAM_ID, "program");
define_id!(GroupId, NEXT_GROUP_ID, "group");
define_id!(AnimationId, NEXT_ANIMATION_ID, "animation");
