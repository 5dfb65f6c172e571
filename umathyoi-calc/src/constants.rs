//! Centralized game-rule constants for the efficiency calculator.
//!
//! These values define the deterministic math of a training turn. Keeping
//! them together ensures rule changes only happen through reviewed code,
//! not through the card or scenario JSON the data layer hands us.

// Milestones ---------------------------------------------------------------
/// Card levels at which milestone values may be recorded.
pub const MILESTONE_LEVELS: [u8; 11] = [1, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50];
/// Sentinel stored in a milestone array for "no milestone at this level".
pub const MILESTONE_SENTINEL: i32 = -1;

// Rarity / limit break -----------------------------------------------------
pub const MAX_LIMIT_BREAK: u8 = 4;
pub const LEVELS_PER_LIMIT_BREAK: u8 = 5;
pub const R_MAX_LEVEL: u8 = 40;
pub const SR_MAX_LEVEL: u8 = 45;
pub const SSR_MAX_LEVEL: u8 = 50;

// Deck ---------------------------------------------------------------------
pub const DECK_SIZE: usize = 6;

// Effect ids ---------------------------------------------------------------
/// Unique effect ids at or above this value depend on live turn state.
pub const DYNAMIC_EFFECT_ID_THRESHOLD: u16 = 100;

// Placement ----------------------------------------------------------------
pub const FACILITY_BASE_WEIGHT: f64 = 100.0;
pub const NO_SHOW_WEIGHT: f64 = 50.0;

// Training -----------------------------------------------------------------
pub const PERCENTAGE_BASE: f64 = 100.0;
pub const SUPPORT_BONUS_PER_CARD: f64 = 0.05;
/// Added before the final floor so exact integer products survive binary rounding.
pub const GAIN_FLOOR_EPSILON: f64 = 1e-9;
pub const FRIENDSHIP_BOND_THRESHOLD: u8 = 80;
pub const DEFAULT_BOND_GAUGE: u8 = 80;
pub const MAX_BOND_GAUGE: u8 = 100;
pub const MIN_FACILITY_LEVEL: u8 = 1;
pub const MAX_FACILITY_LEVEL: u8 = 5;
/// Effect 109 grants this flat amount before the combined-bond scaling.
pub const COMBINED_BOND_BASE_BONUS: i64 = 20;
/// Effect 107 only applies while energy is at or below this value.
pub const LOW_ENERGY_CEILING: i64 = 100;

// Scenario -----------------------------------------------------------------
pub const URA_FINALS_NAME: &str = "URA Finals";
pub const URA_USES_PER_LEVEL: u8 = 4;

// Simulation ---------------------------------------------------------------
pub const DEFAULT_TURN_COUNT: u32 = 1000;
pub const DEFAULT_PROGRESS_STEP_PERCENT: f32 = 1.0;
pub const DEFAULT_SEED: u64 = 0x5EED_0F_CA4D;
