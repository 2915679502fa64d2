//! Users and their saved workout/diet plans.

pub mod model;
pub mod routes;

pub use model::{DietPlan, NewPlan, Plan, User, UserSync, WorkoutPlan};
pub use routes::{PlanRouteState, plan_routes};
