//! Wire types shared between the mintforge service and its clients.

pub mod api;
pub mod events;

pub use api::{
    CreateTokenResponse, ErrorResponse, LiquidityPoolResponse, SetupLiquidityRequest,
};
pub use events::{StepEvent, StepStatus};
