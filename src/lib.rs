// Public modules that are part of the API
pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod liquidity;
pub mod metadata;
pub mod monitoring;
pub mod orchestrator;
pub mod token;
pub mod wizard;

// Re-export common types
pub use chain::{ChainClient, InMemoryChain, Network, RpcChainClient};

pub use error::{ErrorKind, LaunchError, Result};

pub use liquidity::{
    Exchange,
    LiquidityPoolInfo,
    LiquidityProvisioner,
    LiquiditySpec,
    ProvisionerRegistry,
};

pub use metadata::{HttpMetadataPublisher, InMemoryMetadataPublisher, MetadataPublisher};

pub use orchestrator::{
    DeployStep,
    DeploymentFailure,
    DeploymentGuard,
    DeploymentOrchestrator,
    DeploymentResult,
    LiquidityOutcome,
    OrchestratorConfig,
};

pub use token::{LogoAsset, SocialLinks, TokenSpec};

pub use wizard::{WizardEvent, WizardSession, WizardState, WizardStep};
