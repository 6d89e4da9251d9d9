pub mod schema;

pub use schema::{
    config_json_schema, Config, GatewayConfig, GitHubConfig, RestoreConfig, SandboxConfig,
    StoreConfig, SyncConfig, SyncStrategy, WorkflowConfig,
};
