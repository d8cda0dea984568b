pub mod config;
pub mod facade;
pub mod facade_contract;
pub mod logging;
pub mod models;
pub mod paths;
pub mod resolver;

pub use config::{
    Config, ConfigError, LogLevel, LoggingConfig, PlayerConfig, RemoteConfig, ValidationError,
};
pub use facade::{AttrValue, FacadeError, FacadeResult, PlayerFacade, PROGRESS_UNKNOWN};
pub use facade_contract::{
    run_facade_contract, FacadeContractError, FacadeContractExpectations,
};
pub use logging::{init_logging, LoggingError, LoggingGuard, LOG_ENV};
pub use models::{
    QueueSort, Rating, SortColumn, Track, TrackAttr, TrackId, UnknownAttr, Volume, VolumeAction,
    VolumeDelta,
};
pub use paths::{AppDirs, DirsError};
pub use resolver::{ResolveError, ResolveResult, TrackResolver};

pub const APP_NAME: &str = "jukebox";
pub const APP_AUTHOR: &str = "Jukebox";
pub const APP_QUALIFIER: &str = "io";
