pub mod domain;
pub mod engagement;
pub mod lifecycle;
pub mod matching;
pub mod notify;
pub mod policy;
pub mod ports;
pub mod services;

pub use domain::{
    AuthSession, Collaboration, Document, Event, Message, Opportunity, Page, PageRequest, Role,
    User, UserCredentials,
};
pub use policy::Actor;
pub use ports::{
    BlobStorage, DatabaseService, DocumentStore, Notifier, PortError, PortResult, RateLimitStore,
    SkillExtractionService, SkillMatcher,
};
pub use services::Services;
