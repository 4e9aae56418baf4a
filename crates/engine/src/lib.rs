mod api;
mod area;
mod capability;
mod error;
mod export;
mod manager;
mod permission;
mod search;
mod section;
mod settings;
mod state;
mod subscription;
mod users;

pub use api::{CommentsApi, CommentsPage};
pub use area::{Area, AreaHandler, AreaOptions, AreaVisibility, PlainItem, SectionItem};
pub use capability::{Capability, PostMode, StandardCapability};
pub use error::{EngineError, EngineResult, FieldErrors};
pub use export::{export_comment, export_section, CommentPeople, CommentView, SectionView};
pub use manager::CommentsManager;
pub use permission::{PermissionOracle, PermissionTable, PERM_DELETE, PERM_EDIT_ANY, PERM_VIEW};
pub use search::{CommentSearch, SearchParams, Viewer};
pub use section::Section;
pub use settings::{CommentsSettings, DatabaseSettings, Settings};
pub use state::EngineState;
pub use subscription::SubscriptionService;
pub use users::UserCache;
