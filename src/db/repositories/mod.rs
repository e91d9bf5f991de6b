//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity.

pub mod category;
pub mod comment;
pub mod location;
pub mod post;
pub mod session;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use location::{LocationRepository, SqlxLocationRepository};
pub use post::{PostRepository, PostScope, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
