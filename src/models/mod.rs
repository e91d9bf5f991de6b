//! Data models
//!
//! Entities stored by the database layer (User, Session, Category, Location,
//! Post, Comment), the joined shapes handed to templates, and the input types
//! accepted by repositories.

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{Category, CreateCategoryInput};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use location::{CreateLocationInput, Location};
pub use pagination::{num_pages, ListParams, PagedResult};
pub use post::{Post, PostAuthor, PostCategory, PostInput, PostLocation, PostWithMeta};
pub use session::Session;
pub use user::{CreateUserInput, UpdateProfileInput, User};
