//! Services layer - Business logic
//!
//! This module contains the business logic of the blog. Services are
//! responsible for:
//! - Enforcing the visibility and ownership rules
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod access;
pub mod category;
pub mod comment;
pub mod location;
pub mod media;
pub mod pagination;
pub mod password;
pub mod post;
pub mod user;

pub use access::{Ownership, Visibility};
pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use location::LocationService;
pub use media::{MediaError, MediaStore};
pub use pagination::{Paginator, POSTS_PER_PAGE};
pub use password::{hash_password, validate_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use user::{validate_username, LoginInput, RegisterInput, UserService, UserServiceError};
